//! Serial transport: one long-lived stream session over the serial port.

use crate::error::ServerError;
use crate::session::{start_stream_session, ServerContext, SessionHandle, SessionKind};
use std::sync::Arc;
use tokio_serial::SerialPortBuilderExt;
use tracing::info;

/// Open the serial port and start its session.
pub fn start_serial_session(
    port_name: &str,
    baud: u32,
    ctx: Arc<ServerContext>,
) -> Result<SessionHandle, ServerError> {
    let stream = tokio_serial::new(port_name, baud).open_native_async()?;
    info!("opened serial port {} at {} baud", port_name, baud);
    let (reader, writer) = tokio::io::split(stream);
    Ok(start_stream_session(
        &format!("{} port", port_name),
        SessionKind::Serial,
        reader,
        writer,
        ctx,
    ))
}
