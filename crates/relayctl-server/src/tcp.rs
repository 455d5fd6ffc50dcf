//! TCP transport: one stream session per accepted connection.

use crate::error::ServerError;
use crate::session::{start_stream_session, ServerContext, SessionKind};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Bind the configured port and serve connections forever.
pub async fn run_tcp_server(port: u16, ctx: Arc<ServerContext>) -> Result<(), ServerError> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("tcp server listening on {}", listener.local_addr()?);
    serve(listener, ctx).await
}

/// Accept loop over an already-bound listener.
pub async fn serve(listener: TcpListener, ctx: Arc<ServerContext>) -> Result<(), ServerError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let name = format!("{}:{}", peer.ip(), peer.port());
        info!("{} is connected", name);
        let (reader, writer) = stream.into_split();
        start_stream_session(&name, SessionKind::Tcp, reader, writer, ctx.clone());
    }
}
