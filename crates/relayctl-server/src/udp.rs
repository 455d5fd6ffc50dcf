//! UDP transport: one-shot control sessions per datagram.
//!
//! Datagram sources only get the control grammar: queries and unknown text
//! are ignored, nothing is ever sent back, and UDP sources never join the
//! broadcast registry.

use crate::error::ServerError;
use crate::session::ServerContext;
use relayctl_io::IoBank;
use relayctl_protocol::{classify, execute, Inbound};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Bind the configured port and process datagrams forever.
pub async fn run_udp_server(port: u16, ctx: Arc<ServerContext>) -> Result<(), ServerError> {
    let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
    info!("udp server listening on {}", socket.local_addr()?);

    let mut buf = [0u8; 2048];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(err) => {
                warn!("udp receive failed: {}", err);
                continue;
            }
        };
        let text = String::from_utf8_lossy(&buf[..len]);
        // The control grammar is end-anchored; trailing line terminators in
        // the datagram would otherwise defeat it.
        let message = text.trim_end_matches(|c| matches!(c, '\r' | '\n' | '\0'));
        handle_datagram(&peer.to_string(), message, ctx.bank.as_ref());
    }
}

/// Process one datagram as a transient control-only session.
pub fn handle_datagram(name: &str, message: &str, bank: &dyn IoBank) {
    info!("{} received: {}", name, message);
    match classify(message) {
        Inbound::Control(cmd) => execute(&cmd, bank),
        _ => debug!("{} ignored non-control datagram", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayctl_io::SimulatedBank;
    use relayctl_protocol::RelayBank;

    #[test]
    fn test_datagram_control_command_applies() {
        let (bank, _events) = SimulatedBank::new();
        handle_datagram("peer", "c12", &bank);
        assert_eq!(bank.output_states(), 0b11);
    }

    #[test]
    fn test_datagram_query_is_ignored() {
        let (bank, _events) = SimulatedBank::new();
        handle_datagram("peer", "din1?", &bank);
        handle_datagram("peer", "nonsense", &bank);
        assert_eq!(bank.output_states(), 0);
    }
}
