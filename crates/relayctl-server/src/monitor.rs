//! Unsolicited alert dispatch.
//!
//! Drains the I/O bank's transition feed and broadcasts one formatted alert
//! line per transition to every registered session. The broadcast carries
//! the transition timestamp from the event, not the send time.

use crate::session::ServerContext;
use relayctl_io::TransitionEvent;
use relayctl_protocol::format_alert;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawn the alert dispatch task over a transition event feed.
pub fn spawn_alert_dispatcher(
    mut events: mpsc::Receiver<TransitionEvent>,
    ctx: Arc<ServerContext>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if !ctx.config.send_unsolicited_alerts {
                continue;
            }
            let line = format_alert(
                event.kind,
                event.channel,
                event.state,
                event.counter,
                ctx.config.send_counts,
            );
            ctx.registry.broadcast(&line, event.timestamp_ms);
        }
    })
}
