//! Broadcast registry for stream sessions.
//!
//! The registry holds a handle for every currently connected serial and TCP
//! session so transition alerts can be fanned out to all of them. UDP
//! sources are one-shot per datagram and are never registered.

use crate::session::SessionHandle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Concurrency-safe set of active stream sessions.
#[derive(Clone, Default)]
pub struct BroadcastRegistry {
    sessions: Arc<Mutex<HashMap<u64, SessionHandle>>>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. Registering the same session again is a no-op.
    pub fn register(&self, handle: SessionHandle) {
        self.sessions.lock().entry(handle.id()).or_insert(handle);
    }

    /// Remove a session by id.
    pub fn unregister(&self, id: u64) {
        self.sessions.lock().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue one line to every registered session.
    ///
    /// Membership is snapshotted under the lock and delivery happens outside
    /// it; a failure for one recipient is logged and does not stop delivery
    /// to the rest.
    pub fn broadcast(&self, text: &str, timestamp_ms: i64) {
        let snapshot: Vec<SessionHandle> = self.sessions.lock().values().cloned().collect();
        for handle in snapshot {
            if let Err(err) = handle.try_send_at(text, timestamp_ms) {
                warn!("broadcast to {} failed: {}", handle.name(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionKind;
    use tokio::sync::mpsc;

    fn handle(name: &str) -> (SessionHandle, mpsc::Receiver<crate::session::OutboundMessage>) {
        let (tx, rx) = mpsc::channel(8);
        (SessionHandle::new(name, SessionKind::Tcp, tx), rx)
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = BroadcastRegistry::new();
        let (session, _rx) = handle("a");
        registry.register(session.clone());
        registry.register(session);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregistered_session_gets_no_broadcasts() {
        let registry = BroadcastRegistry::new();
        let (session, mut rx) = handle("a");
        registry.register(session.clone());
        registry.unregister(session.id());

        registry.broadcast("din1=1", 42);
        assert!(rx.try_recv().is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_failure_is_isolated() {
        let registry = BroadcastRegistry::new();
        let (first, mut first_rx) = handle("first");
        let (dead, dead_rx) = handle("dead");
        let (third, mut third_rx) = handle("third");
        registry.register(first);
        registry.register(dead);
        registry.register(third);

        // The dead session's writer is gone; its queue rejects sends.
        drop(dead_rx);

        registry.broadcast("rout2=1", 1234);
        let delivered = first_rx.try_recv().unwrap();
        assert_eq!(delivered.text, "rout2=1");
        assert_eq!(delivered.timestamp_ms, Some(1234));
        assert_eq!(third_rx.try_recv().unwrap().text, "rout2=1");
    }
}
