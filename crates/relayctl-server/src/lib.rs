//! # relayctl-server
//!
//! The relay control service: per-connection protocol sessions, the
//! broadcast registry for unsolicited transition alerts, and the three
//! transports (serial line, TCP, UDP) that feed decoded messages into the
//! protocol engine from `relayctl-protocol`.

pub mod config;
pub mod error;
pub mod monitor;
pub mod registry;
pub mod serial;
pub mod session;
pub mod tcp;
pub mod udp;

pub use config::Config;
pub use error::ServerError;
pub use registry::BroadcastRegistry;
pub use session::{ServerContext, SessionHandle, SessionKind};
