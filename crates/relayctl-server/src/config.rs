//! Server configuration.
//!
//! Configuration is read once at startup from a YAML file; the listeners
//! and the serial port are taken over for the lifetime of the process, so
//! changes require a restart. A transport is enabled only when its port is
//! present.

use crate::error::ServerError;
use relayctl_protocol::decode_terminator;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device to serve, e.g. `/dev/ttyUSB0`. Absent means no serial
    /// session.
    pub serial_port: Option<String>,
    /// Baud rate for the serial port.
    pub serial_baud: u32,
    /// TCP listener port. Absent means no TCP server.
    pub tcp_port: Option<u16>,
    /// UDP listener port. Absent means no UDP server.
    pub udp_port: Option<u16>,
    /// Incoming message terminator, with backslash escapes.
    pub incoming_terminator: String,
    /// Outgoing message terminator, with backslash escapes.
    pub outgoing_terminator: String,
    /// Broadcast unsolicited transition alerts to connected sessions.
    pub send_unsolicited_alerts: bool,
    /// Prefix outgoing messages with a datestamp.
    pub send_date_stamp: bool,
    /// Append input counters to input query replies and alerts.
    pub send_counts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            serial_port: None,
            serial_baud: 9600,
            tcp_port: None,
            udp_port: None,
            incoming_terminator: "\\n".to_string(),
            outgoing_terminator: "\\n".to_string(),
            send_unsolicited_alerts: true,
            send_date_stamp: true,
            send_counts: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Config, ServerError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Decoded incoming terminator bytes.
    pub fn incoming_terminator_bytes(&self) -> Vec<u8> {
        decode_terminator(&self.incoming_terminator)
    }

    /// Decoded outgoing terminator bytes.
    pub fn outgoing_terminator_bytes(&self) -> Vec<u8> {
        decode_terminator(&self.outgoing_terminator)
    }

    /// True when at least one transport is configured.
    pub fn has_any_transport(&self) -> bool {
        self.serial_port.is_some() || self.tcp_port.is_some() || self.udp_port.is_some()
    }
}
