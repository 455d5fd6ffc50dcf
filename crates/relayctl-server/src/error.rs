//! Error types for the relay control server.

use thiserror::Error;

/// Errors surfaced while bringing up or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Socket or file I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    /// The serial port could not be opened.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
}
