//! Error types for the tether bridge

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the tether bridge
#[derive(Debug, Error)]
pub enum Error {
    /// No device is connected to the bridge
    #[error("no device connected")]
    NoDevice,

    /// A specifically named device is not connected
    #[error("device not connected: {0}")]
    DeviceNotFound(String),

    /// The target device disconnected while a command was in flight
    #[error("device disconnected: {0}")]
    DeviceDisconnected(String),

    /// The device did not reply within the command timeout
    #[error("command {method} timed out after {timeout_ms}ms")]
    CommandTimeout {
        /// Method name of the command that timed out
        method: String,
        /// Configured reply deadline, in milliseconds
        timeout_ms: u64,
    },

    /// The device replied with an error
    #[error("device error: {0}")]
    Remote(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
