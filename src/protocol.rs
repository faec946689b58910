//! Wire protocol for device connections
//!
//! Messages are JSON text frames over a persistent WebSocket. The first
//! frame on a connection must be a handshake; afterwards the channel carries
//! JSON-RPC-shaped command envelopes (server → device) and their replies,
//! plus unsolicited push events (device → server).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::devices::Platform;

/// Close code for a connection that never sent its handshake
pub const CLOSE_HANDSHAKE_TIMEOUT: u16 = 4000;

/// Close code for a first message that was not a handshake
pub const CLOSE_EXPECTED_HANDSHAKE: u16 = 4001;

/// Close code for a handshake that could not be parsed
pub const CLOSE_INVALID_HANDSHAKE: u16 = 4002;

/// Close code for a connection displaced by a reconnect under the same device id
pub const CLOSE_SUPERSEDED: u16 = 4003;

/// JSON-RPC version tag carried in every command envelope
const JSONRPC_VERSION: &str = "2.0";

/// Handshake payload, the mandatory first message from a device
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Stable device identity; generated by the registry when absent
    #[serde(default)]
    pub device_id: Option<String>,

    /// Platform the app runs on
    pub platform: Platform,

    /// Human-readable app name
    pub app_name: String,

    /// App version string
    pub app_version: String,

    /// Capability tags declared by the app SDK ("state", "network", ...)
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Why a connection's first message was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelloError {
    /// Structured message whose `type` discriminator is not `"handshake"`
    NotHandshake,

    /// Not JSON, or a handshake with missing or invalid fields
    Invalid,
}

/// Parse and validate the first message on a connection
///
/// # Errors
///
/// [`HelloError::NotHandshake`] for structured messages with the wrong
/// discriminator, [`HelloError::Invalid`] for anything unparseable.
pub fn parse_hello(text: &str) -> std::result::Result<Handshake, HelloError> {
    let value: Value = serde_json::from_str(text).map_err(|_| HelloError::Invalid)?;
    match value.get("type").and_then(Value::as_str) {
        Some("handshake") => serde_json::from_value(value).map_err(|_| HelloError::Invalid),
        _ => Err(HelloError::NotHandshake),
    }
}

/// Typed server → device messages
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Handshake accepted; carries the assigned device id
    #[serde(rename_all = "camelCase")]
    HandshakeAck {
        /// Device id assigned or confirmed by the registry
        device_id: String,
        /// Bridge version string
        server_version: String,
    },
}

/// JSON-RPC-shaped command envelope (server → device)
#[derive(Debug, Clone, Serialize)]
pub struct CommandEnvelope {
    /// Always `"2.0"`
    pub jsonrpc: &'static str,

    /// Correlation id matching the eventual reply
    pub id: String,

    /// Method name, forwarded verbatim
    pub method: String,

    /// Parameters, forwarded verbatim; omitted when null
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl CommandEnvelope {
    /// Build an envelope for one command dispatch
    #[must_use]
    pub fn new(id: &str, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: id.to_string(),
            method: method.to_string(),
            params,
        }
    }
}

/// A device → server frame after handshake, before classification
///
/// Replies carry an `id`; push events carry a `method` and no `id`. The
/// bridge classifies against its pending-request table, so the raw fields
/// stay visible here.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    /// Correlation id of the command this frame replies to
    #[serde(default)]
    pub id: Option<String>,

    /// Successful reply payload
    #[serde(default)]
    pub result: Option<Value>,

    /// Failed reply payload
    #[serde(default)]
    pub error: Option<RemoteError>,

    /// Push-event method name
    #[serde(default)]
    pub method: Option<String>,

    /// Push-event parameters
    #[serde(default)]
    pub params: Option<Value>,
}

/// Error payload inside a command reply
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    /// Human-readable failure text from the device
    #[serde(default)]
    pub message: Option<String>,
}

impl RemoteError {
    /// The failure text, defaulted when the device sent none
    #[must_use]
    pub fn message(self) -> String {
        self.message.unwrap_or_else(|| "Unknown error".to_string())
    }
}

/// Frame queued for delivery to a device connection
#[derive(Debug, Clone)]
pub enum Outbound {
    /// JSON text payload
    Text(String),

    /// Close the connection with a protocol code
    Close {
        /// WebSocket close code
        code: u16,
        /// Short close reason
        reason: &'static str,
    },
}
