//! Device records for connected app instances

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{Handshake, Outbound};

/// Platform a device reports at handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// iOS app (device or simulator)
    Ios,
    /// Android app (device or emulator)
    Android,
    /// React Native app on either mobile platform
    ReactNative,
    /// macOS desktop app
    Macos,
    /// Flutter app
    Flutter,
    /// Browser-hosted app
    Web,
}

impl Platform {
    /// Wire name of the platform
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::ReactNative => "react-native",
            Self::Macos => "macos",
            Self::Flutter => "flutter",
            Self::Web => "web",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connected device tracked by the registry
///
/// Holds the connection's outbound queue; the connection itself is driven by
/// its own task, which removes the device again when the socket closes.
#[derive(Debug)]
pub struct Device {
    /// Stable device identity, peer-supplied or generated
    pub id: String,

    /// Identifies the underlying connection; a reconnect gets a fresh one
    pub conn_id: Uuid,

    /// Platform declared at handshake
    pub platform: Platform,

    /// Human-readable app name
    pub app_name: String,

    /// App version string
    pub app_version: String,

    /// Capability tags declared by the app SDK
    pub capabilities: Vec<String>,

    /// Wall-clock time the handshake completed
    pub connected_at: chrono::DateTime<chrono::Utc>,

    /// Refreshed on every inbound frame; drives primary-device selection
    pub last_seen: Instant,

    /// Queue into the connection's writer task
    pub outbound: mpsc::Sender<Outbound>,
}

impl Device {
    /// Build a device from its handshake, generating an id if none was supplied
    #[must_use]
    pub fn from_handshake(handshake: Handshake, outbound: mpsc::Sender<Outbound>) -> Self {
        let id = handshake
            .device_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("device_{}", Uuid::new_v4()));

        Self {
            id,
            conn_id: Uuid::new_v4(),
            platform: handshake.platform,
            app_name: handshake.app_name,
            app_version: handshake.app_version,
            capabilities: handshake.capabilities,
            connected_at: chrono::Utc::now(),
            last_seen: Instant::now(),
            outbound,
        }
    }

    /// Snapshot for API responses and event payloads
    #[must_use]
    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            device_id: self.id.clone(),
            platform: self.platform,
            app_name: self.app_name.clone(),
            app_version: self.app_version.clone(),
            capabilities: self.capabilities.clone(),
            connected_at: self.connected_at,
        }
    }
}

/// Snapshot of a connected device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    /// Stable device identity
    pub device_id: String,

    /// Platform declared at handshake
    pub platform: Platform,

    /// Human-readable app name
    pub app_name: String,

    /// App version string
    pub app_version: String,

    /// Capability tags declared by the app SDK
    pub capabilities: Vec<String>,

    /// Wall-clock time the handshake completed
    pub connected_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handshake(device_id: Option<&str>) -> Handshake {
        Handshake {
            device_id: device_id.map(str::to_string),
            platform: Platform::Ios,
            app_name: "Demo".to_string(),
            app_version: "1.0".to_string(),
            capabilities: vec!["state".to_string()],
        }
    }

    #[test]
    fn platform_wire_names() {
        assert_eq!(
            serde_json::to_value(Platform::ReactNative).unwrap(),
            serde_json::json!("react-native")
        );
        assert_eq!(Platform::Ios.to_string(), "ios");
        let parsed: Platform = serde_json::from_str("\"flutter\"").unwrap();
        assert_eq!(parsed, Platform::Flutter);
    }

    #[test]
    fn keeps_supplied_device_id() {
        let (tx, _rx) = mpsc::channel(1);
        let device = Device::from_handshake(handshake(Some("sim-42")), tx);
        assert_eq!(device.id, "sim-42");
    }

    #[test]
    fn generates_id_when_absent_or_empty() {
        let (tx, _rx) = mpsc::channel(1);
        let device = Device::from_handshake(handshake(None), tx.clone());
        assert!(device.id.starts_with("device_"));

        let empty = Device::from_handshake(
            Handshake {
                device_id: Some(String::new()),
                ..handshake(None)
            },
            tx,
        );
        assert!(empty.id.starts_with("device_"));
    }

    #[test]
    fn fresh_conn_ids_per_connection() {
        let (tx, _rx) = mpsc::channel(1);
        let a = Device::from_handshake(handshake(Some("same")), tx.clone());
        let b = Device::from_handshake(handshake(Some("same")), tx);
        assert_ne!(a.conn_id, b.conn_id);
    }
}
