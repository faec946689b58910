//! Registry of connected devices

use std::collections::HashMap;
use std::time::Instant;

use uuid::Uuid;

use super::types::{Device, DeviceInfo};

/// Registry of connected devices, keyed by device id
///
/// A device is present exactly while its connection is open and has
/// completed handshake. Removal and last-seen refresh are guarded by the
/// connection id so a displaced connection cannot touch the registration
/// that superseded it.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, Device>,
}

impl DeviceRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    /// Insert a device
    ///
    /// An existing registration under the same id is displaced and returned;
    /// the caller owns closing its connection and failing its in-flight
    /// commands.
    pub fn insert(&mut self, device: Device) -> Option<Device> {
        self.devices.insert(device.id.clone(), device)
    }

    /// Remove a device, but only if the registration belongs to `conn_id`
    pub fn remove(&mut self, device_id: &str, conn_id: Uuid) -> Option<Device> {
        if self.devices.get(device_id).is_some_and(|d| d.conn_id == conn_id) {
            return self.devices.remove(device_id);
        }
        None
    }

    /// Exact-match lookup
    #[must_use]
    pub fn get(&self, device_id: &str) -> Option<&Device> {
        self.devices.get(device_id)
    }

    /// The most recently active device
    #[must_use]
    pub fn primary(&self) -> Option<&Device> {
        self.devices.values().max_by_key(|d| d.last_seen)
    }

    /// Refresh a device's last-seen stamp for an inbound frame
    ///
    /// Returns false when the id is unknown or the frame came from a
    /// connection that lost its registration.
    pub fn touch(&mut self, device_id: &str, conn_id: Uuid) -> bool {
        match self.devices.get_mut(device_id) {
            Some(device) if device.conn_id == conn_id => {
                device.last_seen = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// Snapshots of all connected devices, in no particular order
    #[must_use]
    pub fn list(&self) -> Vec<DeviceInfo> {
        self.devices.values().map(Device::info).collect()
    }

    /// Number of connected devices
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
