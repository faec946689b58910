//! Connected-device tracking
//!
//! Devices are app instances that completed the connection handshake and can
//! receive commands from the bridge

pub mod registry;
pub mod types;

pub use registry::DeviceRegistry;
pub use types::{Device, DeviceInfo, Platform};
