//! Tether Bridge - device bridge for AI-assisted mobile app development
//!
//! Accepts persistent WebSocket connections from instrumented mobile and web
//! apps, tracks each as a device, and routes JSON-RPC-shaped commands to
//! them on behalf of an assistant-facing tool layer. Replies correlate back
//! to callers by request id; unsolicited device events fan out to registered
//! handlers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                Assistant tool layer                  │
//! │   state │ ui │ network │ logs │ build │ ...         │
//! └────────────────────┬────────────────────────────────┘
//!                      │ send_command / push events
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Tether Bridge                       │
//! │   Listener │ Handshake │ Registry │ Router          │
//! └────────────────────┬────────────────────────────────┘
//!                      │ WebSocket (JSON frames)
//! ┌────────────────────▼────────────────────────────────┐
//! │       App SDK (iOS / Android / RN / Flutter / web)  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod bridge;
pub mod config;
pub mod devices;
pub mod error;
pub mod events;
pub mod protocol;
pub mod router;

pub use api::{BoundServer, BridgeServer};
pub use bridge::Bridge;
pub use config::Config;
pub use devices::{DeviceInfo, Platform};
pub use error::{Error, Result};
pub use events::{EventHandler, PushEvent, PushKind};
