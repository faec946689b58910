//! Push-event dispatch for unsolicited device messages
//!
//! Devices emit events the assistant did not ask for: log lines, network
//! activity, state changes. Dispatch is fire-and-forget: one handler per
//! method name, last registration wins, no reply to the device.

use std::sync::Arc;

use serde_json::Value;

use crate::devices::DeviceInfo;

/// An unsolicited device-originated event
#[derive(Debug, Clone)]
pub struct PushEvent {
    /// Snapshot of the device that sent the event
    pub device: DeviceInfo,

    /// Event method name as sent on the wire
    pub method: String,

    /// Event payload, forwarded verbatim
    pub params: Value,
}

/// Handler invoked synchronously for each event of its registered method
pub type EventHandler = Arc<dyn Fn(PushEvent) + Send + Sync>;

/// Known instrumentation categories, for structured logging
///
/// Registration stays string-keyed; the event catalog is open-ended on the
/// device side. Classification only labels log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushKind {
    /// Console/log capture
    Log,
    /// Network request interception
    Network,
    /// App state changes
    State,
    /// Function tracing and profiling
    Trace,
    /// App lifecycle transitions
    Lifecycle,
    /// Anything else
    Other,
}

impl PushKind {
    /// Classify a wire method name by its leading segment
    #[must_use]
    pub fn of(method: &str) -> Self {
        match method.split(['.', ':', '_']).next().unwrap_or_default() {
            "log" | "console" => Self::Log,
            "network" => Self::Network,
            "state" => Self::State,
            "trace" | "profile" => Self::Trace,
            "app" | "lifecycle" => Self::Lifecycle,
            _ => Self::Other,
        }
    }

    /// Label used in log fields
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Network => "network",
            Self::State => "state",
            Self::Trace => "trace",
            Self::Lifecycle => "lifecycle",
            Self::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_prefixes() {
        assert_eq!(PushKind::of("log"), PushKind::Log);
        assert_eq!(PushKind::of("console.warn"), PushKind::Log);
        assert_eq!(PushKind::of("network_request"), PushKind::Network);
        assert_eq!(PushKind::of("state.changed"), PushKind::State);
        assert_eq!(PushKind::of("trace:enter"), PushKind::Trace);
        assert_eq!(PushKind::of("app.background"), PushKind::Lifecycle);
    }

    #[test]
    fn unknown_methods_are_other() {
        assert_eq!(PushKind::of("custom.thing"), PushKind::Other);
        assert_eq!(PushKind::of(""), PushKind::Other);
    }
}
