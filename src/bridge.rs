//! The bridge core: owned connection state and the command contract
//!
//! A [`Bridge`] owns the device registry, the pending-request table, and the
//! push-event handler table behind a single lock, so connection callbacks
//! running on different runtime threads cannot race on registration or
//! correlation-id bookkeeping. Construction and teardown follow the server
//! that owns it; there is no global state.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::devices::{Device, DeviceInfo, DeviceRegistry};
use crate::events::{EventHandler, PushEvent, PushKind};
use crate::protocol::{self, CommandEnvelope, InboundFrame, Outbound};
use crate::router::CommandRouter;
use crate::{Error, Result};

/// Mutable bridge state, serialized behind one lock
#[derive(Default)]
struct BridgeState {
    registry: DeviceRegistry,
    router: CommandRouter,
    handlers: HashMap<String, EventHandler>,
}

/// Connection and command-routing core
///
/// The consumer-facing contract is [`Bridge::send_command`] plus the device
/// accessors; the connection-facing entry points are crate-private and driven
/// by the WebSocket tasks.
pub struct Bridge {
    state: Mutex<BridgeState>,
    command_timeout: Duration,
    command_timeout_ms: u64,
}

impl Bridge {
    /// Create a bridge with the given per-command reply deadline
    #[must_use]
    pub fn new(command_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(BridgeState::default()),
            command_timeout,
            command_timeout_ms: u64::try_from(command_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether at least one device has completed its handshake
    pub async fn has_connected_device(&self) -> bool {
        !self.state.lock().await.registry.is_empty()
    }

    /// Exact-match device lookup
    pub async fn get_device(&self, device_id: &str) -> Option<DeviceInfo> {
        self.state.lock().await.registry.get(device_id).map(Device::info)
    }

    /// The most recently active device
    pub async fn get_primary_device(&self) -> Option<DeviceInfo> {
        self.state.lock().await.registry.primary().map(Device::info)
    }

    /// All connected devices, in no particular order
    pub async fn connected_devices(&self) -> Vec<DeviceInfo> {
        self.state.lock().await.registry.list()
    }

    /// Register the handler for a push-event method, replacing any prior one
    pub async fn on_event<F>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(PushEvent) + Send + Sync + 'static,
    {
        let method = method.into();
        let mut state = self.state.lock().await;
        if state
            .handlers
            .insert(method.clone(), std::sync::Arc::new(handler))
            .is_some()
        {
            tracing::debug!(method = %method, "replaced push-event handler");
        }
    }

    /// Send a command to a device and await its reply
    ///
    /// With `device_id` absent, the primary (most recently active) device is
    /// targeted. Fails immediately, without touching the network, when no
    /// device can be resolved. Replies resolve by correlation id, so
    /// concurrent commands to the same device may complete in any order.
    ///
    /// # Errors
    ///
    /// [`Error::NoDevice`] with nothing connected, [`Error::DeviceNotFound`]
    /// on a lookup miss, [`Error::Remote`] when the device replies with an
    /// error, [`Error::CommandTimeout`] when no reply arrives in time, and
    /// [`Error::DeviceDisconnected`] when the device drops mid-flight.
    pub async fn send_command(
        &self,
        device_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> Result<Value> {
        let (request_id, target_id, outbound, rx) = {
            let mut state = self.state.lock().await;
            let device = match device_id {
                Some(id) => state
                    .registry
                    .get(id)
                    .ok_or_else(|| Error::DeviceNotFound(id.to_string()))?,
                None => state.registry.primary().ok_or(Error::NoDevice)?,
            };
            let target_id = device.id.clone();
            let outbound = device.outbound.clone();
            let (request_id, rx) = state.router.register(&target_id);
            (request_id, target_id, outbound, rx)
        };

        let envelope = CommandEnvelope::new(&request_id, method, params);
        let text = match serde_json::to_string(&envelope) {
            Ok(text) => text,
            Err(e) => {
                self.state.lock().await.router.discard(&request_id);
                return Err(e.into());
            }
        };

        tracing::debug!(
            device_id = %target_id,
            request_id = %request_id,
            method,
            "sending command"
        );

        if outbound.send(Outbound::Text(text)).await.is_err() {
            self.state.lock().await.router.discard(&request_id);
            return Err(Error::DeviceDisconnected(target_id));
        }

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Completion sender dropped without resolving; treat as a drop
            Ok(Err(_)) => Err(Error::DeviceDisconnected(target_id)),
            Err(_) => {
                self.state.lock().await.router.discard(&request_id);
                tracing::warn!(
                    device_id = %target_id,
                    request_id = %request_id,
                    method,
                    "command timed out"
                );
                Err(Error::CommandTimeout {
                    method: method.to_string(),
                    timeout_ms: self.command_timeout_ms,
                })
            }
        }
    }

    /// Promote a handshaken connection into the registry
    ///
    /// A currently-connected device with the same id is displaced: its
    /// connection is closed and its in-flight commands fail. The pending
    /// sweep runs under the same lock as the insert, so commands dispatched
    /// through the new registration are untouched.
    pub(crate) async fn register_device(&self, device: Device) {
        let info = device.info();
        let displaced = {
            let mut state = self.state.lock().await;
            let displaced = state.registry.insert(device);
            if let Some(old) = &displaced {
                state.router.fail_device(&old.id);
            }
            displaced
        };

        if let Some(old) = displaced {
            tracing::warn!(
                device_id = %old.id,
                "device id reconnected, displacing previous connection"
            );
            let _ = old
                .outbound
                .send(Outbound::Close {
                    code: protocol::CLOSE_SUPERSEDED,
                    reason: "Superseded by new connection",
                })
                .await;
        }

        tracing::info!(
            device_id = %info.device_id,
            platform = %info.platform,
            app = %info.app_name,
            version = %info.app_version,
            "device connected"
        );
    }

    /// Remove a device when its connection closes, failing its in-flight commands
    ///
    /// `conn_id` guards against a displaced connection's teardown removing
    /// the registration that superseded it. Safe to call more than once.
    pub(crate) async fn remove_device(&self, device_id: &str, conn_id: Uuid) {
        let mut state = self.state.lock().await;
        if state.registry.remove(device_id, conn_id).is_some() {
            let failed = state.router.fail_device(device_id);
            tracing::info!(device_id, failed_requests = failed, "device disconnected");
        }
    }

    /// Handle one inbound text frame from a connected device
    ///
    /// Replies are matched against the pending table; frames carrying a
    /// method and no recognized id go to push dispatch; everything else is
    /// logged and dropped.
    pub(crate) async fn handle_inbound(&self, device_id: &str, conn_id: Uuid, text: &str) {
        let device = {
            let mut state = self.state.lock().await;
            if !state.registry.touch(device_id, conn_id) {
                tracing::debug!(device_id, "dropping frame from stale connection");
                return;
            }
            state.registry.get(device_id).map(Device::info)
        };
        let Some(device) = device else { return };

        let frame: InboundFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(device_id, error = %e, "dropping malformed frame");
                return;
            }
        };
        let InboundFrame {
            id,
            result,
            error,
            method,
            params,
        } = frame;

        if let Some(request_id) = id {
            let outcome = match error {
                Some(remote) => Err(Error::Remote(remote.message())),
                None => Ok(result.unwrap_or(Value::Null)),
            };
            if self.state.lock().await.router.resolve(&request_id, outcome) {
                return;
            }
            tracing::debug!(
                device_id,
                request_id = %request_id,
                "reply for unknown request id, ignoring"
            );
            if method.is_none() {
                return;
            }
        }

        if let Some(method) = method {
            self.dispatch_push(device, method, params.unwrap_or(Value::Null)).await;
        } else {
            tracing::debug!(device_id, "dropping frame with neither reply id nor method");
        }
    }

    /// Look up and invoke the handler for a push event
    async fn dispatch_push(&self, device: DeviceInfo, method: String, params: Value) {
        let handler = self.state.lock().await.handlers.get(&method).cloned();
        let kind = PushKind::of(&method);

        match handler {
            Some(handler) => {
                tracing::debug!(
                    device_id = %device.device_id,
                    method = %method,
                    kind = kind.as_str(),
                    "dispatching push event"
                );
                handler(PushEvent {
                    device,
                    method,
                    params,
                });
            }
            None => tracing::debug!(
                device_id = %device.device_id,
                method = %method,
                kind = kind.as_str(),
                "no handler for push event, dropping"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_device_rejects_without_a_timer() {
        let bridge = Bridge::new(Duration::from_secs(10));
        let started = std::time::Instant::now();
        let err =
            tokio_test::block_on(bridge.send_command(None, "get_app_state", json!({}))).unwrap_err();
        assert!(matches!(err, Error::NoDevice));
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn named_lookup_miss_rejects_immediately() {
        let bridge = Bridge::new(Duration::from_secs(10));
        let err = tokio_test::block_on(bridge.send_command(Some("ghost"), "ping", Value::Null))
            .unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound(id) if id == "ghost"));
    }

    #[test]
    fn accessors_on_empty_bridge() {
        let bridge = Bridge::new(Duration::from_secs(10));
        tokio_test::block_on(async {
            assert!(!bridge.has_connected_device().await);
            assert!(bridge.get_primary_device().await.is_none());
            assert!(bridge.get_device("any").await.is_none());
            assert!(bridge.connected_devices().await.is_empty());
        });
    }
}
