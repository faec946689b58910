//! Request/response multiplexing for in-flight commands

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::{Error, Result};

/// One outstanding command awaiting a device's reply
#[derive(Debug)]
struct PendingRequest {
    /// Device the command was written to
    device_id: String,

    /// Completes the caller's `send_command` future
    tx: oneshot::Sender<Result<Value>>,
}

/// Correlates command replies back to their callers
///
/// Correlation ids are unique among outstanding requests. Entries leave the
/// table on reply, timeout, and device disconnect, so each caller resolves
/// exactly once and late replies find nothing to complete.
#[derive(Debug, Default)]
pub struct CommandRouter {
    pending: HashMap<String, PendingRequest>,
}

impl CommandRouter {
    /// Create a new empty router
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Register a pending request for `device_id`
    ///
    /// Returns the fresh correlation id and the receiver the caller awaits.
    pub fn register(&mut self, device_id: &str) -> (String, oneshot::Receiver<Result<Value>>) {
        let request_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            request_id.clone(),
            PendingRequest {
                device_id: device_id.to_string(),
                tx,
            },
        );
        (request_id, rx)
    }

    /// Resolve a pending request with a reply outcome
    ///
    /// Returns false when the id is unknown (a late or duplicate reply).
    pub fn resolve(&mut self, request_id: &str, outcome: Result<Value>) -> bool {
        match self.pending.remove(request_id) {
            Some(pending) => {
                // The caller may have timed out between reply arrival and
                // this call; a dropped receiver is not an error.
                let _ = pending.tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Drop a pending request without completing it
    ///
    /// Timeout path: the caller already gave up on the receiver.
    pub fn discard(&mut self, request_id: &str) {
        self.pending.remove(request_id);
    }

    /// Reject every pending request targeting `device_id`
    ///
    /// Returns how many requests were failed.
    pub fn fail_device(&mut self, device_id: &str) -> usize {
        let ids: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| p.device_id == device_id)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &ids {
            if let Some(pending) = self.pending.remove(id) {
                let _ = pending
                    .tx
                    .send(Err(Error::DeviceDisconnected(device_id.to_string())));
            }
        }
        ids.len()
    }

    /// Number of outstanding requests
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no requests are outstanding
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use tokio::sync::oneshot::error::TryRecvError;

    #[test]
    fn correlation_ids_are_distinct() {
        let mut router = CommandRouter::new();
        let ids: HashSet<String> = (0..100).map(|_| router.register("dev").0).collect();
        assert_eq!(ids.len(), 100);
        assert_eq!(router.len(), 100);
    }

    #[test]
    fn resolve_round_trip() {
        let mut router = CommandRouter::new();
        let (request_id, mut rx) = router.register("dev");

        assert!(router.resolve(&request_id, Ok(json!({"status": "done"}))));
        assert!(router.is_empty());

        let outcome = rx.try_recv().unwrap();
        assert_eq!(outcome.unwrap(), json!({"status": "done"}));
    }

    #[test]
    fn resolve_unknown_id_is_false() {
        let mut router = CommandRouter::new();
        assert!(!router.resolve("nope", Ok(json!(null))));
    }

    #[test]
    fn resolve_is_exactly_once() {
        let mut router = CommandRouter::new();
        let (request_id, _rx) = router.register("dev");

        assert!(router.resolve(&request_id, Ok(json!(1))));
        assert!(!router.resolve(&request_id, Ok(json!(2))));
    }

    #[test]
    fn discard_removes_without_completing() {
        let mut router = CommandRouter::new();
        let (request_id, mut rx) = router.register("dev");

        router.discard(&request_id);
        assert!(router.is_empty());
        assert!(matches!(rx.try_recv().unwrap_err(), TryRecvError::Closed));
    }

    #[test]
    fn fail_device_rejects_only_its_requests() {
        let mut router = CommandRouter::new();
        let (_, mut rx_a1) = router.register("a");
        let (_, mut rx_a2) = router.register("a");
        let (_, mut rx_b) = router.register("b");

        assert_eq!(router.fail_device("a"), 2);
        assert_eq!(router.len(), 1);

        for rx in [&mut rx_a1, &mut rx_a2] {
            let err = rx.try_recv().unwrap().unwrap_err();
            assert!(matches!(err, Error::DeviceDisconnected(id) if id == "a"));
        }
        assert!(matches!(rx_b.try_recv().unwrap_err(), TryRecvError::Empty));
    }
}
