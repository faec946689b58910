//! Health and status endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::bridge::Bridge;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves
    pub status: &'static str,

    /// Crate version
    pub version: &'static str,
}

/// Bridge status response
#[derive(Serialize)]
pub struct StatusResponse {
    /// Crate version
    pub version: &'static str,

    /// Number of devices currently connected
    pub connected_devices: usize,

    /// Whether any device can receive commands right now
    pub has_device: bool,
}

/// Liveness probe
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Bridge status, including connected device count
async fn status(State(bridge): State<Arc<Bridge>>) -> Json<StatusResponse> {
    let connected_devices = bridge.connected_devices().await.len();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        connected_devices,
        has_device: connected_devices > 0,
    })
}

/// Build health routes
pub fn router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .with_state(bridge)
}
