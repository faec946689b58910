//! Device REST surface for the tool layer
//!
//! Listing, lookup, and command dispatch over HTTP. The bridge neither knows
//! nor validates command method names; they pass through verbatim.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;
use crate::bridge::Bridge;
use crate::devices::DeviceInfo;

/// REST request to dispatch a command
#[derive(Debug, Deserialize)]
pub struct CommandBody {
    /// Command method name, forwarded verbatim
    pub method: String,

    /// Command parameters, forwarded verbatim
    #[serde(default)]
    pub params: Value,
}

/// REST response for a dispatched command
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Whether the command resolved with a result
    pub ok: bool,

    /// Reply payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Failure text otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build device routes (nested under `/api/devices`)
pub fn router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route("/", get(list_devices))
        .route("/{device_id}", get(get_device))
        .route("/{device_id}/command", post(command_device))
        .with_state(bridge)
}

/// Build the primary-target command route
pub fn command_router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route("/api/command", post(command_primary))
        .with_state(bridge)
}

/// List all connected devices
async fn list_devices(State(bridge): State<Arc<Bridge>>) -> Json<Vec<DeviceInfo>> {
    Json(bridge.connected_devices().await)
}

/// Get a specific device
async fn get_device(
    State(bridge): State<Arc<Bridge>>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceInfo>, StatusCode> {
    bridge
        .get_device(&device_id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Dispatch a command to a named device
async fn command_device(
    State(bridge): State<Arc<Bridge>>,
    Path(device_id): Path<String>,
    Json(body): Json<CommandBody>,
) -> (StatusCode, Json<CommandResponse>) {
    dispatch(&bridge, Some(&device_id), body).await
}

/// Dispatch a command to the primary device
async fn command_primary(
    State(bridge): State<Arc<Bridge>>,
    Json(body): Json<CommandBody>,
) -> (StatusCode, Json<CommandResponse>) {
    dispatch(&bridge, None, body).await
}

/// Run a command through the bridge and map its outcome onto HTTP
async fn dispatch(
    bridge: &Bridge,
    device_id: Option<&str>,
    body: CommandBody,
) -> (StatusCode, Json<CommandResponse>) {
    match bridge.send_command(device_id, &body.method, body.params).await {
        Ok(result) => (
            StatusCode::OK,
            Json(CommandResponse {
                ok: true,
                result: Some(result),
                error: None,
            }),
        ),
        Err(e) => {
            let status = match &e {
                Error::NoDevice | Error::DeviceNotFound(_) => StatusCode::NOT_FOUND,
                Error::CommandTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                Error::Remote(_) | Error::DeviceDisconnected(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(CommandResponse {
                    ok: false,
                    result: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
