//! Device WebSocket endpoint
//!
//! Each accepted connection is a two-state machine: it must produce a valid
//! handshake before the deadline to become a tracked device, then stays in
//! steady-state message handling until the socket closes. There is no path
//! back; a closed connection reconnects from scratch.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{
        ConnectInfo, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::bridge::Bridge;
use crate::devices::Device;
use crate::protocol::{self, Handshake, HelloError, Outbound, ServerMessage};

/// Outbound queue depth per connection
const OUTBOUND_BUFFER: usize = 32;

/// State for the device WebSocket route
#[derive(Clone)]
pub struct WsState {
    /// Shared bridge core
    pub bridge: Arc<Bridge>,

    /// Deadline for the connection's first message
    pub handshake_timeout: Duration,
}

/// Build the device WebSocket router
pub fn router(state: WsState) -> Router {
    Router::new().route("/ws", get(ws_upgrade)).with_state(state)
}

/// Handle WebSocket upgrade for device connections
async fn ws_upgrade(
    State(state): State<WsState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer))
}

/// Drive one device connection from accept to close
async fn handle_socket(socket: WebSocket, state: WsState, peer: SocketAddr) {
    tracing::debug!(%peer, "connection accepted, awaiting handshake");
    let (mut sender, mut receiver) = socket.split();

    let handshake = match await_handshake(&mut receiver, state.handshake_timeout).await {
        Ok(handshake) => handshake,
        Err(Some((code, reason))) => {
            tracing::warn!(%peer, code, reason, "closing connection before handshake");
            let _ = sender
                .send(Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                })))
                .await;
            return;
        }
        // The peer went away on its own; nothing to close
        Err(None) => return,
    };

    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let device = Device::from_handshake(handshake, outbound_tx);
    let device_id = device.id.clone();
    let conn_id = device.conn_id;

    state.bridge.register_device(device).await;

    let ack = ServerMessage::HandshakeAck {
        device_id: device_id.clone(),
        server_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    if let Ok(json) = serde_json::to_string(&ack) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            state.bridge.remove_device(&device_id, conn_id).await;
            return;
        }
    }

    let writer = tokio::spawn(write_outbound(sender, outbound_rx));

    // Steady state: demultiplex replies and push events
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                state
                    .bridge
                    .handle_inbound(&device_id, conn_id, text.as_str())
                    .await;
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(device_id = %device_id, "ignoring binary frame");
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                tracing::debug!(device_id = %device_id, error = %e, "connection error");
                break;
            }
        }
    }

    state.bridge.remove_device(&device_id, conn_id).await;
    writer.abort();
}

/// Drain the outbound queue into the socket
///
/// Ends when the queue closes, the socket dies, or a close frame is queued.
async fn write_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
) {
    while let Some(frame) = outbound_rx.recv().await {
        match frame {
            Outbound::Text(text) => {
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Outbound::Close { code, reason } => {
                let _ = sender
                    .send(Message::Close(Some(CloseFrame {
                        code,
                        reason: reason.into(),
                    })))
                    .await;
                break;
            }
        }
    }
}

/// Rejection outcome for the pre-handshake wait: close code and reason, or
/// nothing when the peer is already gone
type HelloOutcome = Result<Handshake, Option<(u16, &'static str)>>;

/// Wait for the connection's first message and validate it as a handshake
///
/// Protocol-level ping/pong frames do not count as the first message.
async fn await_handshake(
    receiver: &mut SplitStream<WebSocket>,
    timeout: Duration,
) -> HelloOutcome {
    let deadline = Instant::now() + timeout;

    loop {
        let message = match tokio::time::timeout_at(deadline, receiver.next()).await {
            Err(_) => return Err(Some((protocol::CLOSE_HANDSHAKE_TIMEOUT, "Handshake timeout"))),
            Ok(None | Some(Err(_))) => return Err(None),
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                return match protocol::parse_hello(text.as_str()) {
                    Ok(handshake) => Ok(handshake),
                    Err(HelloError::NotHandshake) => {
                        Err(Some((protocol::CLOSE_EXPECTED_HANDSHAKE, "Expected handshake")))
                    }
                    Err(HelloError::Invalid) => {
                        Err(Some((protocol::CLOSE_INVALID_HANDSHAKE, "Invalid handshake")))
                    }
                };
            }
            Message::Binary(_) => {
                return Err(Some((protocol::CLOSE_INVALID_HANDSHAKE, "Invalid handshake")));
            }
            Message::Close(_) => return Err(None),
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}
