//! Shared test utilities
//!
//! Spins up a real bridge on an ephemeral port and drives it with
//! `tokio-tungstenite` clients playing the role of app SDKs.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use tether_bridge::{Bridge, BridgeServer, Config};

/// A test client connection, standing in for an app SDK
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spin up a bridge on an ephemeral port with short test timeouts
pub async fn spawn_server() -> (Arc<Bridge>, SocketAddr) {
    spawn_server_with(Config {
        port: 0,
        handshake_timeout: Duration::from_millis(250),
        command_timeout: Duration::from_millis(500),
    })
    .await
}

/// Spin up a bridge with explicit configuration
pub async fn spawn_server_with(config: Config) -> (Arc<Bridge>, SocketAddr) {
    let bound = BridgeServer::new(config).bind().await.expect("bind failed");
    let bridge = bound.bridge();
    let addr = bound.local_addr();
    drop(bound.spawn());
    (bridge, addr)
}

/// Open a raw WebSocket connection to the bridge
pub async fn connect(addr: SocketAddr) -> WsClient {
    let url = format!("ws://127.0.0.1:{}/ws", addr.port());
    let (client, _) = connect_async(url.as_str()).await.expect("websocket connect failed");
    client
}

/// Connect and complete a handshake; returns the client and its assigned id
pub async fn connect_device(
    addr: SocketAddr,
    device_id: Option<&str>,
    platform: &str,
) -> (WsClient, String) {
    let mut client = connect(addr).await;

    let mut handshake = json!({
        "type": "handshake",
        "platform": platform,
        "appName": "DemoApp",
        "appVersion": "1.2.3",
        "capabilities": ["state", "logs"],
    });
    if let Some(id) = device_id {
        handshake["deviceId"] = json!(id);
    }
    client
        .send(Message::text(handshake.to_string()))
        .await
        .expect("handshake send failed");

    let ack = recv_json(&mut client).await.expect("no handshake ack");
    assert_eq!(ack["type"], "handshake_ack");
    assert!(ack["serverVersion"].as_str().is_some_and(|v| !v.is_empty()));
    let id = ack["deviceId"]
        .as_str()
        .expect("ack missing deviceId")
        .to_string();

    (client, id)
}

/// Receive the next text frame as JSON; None on close or after five seconds
pub async fn recv_json(client: &mut WsClient) -> Option<Value> {
    recv_json_within(client, Duration::from_secs(5)).await
}

/// Receive the next text frame as JSON within an explicit window
pub async fn recv_json_within(client: &mut WsClient, window: Duration) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        let message = tokio::time::timeout_at(deadline, client.next()).await.ok()??;
        match message {
            Ok(Message::Text(text)) => return serde_json::from_str(&text).ok(),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Wait for the server to close the connection; returns the close code
pub async fn recv_close_code(client: &mut WsClient) -> Option<u16> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let message = tokio::time::timeout_at(deadline, client.next()).await.ok()??;
        match message {
            Ok(Message::Close(frame)) => return frame.map(|f| u16::from(f.code)),
            Ok(_) => {}
            Err(_) => return None,
        }
    }
}

/// Poll until `predicate` holds; false if two seconds pass first
pub async fn wait_until<F>(mut predicate: F) -> bool
where
    F: AsyncFnMut() -> bool,
{
    for _ in 0..100 {
        if predicate().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
