//! HTTP server for device connections and the command API
//!
//! One listener carries both surfaces: the device WebSocket endpoint (`/ws`)
//! and the REST endpoints the tool layer uses to inspect devices and
//! dispatch commands.

pub mod devices;
pub mod health;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bridge::Bridge;
use crate::config::Config;
use crate::{Error, Result};

/// The bridge server: device WebSocket listener plus command/status REST
pub struct BridgeServer {
    bridge: Arc<Bridge>,
    config: Config,
}

impl BridgeServer {
    /// Create a server and its owned bridge core from configuration
    #[must_use]
    pub fn new(config: Config) -> Self {
        let bridge = Arc::new(Bridge::new(config.command_timeout));
        Self { bridge, config }
    }

    /// The core this server routes into
    ///
    /// The tool layer sends commands and registers push-event handlers
    /// through this handle.
    #[must_use]
    pub fn bridge(&self) -> Arc<Bridge> {
        Arc::clone(&self.bridge)
    }

    /// Build the router with all routes
    fn router(&self) -> Router {
        let ws_state = ws::WsState {
            bridge: self.bridge(),
            handshake_timeout: self.config.handshake_timeout,
        };

        let router = Router::new()
            .merge(ws::router(ws_state))
            .nest("/api/devices", devices::router(self.bridge()))
            .merge(devices::command_router(self.bridge()))
            .merge(health::router(self.bridge()));

        // CORS layer for tool frontends running on other origins
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Bind the listening port
    ///
    /// Port conflicts surface here, before any connection is accepted.
    /// A bind failure is fatal to startup.
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be bound
    pub async fn bind(self) -> Result<BoundServer> {
        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind {addr}: {e}")))?;
        let local_addr = listener.local_addr()?;

        tracing::info!(addr = %local_addr, "bridge listening");

        Ok(BoundServer {
            router: self.router(),
            bridge: self.bridge,
            listener,
            local_addr,
        })
    }
}

/// A server bound to its port, ready to run
pub struct BoundServer {
    router: Router,
    bridge: Arc<Bridge>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl BoundServer {
    /// The address the listener actually bound (resolves port 0)
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The core this server routes into
    #[must_use]
    pub fn bridge(&self) -> Arc<Bridge> {
        Arc::clone(&self.bridge)
    }

    /// Serve until the process receives ctrl-c
    ///
    /// Per-connection failures are isolated to their tasks; only listener
    /// errors surface here.
    ///
    /// # Errors
    ///
    /// Returns error if the server fails while serving
    pub async fn run(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("bridge stopped");
        Ok(())
    }

    /// Run the server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

/// Resolve when the process receives ctrl-c
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
