//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay's fixed routes
//! - Wire up middleware (request ID, tracing)
//! - Serve over plain HTTP or TLS with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{any, get},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::forward::{forward_handler, Forwarder};
use crate::ipinfo::{IpInfo, IpInfoService};

/// Routes advertised by `GET /`.
pub const ENDPOINTS: [&str; 3] = ["/", "/api/ip-info", "/api/forward"];

/// How long in-flight TLS connections may drain after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
    pub ip_info: Arc<IpInfoService>,
}

/// HTTP server for the relay.
pub struct RelayServer {
    router: Router,
    config: ServerConfig,
}

impl RelayServer {
    /// Create a new relay server with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let state = AppState {
            forwarder: Arc::new(Forwarder::new(Duration::from_secs(config.timeout))?),
            ip_info: Arc::new(IpInfoService::new(&config)?),
        };

        let router = Self::build_router(state, config.max_body_size);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, max_body_size: usize) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/api/ip-info", get(ip_info_handler))
            .route(
                "/api/forward",
                any(forward_handler).layer(DefaultBodyLimit::max(max_body_size)),
            )
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The fully layered router, e.g. for serving on a custom transport.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve plain HTTP until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, scheme = "http", "HTTP relay starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP relay stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        tracing::info!(address = %addr, scheme = "https", "HTTP relay starting");

        let handle = axum_server::Handle::new();
        let signal = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            signal.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTP relay stopped");
        Ok(())
    }
}

/// Body of `GET /`.
#[derive(Serialize)]
pub struct ServiceInfo {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub available_endpoints: [&'static str; 3],
}

async fn index_handler() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "running",
        name: "HTTP Relay",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Local::now().to_rfc3339(),
        available_endpoints: ENDPOINTS,
    })
}

async fn ip_info_handler(State(state): State<AppState>) -> Json<IpInfo> {
    Json(state.ip_info.lookup().await)
}
