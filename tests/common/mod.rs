//! Shared utilities for relay integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Path, RawQuery, State},
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use http_relay::{RelayServer, ServerConfig, Shutdown};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral local port.
#[allow(dead_code)]
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A local address nothing is listening on.
#[allow(dead_code)]
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Mock target that records how often it was hit.
///
/// - `ANY /echo` returns the request it received as JSON
/// - `ANY /status/{code}` returns `code` with a JSON body
/// - `GET /text` returns a plain-text body
/// - `GET /slow/{ms}` waits `ms` milliseconds and only then counts the hit
#[allow(dead_code)]
pub async fn start_echo_backend() -> (SocketAddr, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let app = Router::new()
        .route("/echo", any(echo).layer(DefaultBodyLimit::disable()))
        .route("/status/{code}", any(status))
        .route("/text", get(text))
        .route("/slow/{ms}", get(slow))
        .with_state(hits.clone());
    (serve(app).await, hits)
}

async fn echo(
    State(hits): State<Arc<AtomicU32>>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let mut received = Map::new();
    for (name, value) in &headers {
        received.insert(
            name.as_str().to_string(),
            Value::String(value.to_str().unwrap_or_default().to_string()),
        );
    }
    (
        [("x-backend", "echo")],
        Json(json!({
            "method": method.as_str(),
            "query": query,
            "headers": received,
            "body": body,
        })),
    )
}

async fn status(State(hits): State<Arc<AtomicU32>>, Path(code): Path<u16>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);
    (status, Json(json!({ "code": code })))
}

async fn text(State(hits): State<Arc<AtomicU32>>) -> &'static str {
    hits.fetch_add(1, Ordering::SeqCst);
    "plain body"
}

async fn slow(State(hits): State<Arc<AtomicU32>>, Path(ms): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    hits.fetch_add(1, Ordering::SeqCst);
    "done"
}

/// Start a relay on an ephemeral port.
#[allow(dead_code)]
pub async fn start_relay(config: ServerConfig) -> (SocketAddr, Shutdown) {
    let shutdown = Shutdown::new();
    let server = RelayServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Test config: short timeout, collaborators pointed at nothing.
#[allow(dead_code)]
pub fn relay_config() -> ServerConfig {
    let dead = format!("http://{}", closed_addr());
    ServerConfig {
        timeout: 5,
        ip_echo_url: dead.clone(),
        geo_lookup_url: format!("{}/{{ip}}", dead),
        ..ServerConfig::default()
    }
}

/// Client that never goes through an environment proxy.
#[allow(dead_code)]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
