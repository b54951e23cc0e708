//! Startup orchestration.
//!
//! Order: metrics exporter (optional) → relay state → transport selection
//! → serve. Any error here is returned to `main`; nothing after this point
//! can fail the process.

use std::io;
use std::net::SocketAddr;
use std::path::Path;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::RelayServer;
use crate::lifecycle::Shutdown;
use crate::net::{load_tls_config, tls_files_present};
use crate::observability::metrics;

/// Start the relay and serve until `shutdown` fires.
pub async fn start(config: ServerConfig, shutdown: Shutdown) -> Result<(), ServerError> {
    tracing::info!(
        bind_address = %config.bind_address(),
        timeout_secs = config.timeout,
        debug_mode = config.debug_mode,
        "Configuration loaded"
    );

    if config.metrics_enabled {
        let addr: SocketAddr = config.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = RelayServer::new(config.clone())?;

    if tls_files_present(&config) {
        let tls = load_tls_config(
            Path::new(&config.ssl_cert_path),
            Path::new(&config.ssl_key_path),
        )
        .await?;
        let addr = resolve(&config.bind_address()).await?;
        server.run_tls(addr, tls, shutdown.subscribe()).await
    } else {
        tracing::info!(
            cert = %config.ssl_cert_path,
            key = %config.ssl_key_path,
            "TLS files not found, serving plain HTTP"
        );
        let listener = TcpListener::bind(config.bind_address()).await?;
        server.run(listener, shutdown.subscribe()).await
    }
}

async fn resolve(address: &str) -> io::Result<SocketAddr> {
    tokio::net::lookup_host(address).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no address for {}", address),
        )
    })
}
