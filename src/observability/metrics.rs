//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_forward_requests_total` (counter): forwards by method, status
//! - `relay_forward_duration_seconds` (histogram): forward latency by method
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one handled forward.
pub fn record_forward(method: &str, status: u16, start_time: Instant) {
    metrics::counter!(
        "relay_forward_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_forward_duration_seconds", "method" => method.to_string())
        .record(start_time.elapsed().as_secs_f64());
}
