//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and lookups produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (forward counters and latency histogram)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (when metrics_enabled)
//! ```

pub mod logging;
pub mod metrics;
