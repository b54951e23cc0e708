//! HTTP relay library.
//!
//! Serves `GET /`, `GET /api/ip-info` and `ANY /api/forward`, relaying the
//! latter to a caller-chosen target URL.

pub mod config;
pub mod error;
pub mod http;
pub mod ipinfo;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServerConfig;
pub use error::ServerError;
pub use http::RelayServer;
pub use lifecycle::Shutdown;
