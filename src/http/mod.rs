//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, trace spans)
//!     → GET /              service metadata
//!     → GET /api/ip-info   ipinfo lookups
//!     → ANY /api/forward   forward.rs
//!           → headers.rs (filter inbound headers)
//!           → Forwarder (single outbound call)
//!           → headers.rs (filter target response headers)
//!     → Send to client
//! ```

pub mod forward;
pub mod headers;
pub mod server;

pub use forward::{ForwardRequest, ForwardResult, Forwarder, RelayedResponse, RequestBody, ResponseData};
pub use server::{AppState, RelayServer};
