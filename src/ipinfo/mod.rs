//! Outbound IP and geolocation reporting.
//!
//! # Data Flow
//! ```text
//! GET /api/ip-info
//!     → local interface address (UDP route probe, no packets sent)
//!     → ip_echo_url       → public IP (plain text)
//!     → geo_lookup_url    → city / region / country / org (JSON)
//!     → IpInfo
//! ```
//!
//! Each lookup failure degrades only the fields it feeds to
//! [`UNAVAILABLE`]; the response itself always succeeds.

pub mod lookup;

pub use lookup::{IpInfo, IpInfoService, UNAVAILABLE};
