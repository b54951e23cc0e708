//! Server configuration.
//!
//! # Data Flow
//! ```text
//! ServerConfig::default()
//!     → relay_config.json (optional, shared with the client)
//!     → RELAY_<KEY> environment overrides
//!     → loader.rs derives the typed ServerConfig
//!     → passed by value into RelayServer at startup
//! ```
//!
//! The config is read once at startup and never mutated afterwards.

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::ServerConfig;
