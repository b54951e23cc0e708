//! Client SDK for the HTTP relay.
//!
//! Wraps the relay's routes with per-attempt timeouts, bounded retries on
//! transport failure and a JSON-file configuration provider that the relay
//! server shares.

pub mod client;
pub mod config;
pub mod error;
pub mod retry;

pub use client::{ForwardData, ForwardOptions, RelayClient, RelayResult, RequestOptions, ResponseBody};
pub use config::{ClientConfig, Settings, DEFAULT_CONFIG_FILE, ENV_PREFIX};
pub use error::{error_chain, ClientError, ConfigError};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
