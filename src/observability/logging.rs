//! Structured logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter for `level`, covering the relay, the SDK and tower-http.
pub fn default_directives(level: &str) -> String {
    let level = level.to_lowercase();
    format!("http_relay={level},relay_sdk={level},tower_http={level}")
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
