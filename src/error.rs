use thiserror::Error;

/// Errors that stop the relay from starting or serving.
///
/// Per-request failures never surface here; handlers render them as JSON.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] relay_sdk::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("Metrics exporter error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}
