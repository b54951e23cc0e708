use std::error::Error as StdError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, deriving or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("config file must contain a JSON object")]
    NotAnObject,

    #[error("invalid configuration value: {0}")]
    Invalid(#[source] serde_json::Error),
}

/// Errors raised while constructing or reconfiguring a [`RelayClient`](crate::RelayClient).
///
/// Transport failures during a call are never reported here; they end up in
/// [`RelayResult::Failed`](crate::RelayResult::Failed).
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Render `error` and every source below it, joined with `": "`.
///
/// `reqwest` keeps the useful part (refused, DNS, timeout) in the source chain.
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
