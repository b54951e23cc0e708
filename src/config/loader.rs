//! Configuration loading from disk and environment.

use std::path::Path;

use relay_sdk::{ConfigError, Settings, ENV_PREFIX};

use crate::config::schema::ServerConfig;

/// Load the server config: defaults → JSON file → `RELAY_*` environment.
///
/// A missing or malformed file is logged and ignored. Only a value of the
/// wrong type (e.g. `"server_port": "http"`) is an error.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit environment, for tests.
pub fn load_config_with_env<F>(path: &Path, lookup: F) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::from_defaults(&ServerConfig::default(), ENV_PREFIX)?;
    settings.merge_file(path);
    settings.apply_env(lookup);
    settings.parse()
}
