//! Layered key/value configuration.
//!
//! # Data Flow
//! ```text
//! typed defaults (serialized)
//!     → JSON file (keys overwrite or extend)
//!     → PREFIX_<UPPER_KEY> environment overrides (type-coerced)
//!     → Settings::parse::<T>() typed view
//! ```
//!
//! A missing or unreadable file never fails a load; it is logged and the
//! values gathered so far are kept.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Prefix for environment overrides (`RELAY_TIMEOUT`, `RELAY_SERVER_URL`, ...).
pub const ENV_PREFIX: &str = "RELAY";

/// Config file shared by the relay server and its clients.
pub const DEFAULT_CONFIG_FILE: &str = "relay_config.json";

/// Ordered string → scalar map with file and environment layering.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    values: Map<String, Value>,
    prefix: String,
}

impl Settings {
    /// Seed the map from a typed defaults struct.
    pub fn from_defaults<T: Serialize>(defaults: &T, prefix: &str) -> Result<Self, ConfigError> {
        match serde_json::to_value(defaults).map_err(ConfigError::Invalid)? {
            Value::Object(values) => Ok(Self {
                values,
                prefix: prefix.to_string(),
            }),
            _ => Err(ConfigError::NotAnObject),
        }
    }

    /// Build settings from defaults, an optional JSON file and the process environment.
    pub fn load<T: Serialize>(
        defaults: &T,
        path: Option<&Path>,
        prefix: &str,
    ) -> Result<Self, ConfigError> {
        let mut settings = Self::from_defaults(defaults, prefix)?;
        if let Some(path) = path {
            settings.merge_file(path);
        }
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Overlay the contents of a JSON file.
    ///
    /// Returns `true` when the file was read and merged.
    pub fn merge_file(&mut self, path: &Path) -> bool {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            return false;
        }

        match read_object(path) {
            Ok(file_values) => {
                self.values.extend(file_values);
                tracing::info!(path = %path.display(), "Loaded config file");
                true
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to load config file");
                false
            }
        }
    }

    /// Apply `PREFIX_<UPPER_KEY>` overrides using `lookup` as the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (key, value) in self.values.iter_mut() {
            let env_key = env_key(&self.prefix, key);
            if let Some(raw) = lookup(&env_key) {
                *value = coerce_override(value, &raw);
                tracing::info!(key = %key, value = %value, env = %env_key, "Environment override applied");
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Merge `changes` into the map; the last write wins.
    pub fn update(&mut self, changes: Map<String, Value>) {
        self.values.extend(changes);
    }

    /// Write the current map as pretty JSON, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self.values).map_err(ConfigError::Invalid)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Derive a typed view. Keys the target type does not know are ignored.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(Value::Object(self.values.clone())).map_err(ConfigError::Invalid)
    }
}

fn read_object(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match serde_json::from_str(&content).map_err(ConfigError::Parse)? {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::NotAnObject),
    }
}

/// `("RELAY", "retry_count")` → `"RELAY_RETRY_COUNT"`.
pub fn env_key(prefix: &str, key: &str) -> String {
    format!("{}_{}", prefix, key.to_uppercase())
}

/// Coerce a raw environment string according to the type of `current`.
///
/// Booleans are true only for a case-insensitive `"true"`. Integers keep
/// `current` when `raw` is not a valid integer. Every other type, floats
/// included, takes the raw string.
pub fn coerce_override(current: &Value, raw: &str) -> Value {
    match current {
        Value::Bool(_) => Value::Bool(raw.to_lowercase() == "true"),
        Value::Number(n) if n.is_i64() || n.is_u64() => match raw.trim().parse::<i64>() {
            Ok(parsed) => Value::from(parsed),
            Err(_) => current.clone(),
        },
        _ => Value::String(raw.to_string()),
    }
}

/// Client-side settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the relay server.
    pub server_url: String,

    /// Per-attempt timeout in seconds.
    pub timeout: u64,

    /// Maximum attempts per call.
    pub retry_count: u32,

    /// Delay between attempts in seconds.
    pub retry_delay: u64,

    /// Verify the relay server's TLS certificate.
    pub verify_ssl: bool,

    /// Key passed to the weather preset's upstream API.
    pub weather_api_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            timeout: 30,
            retry_count: 3,
            retry_delay: 2,
            verify_ssl: false,
            weather_api_key: String::new(),
        }
    }
}
