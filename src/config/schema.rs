//! Configuration schema for the relay server.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay server.
///
/// Every field has a default so a partial (or absent) file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub server_port: u16,

    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// Verbose logging, including forwarded headers and bodies.
    pub debug_mode: bool,

    /// Path to certificate file (PEM). HTTPS is used when both files exist.
    pub ssl_cert_path: String,

    /// Path to private key file (PEM).
    pub ssl_key_path: String,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR).
    pub log_level: String,

    /// Outbound forward timeout in seconds.
    pub timeout: u64,

    /// Maximum inbound body size for forwards, in bytes.
    pub max_body_size: usize,

    /// Service returning the caller's public IP as plain text.
    pub ip_echo_url: String,

    /// Geolocation lookup; `{ip}` is replaced with the public IP.
    pub geo_lookup_url: String,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Scrape endpoint bind address.
    pub metrics_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_port: 5000,
            bind_host: "0.0.0.0".to_string(),
            debug_mode: false,
            ssl_cert_path: "ssl/cert.pem".to_string(),
            ssl_key_path: "ssl/key.pem".to_string(),
            log_level: "INFO".to_string(),
            timeout: 30,
            max_body_size: 64 * 1024 * 1024, // 64MB
            ip_echo_url: "https://api.ipify.org".to_string(),
            geo_lookup_url: "https://ipapi.co/{ip}/json/".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

impl ServerConfig {
    /// `bind_host:server_port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.server_port)
    }

    /// Level filter for this crate's log output.
    pub fn effective_log_level(&self) -> String {
        if self.debug_mode {
            "debug".to_string()
        } else {
            self.log_level.to_lowercase()
        }
    }
}
