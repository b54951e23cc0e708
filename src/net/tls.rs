//! TLS detection and certificate loading.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::ServerConfig;

/// True when both the certificate and the private key exist on disk.
pub fn tls_files_present(config: &ServerConfig) -> bool {
    Path::new(&config.ssl_cert_path).is_file() && Path::new(&config.ssl_key_path).is_file()
}

/// Load a rustls config from PEM files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> io::Result<RustlsConfig> {
    for (kind, path) in [("Certificate", cert_path), ("Private key", key_path)] {
        if !path.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} file not found: {}", kind, path.display()),
            ));
        }
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}
