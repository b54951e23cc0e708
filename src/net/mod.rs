//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig.ssl_cert_path / ssl_key_path
//!     → tls.rs (both files present?)
//!         yes → RustlsConfig → RelayServer::run_tls
//!         no  → plain TcpListener → RelayServer::run
//! ```

pub mod tls;

pub use tls::{load_tls_config, tls_files_present};
