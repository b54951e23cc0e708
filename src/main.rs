//! HTTP relay server.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 HTTP RELAY                    │
//!     Client Request     │  ┌──────────┐    ┌───────────┐               │
//!     ───────────────────┼─▶│  axum    │───▶│  forward  │───────────────┼──▶ Target URL
//!                        │  │  router  │    │  handler  │  (reqwest)    │
//!     Client Response    │  └──────────┘    └───────────┘               │
//!     ◀──────────────────┼── status / headers / body relayed verbatim ◀─┼─── Target
//!                        │                                              │
//!                        │  GET /api/ip-info ──▶ ip echo + geolocation  │
//!                        │                                              │
//!                        │  config (JSON + RELAY_* env), tracing,       │
//!                        │  metrics, graceful shutdown                  │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use http_relay::config::load_config;
use http_relay::lifecycle::{signals, startup};
use http_relay::observability::logging;
use http_relay::Shutdown;
use relay_sdk::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "http-relay")]
#[command(about = "Relay HTTP requests to caller-chosen targets", long_about = None)]
struct Args {
    /// JSON config file; missing files fall back to defaults.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config decides the log level, so its own messages go through a temporary subscriber.
    let config = tracing::subscriber::with_default(tracing_subscriber::fmt().finish(), || {
        load_config(&args.config)
    })?;

    logging::init_logging(&config.effective_log_level());
    tracing::info!("http-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    startup::start(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
