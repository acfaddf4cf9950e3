//! OctoFit Tracker API server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ trace ─▶ timeout ─▶ metrics ─┐
//!                                                                │
//!              ┌─────────────────────────────────────────────────┘
//!              ▼
//!       ┌─────────────┐  "/" or "/api/"   ┌──────────────────┐
//!       │ axum Router │──────────────────▶│  root discovery  │──▶ {name: url}
//!       └──────┬──────┘                   └──────────────────┘
//!              │ fallback
//!              ▼
//!       ┌─────────────┐   (registration,  ┌──────────────────┐
//!       │ RouteTable  │────action, id)───▶│  ViewSet (CRUD)  │──▶ JSON
//!       │  resolve()  │                   └──────────────────┘
//!       └─────────────┘
//!              │ no match → 404 / 405 / 301 (append slash)
//! ```

use clap::Parser;
use std::path::PathBuf;

use octofit_api::config::resolve_config;
use octofit_api::lifecycle::{self, Shutdown};
use octofit_api::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "octofit-api")]
#[command(about = "OctoFit Tracker REST API server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address (e.g. 127.0.0.1:8000).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = resolve_config(args.config.as_deref(), args.bind)?;

    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        api_prefix = %config.api.prefix,
        request_timeout_secs = config.timeouts.request_secs,
        "octofit-api starting"
    );

    let shutdown = Shutdown::new();
    lifecycle::start(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
