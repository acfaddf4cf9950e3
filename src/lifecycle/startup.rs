//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the route table from validated configuration
//! - Start background exporters (metrics)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::{RegistryError, RouteTable};

/// Errors that abort process start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("route registration failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Build every subsystem and serve until shutdown.
pub async fn start(config: AppConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let routes = RouteTable::in_memory(config.api.prefix.clone())?;
    for endpoint in routes.endpoints() {
        tracing::debug!(
            method = %endpoint.method,
            path = %endpoint.path,
            name = %endpoint.name,
            "Endpoint registered"
        );
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    let server = HttpServer::new(config, routes);
    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}
