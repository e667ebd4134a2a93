//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Build circles and start backend flushers
//! - Bind the listener and serve until a signal arrives
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener starts last (traffic only when circles are ready)

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{load_config, ConfigError, ProxyConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};
use crate::proxy::Proxy;

/// Grace period for flushers to drain after the listener closes.
const FLUSH_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("backend client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Load `path` and run the proxy until SIGINT/SIGTERM.
pub async fn run(path: &Path) -> Result<(), StartupError> {
    let config = load_config(path)?;
    logging::init_tracing(&config.observability.log_level);
    tracing::info!(config = %path.display(), "circle-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    serve(config).await
}

/// Run the proxy with an already validated configuration.
pub async fn serve(config: ProxyConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        circles = config.circles.len(),
        db_list = ?config.db_list,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    // Flushers get their own signal so they outlive every in-flight write.
    let server_shutdown = Shutdown::new();
    let flush_shutdown = Shutdown::new();
    let proxy = Arc::new(Proxy::from_config(&config, flush_shutdown.sender())?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, proxy);
    let server_task = tokio::spawn(server.run(listener, server_shutdown.subscribe()));

    signals::wait_for_signal(&server_shutdown).await;

    match server_task.await {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
    }

    // Flushers drop their receivers once their final batch is out.
    let pending = flush_shutdown.drain(FLUSH_GRACE).await;
    if pending > 0 {
        tracing::warn!(pending, "Flushers still running at exit");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
