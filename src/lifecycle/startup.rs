//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when configured
//! - Connect to the database
//! - Assemble the server and bind the listener
//! - Serve until stopped, reporting how the run ended
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing is retried
//! - The listener binds last, so traffic only arrives once everything is ready

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::db::{self, StoreError};
use crate::http::HttpServer;
use crate::lifecycle::supervisor::{RunOutcome, Supervisor};
use crate::observability::init_metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("database connection failed: {0}")]
    Database(#[from] StoreError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),
}

/// Bring the API up and serve until it stops.
pub async fn run(config: AppConfig) -> Result<RunOutcome, StartupError> {
    if let Some(address) = &config.observability.metrics_address {
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(address.clone()))?;
        init_metrics(addr)?;
    }

    let store = db::connect(&config.database).await?;

    let bind_address = config.server.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            addr: bind_address.clone(),
            source,
        })?;

    let server = HttpServer::new(config, store);
    let (supervisor, reports) = Supervisor::new();
    server
        .run(listener, supervisor, reports)
        .await
        .map_err(StartupError::Server)
}
