//! Laba Stocks Library
//!
//! Cache-backed stock data aggregation API. Each endpoint maps to one logical
//! query that is answered from the cache when possible and otherwise fetched
//! from an extractor script, the forecast API or a CSV snapshot.
//!
//! # Architecture
//!
//! ```text
//! HTTP routes ──► QueryOrchestrator ──► CacheStore (memory | redis)
//!                        │
//!                        ├──► ExtractorProcess   (python scripts)
//!                        ├──► ForecastClient     (forecast API)
//!                        └──► Screening engine   (CSV snapshots)
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod cache;
pub mod error;
pub mod key;
pub mod orchestrator;
pub mod routes;
pub mod screening;
pub mod upstream;

pub use error::{StockError, StockResult};
pub use orchestrator::{JsonPayload, QueryOrchestrator};
pub use routes::{build_router, AppState};

use anyhow::{Context, Result};
use axum::Router;
use laba_common::config::Config;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::screening::CsvDataset;
use crate::upstream::{ExtractorProcess, ForecastClient};

/// Extra time the HTTP layer allows beyond the upstream timeout.
const REQUEST_TIMEOUT_SLACK_SECS: u64 = 5;

/// Main stock data service
pub struct StockService {
    config: Config,
    orchestrator: Arc<QueryOrchestrator>,
}

impl StockService {
    /// Wire the cache store and collaborators from configuration.
    pub async fn new(config: Config) -> Result<Self> {
        let cache = cache::create_store(&config.cache)
            .await
            .context("Failed to initialize cache store")?;
        let process = Arc::new(ExtractorProcess::from_config(&config.upstream));
        let http = Arc::new(
            ForecastClient::new(&config.upstream).context("Failed to build forecast client")?,
        );
        let dataset = Arc::new(CsvDataset::from_config(&config.datasets));

        tracing::info!(
            cache = cache.name(),
            scripts_dir = %config.upstream.scripts_dir.display(),
            ttl_secs = config.cache.ttl_secs,
            "Stock service wired"
        );

        let orchestrator = Arc::new(QueryOrchestrator::new(
            cache,
            process,
            http,
            dataset,
            config.cache.ttl_secs,
        ));

        Ok(Self {
            config,
            orchestrator,
        })
    }

    /// Router with tracing, CORS and request timeout layers.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let timeout =
            Duration::from_secs(self.config.upstream.timeout_secs + REQUEST_TIMEOUT_SLACK_SECS);

        build_router(AppState::new(self.orchestrator.clone()))
            .layer(TimeoutLayer::new(timeout))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .bind_address()
            .parse()
            .with_context(|| format!("Invalid bind address {}", self.config.bind_address()))?;

        let app = self.router();

        tracing::info!(address = %addr, "Starting HTTP server");
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
