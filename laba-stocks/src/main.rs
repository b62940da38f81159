//! Laba Stocks - cache-backed stock data API.

use anyhow::Result;
use laba_common::config::Config;
use laba_common::logging::init_logging;
use laba_stocks::StockService;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    // Load and validate configuration
    let config = Config::load_and_validate()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("Laba Stocks v{}", env!("CARGO_PKG_VERSION"));

    let service = StockService::new(config).await?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
