//! Query orchestrator.
//!
//! Every operation follows the same read-through path:
//!
//! 1. Canonicalize and validate parameters, derive the cache key
//! 2. Return the cached payload verbatim on a hit
//! 3. On a miss, fetch from the collaborator (extractor process, forecast API
//!    or screening engine)
//! 4. Write the payload back with the configured TTL and return it
//!
//! Cache failures never fail a request: a read error counts as a miss and a
//! write error is logged. Upstream failures are returned and never cached.
//! Concurrent misses on one key each fetch and each write; the later write
//! wins.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::CacheStore;
use crate::error::{StockError, StockResult};
use crate::key::{canonical_symbol, LogicalQuery, Operation};
use crate::screening::{
    graham::parse_page, screen, sort_and_filter_data, DatasetSource, ScreeningQuery,
    ValuationSortKey,
};
use crate::upstream::{HttpCollaborator, ProcessCollaborator};

/// Accepted top-stock categories.
pub const TOP_STOCK_CATEGORIES: [&str; 6] = [
    "most-active",
    "trending",
    "gainers",
    "losers",
    "52-week-gainers",
    "52-week-losers",
];

const DEFAULT_TOP_STOCK_CATEGORY: &str = "most-active";
const DEFAULT_HISTORICAL_RANGE: &str = "1d";

// ============================================================================
// Payload
// ============================================================================

/// Serialized JSON document, exactly as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPayload(Vec<u8>);

impl JsonPayload {
    pub fn from_value<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_vec(value).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.0)
    }
}

impl IntoResponse for JsonPayload {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/json")], self.0).into_response()
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Read-through cache in front of the stock data collaborators.
pub struct QueryOrchestrator {
    cache: Arc<dyn CacheStore>,
    process: Arc<dyn ProcessCollaborator>,
    http: Arc<dyn HttpCollaborator>,
    dataset: Arc<dyn DatasetSource>,
    ttl_secs: u64,
}

impl QueryOrchestrator {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        process: Arc<dyn ProcessCollaborator>,
        http: Arc<dyn HttpCollaborator>,
        dataset: Arc<dyn DatasetSource>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            cache,
            process,
            http,
            dataset,
            ttl_secs,
        }
    }

    /// Cache-or-fetch for one logical query.
    async fn cached<F, Fut>(&self, query: LogicalQuery, fetch: F) -> StockResult<JsonPayload>
    where
        F: FnOnce(Vec<String>) -> Fut + Send,
        Fut: Future<Output = StockResult<JsonPayload>> + Send,
    {
        let key = query.cache_key();
        let operation = query.operation;

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => {
                tracing::debug!(key = %key, %operation, "Cache hit");
                return Ok(JsonPayload(bytes));
            }
            Ok(None) => tracing::debug!(key = %key, %operation, "Cache miss"),
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    backend = self.cache.name(),
                    error = %e,
                    "Cache read failed, treating as miss"
                );
            }
        }

        let start = Instant::now();
        let payload = fetch(query.params).await.inspect_err(|e| {
            tracing::warn!(key = %key, %operation, error = %e, "Fetch failed, nothing cached");
        })?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if let Err(e) = self.cache.set(&key, payload.as_bytes(), self.ttl_secs).await {
            tracing::warn!(
                key = %key,
                backend = self.cache.name(),
                error = %e,
                "Cache write failed"
            );
        } else {
            tracing::debug!(key = %key, %operation, elapsed_ms, "Cached fresh payload");
        }

        Ok(payload)
    }

    /// Run the operation's extractor script with the canonical params.
    async fn from_process(&self, query: LogicalQuery) -> StockResult<JsonPayload> {
        let script = query.operation.script().ok_or_else(|| {
            StockError::Upstream(format!("{} has no extractor script", query.operation))
        })?;

        self.cached(query, |args| async move {
            let value = self.process.run(script, &args).await?;
            JsonPayload::from_value(&value).map_err(|e| StockError::Upstream(e.to_string()))
        })
        .await
    }

    async fn symbol_operation(
        &self,
        operation: Operation,
        symbol: &str,
    ) -> StockResult<JsonPayload> {
        let symbol = require_symbol(symbol)?;
        self.from_process(LogicalQuery::new(operation, vec![symbol])).await
    }

    // ========================================================================
    // Extractor-backed operations
    // ========================================================================

    pub async fn stock_data(&self, symbol: &str) -> StockResult<JsonPayload> {
        self.symbol_operation(Operation::StockData, symbol).await
    }

    pub async fn stock_profile(&self, symbol: &str) -> StockResult<JsonPayload> {
        self.symbol_operation(Operation::StockProfile, symbol).await
    }

    /// Top movers in a category; an unknown category is rejected before the
    /// cache is consulted.
    pub async fn top_stocks(&self, category: Option<&str>) -> StockResult<JsonPayload> {
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_TOP_STOCK_CATEGORY);

        if !TOP_STOCK_CATEGORIES.contains(&category) {
            return Err(StockError::validation("Invalid category parameter"));
        }

        self.from_process(LogicalQuery::new(Operation::TopStocks, vec![category.to_string()]))
            .await
    }

    pub async fn analysis(&self, symbol: &str) -> StockResult<JsonPayload> {
        self.symbol_operation(Operation::Analysis, symbol).await
    }

    pub async fn historical_data(
        &self,
        symbol: &str,
        range: Option<&str>,
    ) -> StockResult<JsonPayload> {
        let symbol = require_symbol(symbol)?;
        let range = range
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_HISTORICAL_RANGE);

        self.from_process(LogicalQuery::new(
            Operation::HistoricalData,
            vec![symbol, range.to_string()],
        ))
        .await
    }

    pub async fn eps(&self, symbol: &str) -> StockResult<JsonPayload> {
        self.symbol_operation(Operation::Eps, symbol).await
    }

    pub async fn pe_ratio(&self, symbol: &str) -> StockResult<JsonPayload> {
        self.symbol_operation(Operation::PeRatio, symbol).await
    }

    pub async fn aaa_corporate_bond_yield(&self) -> StockResult<JsonPayload> {
        self.from_process(LogicalQuery::new(Operation::AaaCorporateBondYield, Vec::new()))
            .await
    }

    pub async fn search(&self, query: &str) -> StockResult<JsonPayload> {
        let query = canonical_symbol(query);
        if query.is_empty() {
            return Err(StockError::validation("Search query is required"));
        }
        self.from_process(LogicalQuery::new(Operation::Search, vec![query]))
            .await
    }

    pub async fn dcf_value(&self, symbol: &str) -> StockResult<JsonPayload> {
        self.symbol_operation(Operation::DcfValue, symbol).await
    }

    pub async fn ddm_value(&self, symbol: &str) -> StockResult<JsonPayload> {
        self.symbol_operation(Operation::DdmValue, symbol).await
    }

    pub async fn graham_value(&self, symbol: &str) -> StockResult<JsonPayload> {
        self.symbol_operation(Operation::GrahamValue, symbol).await
    }

    // ========================================================================
    // HTTP-backed operations
    // ========================================================================

    pub async fn forecast(&self, symbol: &str) -> StockResult<JsonPayload> {
        let symbol = require_symbol(symbol)?;
        let query = LogicalQuery::new(Operation::Forecast, vec![symbol]);

        self.cached(query, |params| async move {
            let symbol = params.first().map(String::as_str).unwrap_or_default();
            let value = self.http.get_json(symbol).await?;
            JsonPayload::from_value(&value).map_err(|e| StockError::Upstream(e.to_string()))
        })
        .await
    }

    // ========================================================================
    // Screening operations
    // ========================================================================

    /// Graham criteria list. The filter is validated before any cache or
    /// snapshot access.
    pub async fn graham_list(
        &self,
        sort_by: Option<&str>,
        filter_by: Option<&str>,
        page: Option<&str>,
    ) -> StockResult<JsonPayload> {
        let screening = ScreeningQuery::from_params(sort_by, filter_by, page)?;
        let query = LogicalQuery::new(Operation::GrahamList, screening.key_params());

        self.cached(query, |_| async move {
            let rows = self.dataset.load_graham().await?;
            let page = screen(rows, &screening);
            JsonPayload::from_value(&page).map_err(|e| StockError::dataset(e.to_string()))
        })
        .await
    }

    /// Intrinsic-value ranking. Unknown sort keys return the unranked
    /// snapshot.
    pub async fn intrinsic_value_list(
        &self,
        sort_by: Option<&str>,
        page: Option<&str>,
    ) -> StockResult<JsonPayload> {
        let sort_key = sort_by.and_then(ValuationSortKey::parse);
        // Unranked output ignores the page.
        let page = match sort_key {
            Some(_) => parse_page(page),
            None => 1,
        };
        let params = vec![
            sort_key.map(|k| k.as_str().to_string()).unwrap_or_default(),
            page.to_string(),
        ];
        let query = LogicalQuery::new(Operation::IntrinsicValueList, params);

        self.cached(query, |_| async move {
            let rows = self.dataset.load_valuation().await?;
            let page = sort_and_filter_data(rows, sort_key, page);
            JsonPayload::from_value(&page).map_err(|e| StockError::dataset(e.to_string()))
        })
        .await
    }
}

/// Canonical symbol, rejecting blanks.
fn require_symbol(raw: &str) -> StockResult<String> {
    let symbol = canonical_symbol(raw);
    if symbol.is_empty() {
        return Err(StockError::validation("Stock symbol is required"));
    }
    Ok(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MemoryCacheStore};
    use crate::screening::{ScreeningRow, ValuationRow};
    use crate::upstream::UpstreamError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProcess {
        calls: AtomicU32,
        last: Mutex<Option<(String, Vec<String>)>>,
        fail: bool,
    }

    #[async_trait]
    impl ProcessCollaborator for RecordingProcess {
        async fn run(&self, script: &str, args: &[String]) -> Result<Value, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((script.to_string(), args.to_vec()));
            if self.fail {
                return Err(UpstreamError::Exit { code: Some(1) });
            }
            Ok(json!({ "script": script, "args": args }))
        }
    }

    #[derive(Default)]
    struct StaticHttp {
        calls: AtomicU32,
    }

    #[async_trait]
    impl HttpCollaborator for StaticHttp {
        async fn get_json(&self, symbol: &str) -> Result<Value, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "symbol": symbol }))
        }
    }

    #[derive(Default)]
    struct CountingDataset {
        loads: AtomicU32,
    }

    #[async_trait]
    impl DatasetSource for CountingDataset {
        async fn load_graham(&self) -> StockResult<Vec<ScreeningRow>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn load_valuation(&self) -> StockResult<Vec<ValuationRow>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    /// Store whose every command fails.
    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn set(&self, _key: &str, _value: &[u8], _ttl: u64) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Ok(())
        }
        async fn clear(&self) -> Result<(), CacheError> {
            Ok(())
        }
    }

    struct Harness {
        cache: Arc<MemoryCacheStore>,
        process: Arc<RecordingProcess>,
        http: Arc<StaticHttp>,
        dataset: Arc<CountingDataset>,
        orchestrator: QueryOrchestrator,
    }

    fn harness_with(process: RecordingProcess) -> Harness {
        let cache = Arc::new(MemoryCacheStore::new());
        let process = Arc::new(process);
        let http = Arc::new(StaticHttp::default());
        let dataset = Arc::new(CountingDataset::default());
        let orchestrator = QueryOrchestrator::new(
            cache.clone(),
            process.clone(),
            http.clone(),
            dataset.clone(),
            3600,
        );
        Harness {
            cache,
            process,
            http,
            dataset,
            orchestrator,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingProcess::default())
    }

    #[tokio::test]
    async fn test_hit_skips_collaborator() {
        let h = harness();
        h.cache
            .set("stockData:AAPL", br#"{"cached":true}"#, 60)
            .await
            .unwrap();

        let payload = h.orchestrator.stock_data("aapl").await.unwrap();
        assert_eq!(payload.as_bytes(), br#"{"cached":true}"#);
        assert_eq!(h.process.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_miss_populates_cache() {
        let h = harness();

        let payload = h.orchestrator.stock_data("MSFT").await.unwrap();
        let stored = h.cache.get("stockData:MSFT").await.unwrap().unwrap();
        assert_eq!(payload.as_bytes(), stored.as_slice());

        let (script, args) = h.process.last.lock().unwrap().clone().unwrap();
        assert_eq!(script, "getStockData.py");
        assert_eq!(args, vec!["MSFT"]);

        h.orchestrator.stock_data("msft").await.unwrap();
        assert_eq!(h.process.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let h = harness_with(RecordingProcess {
            fail: true,
            ..Default::default()
        });

        let err = h.orchestrator.eps("AAPL").await.unwrap_err();
        assert!(matches!(err, StockError::Upstream(_)));
        assert!(h.cache.get("epsData:AAPL").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_errors_fail_open() {
        let process = Arc::new(RecordingProcess::default());
        let orchestrator = QueryOrchestrator::new(
            Arc::new(BrokenCache),
            process.clone(),
            Arc::new(StaticHttp::default()),
            Arc::new(CountingDataset::default()),
            3600,
        );

        let payload = orchestrator.pe_ratio("AAPL").await.unwrap();
        assert_eq!(payload.to_value().unwrap()["script"], "getPeRatioData.py");
        assert_eq!(process.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_top_stocks_category() {
        let h = harness();

        h.orchestrator.top_stocks(None).await.unwrap();
        assert!(h.cache.get("topStocks:most-active").await.unwrap().is_some());

        let err = h.orchestrator.top_stocks(Some("penny")).await.unwrap_err();
        assert!(matches!(err, StockError::Validation(ref m) if m == "Invalid category parameter"));
        assert_eq!(h.process.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_historical_default_range() {
        let h = harness();

        h.orchestrator.historical_data("aapl", None).await.unwrap();
        let (_, args) = h.process.last.lock().unwrap().clone().unwrap();
        assert_eq!(args, vec!["AAPL", "1d"]);
        assert!(h.cache.get("historicalData:AAPL:1d").await.unwrap().is_some());

        h.orchestrator.historical_data("AAPL", Some("1d")).await.unwrap();
        assert_eq!(h.process.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_aaa_yield_has_no_args() {
        let h = harness();
        h.orchestrator.aaa_corporate_bond_yield().await.unwrap();

        let (script, args) = h.process.last.lock().unwrap().clone().unwrap();
        assert_eq!(script, "getAaaCorporateBondYield.py");
        assert!(args.is_empty());
        assert!(h.cache.get("AaaCorporateBondYield").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_blank_symbol_rejected() {
        let h = harness();
        assert!(matches!(
            h.orchestrator.dcf_value("  ").await,
            Err(StockError::Validation(_))
        ));
        assert!(matches!(
            h.orchestrator.search("").await,
            Err(StockError::Validation(_))
        ));
        assert_eq!(h.process.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_forecast_cached() {
        let h = harness();

        h.orchestrator.forecast("tsla").await.unwrap();
        h.orchestrator.forecast("TSLA").await.unwrap();

        assert_eq!(h.http.calls.load(Ordering::SeqCst), 1);
        assert!(h.cache.get("forecastData:TSLA").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_filter_skips_dataset() {
        let h = harness();

        let err = h
            .orchestrator
            .graham_list(Some("Defensive"), Some("10"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::Validation(_)));
        assert_eq!(h.dataset.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_graham_page_cached() {
        let h = harness();

        h.orchestrator.graham_list(None, None, Some("0")).await.unwrap();
        h.orchestrator.graham_list(Some("Overall"), Some(""), Some("1")).await.unwrap();

        assert_eq!(h.dataset.loads.load(Ordering::SeqCst), 1);
        assert!(h
            .cache
            .get("benjaminGrahamList:Overall::1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_intrinsic_list_key() {
        let h = harness();

        h.orchestrator.intrinsic_value_list(Some("beta"), Some("2")).await.unwrap();
        assert!(h.cache.get("intrinsicValueList:beta:2").await.unwrap().is_some());

        h.orchestrator.intrinsic_value_list(Some("nope"), Some("5")).await.unwrap();
        assert!(h.cache.get("intrinsicValueList::1").await.unwrap().is_some());
    }
}
