//! Shared fixtures for router integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use laba_stocks::cache::{CacheStore, MemoryCacheStore};
use laba_stocks::screening::{CsvDataset, DatasetSource, ScreeningRow, ValuationRow};
use laba_stocks::upstream::{HttpCollaborator, ProcessCollaborator, UpstreamError};
use laba_stocks::{build_router, AppState, QueryOrchestrator, StockResult};

// ============================================================================
// Mock Collaborators
// ============================================================================

/// Extractor stand-in that echoes the script and arguments it was given.
#[derive(Default)]
pub struct MockProcess {
    pub calls: AtomicU32,
    pub failing: AtomicBool,
    pub invocations: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockProcess {
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_invocation(&self) -> Option<(String, Vec<String>)> {
        self.invocations.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ProcessCollaborator for MockProcess {
    async fn run(&self, script: &str, args: &[String]) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.invocations
            .lock()
            .unwrap()
            .push((script.to_string(), args.to_vec()));

        if self.failing.load(Ordering::SeqCst) {
            return Err(UpstreamError::Stderr("No data found, symbol may be delisted".into()));
        }
        Ok(json!({ "script": script, "args": args, "price": 150.25 }))
    }
}

/// Forecast stand-in; flip `down` to simulate an outage.
#[derive(Default)]
pub struct MockHttp {
    pub calls: AtomicU32,
    pub down: AtomicBool,
}

#[async_trait]
impl HttpCollaborator for MockHttp {
    async fn get_json(&self, symbol: &str) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status { status: 503 });
        }
        Ok(json!({ "symbol": symbol, "targetHigh": 250.0 }))
    }
}

/// CSV dataset wrapper that counts snapshot loads.
pub struct CountingDataset {
    inner: CsvDataset,
    pub loads: AtomicU32,
}

impl CountingDataset {
    pub fn new(inner: CsvDataset) -> Self {
        Self {
            inner,
            loads: AtomicU32::new(0),
        }
    }

    pub fn load_count(&self) -> u32 {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetSource for CountingDataset {
    async fn load_graham(&self) -> StockResult<Vec<ScreeningRow>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_graham().await
    }

    async fn load_valuation(&self) -> StockResult<Vec<ValuationRow>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_valuation().await
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub const GRAHAM_HEADER: &str =
    "Stock Symbol,Company Name,Defensive Value,Defensive,Enterprising Value,Enterprising,Overall Value";

pub const VALUATION_CSV: &str = "\
Stock Symbol,Company Name,Opening Price,Beta,DCF Value,Percent DCF,Percent Abs DCF,Percent DDM,Percent Abs DDM,Percent Benjamin Graham,Percent Abs Benjamin Graham,Percent Average,Percent Abs Average,Intrinsic Value Standard Deviation
AAPL,Apple Inc.,145.3,1.2,130.0,5.5,6.3,3.2,2.1,5.7,3.2,3.1,8.4,5.0
GOOG,Google LLC,2721.0,0.8,2600.0,3.0,6.4,4.2,8.0,8.1,1.5,5.8,2.0,4.0
AMZN,Amazon.com Inc.,3450.5,1.1,3000.0,8.3,9.1,2.5,4.3,2.4,6.3,9.7,7.9,6.0
TSLA,Tesla,950,n/a,,,,,,,,,,
";

/// Graham CSV with the given `(symbol, defensive bits, defensive value,
/// overall value)` rows.
pub fn graham_csv(rows: &[(&str, &str, i64, i64)]) -> String {
    let mut out = format!("{GRAHAM_HEADER}\n");
    for (symbol, bits, def_value, overall) in rows {
        out.push_str(&format!(
            "{symbol},{symbol} Corp,{def_value},{bits},0,0000000,{overall}\n"
        ));
    }
    out
}

pub fn temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Router plus handles on every collaborator.
pub struct TestApp {
    pub router: Router,
    pub cache: Arc<MemoryCacheStore>,
    pub process: Arc<MockProcess>,
    pub http: Arc<MockHttp>,
    pub dataset: Arc<CountingDataset>,
    _files: Vec<tempfile::NamedTempFile>,
}

impl TestApp {
    pub fn new(graham: &str, valuation: &str) -> Self {
        Self::with_http(graham, valuation, None)
    }

    /// Build with an optional real forecast client in place of the mock.
    pub fn with_http(
        graham: &str,
        valuation: &str,
        http_override: Option<Arc<dyn HttpCollaborator>>,
    ) -> Self {
        let graham_file = temp_file(graham);
        let valuation_file = temp_file(valuation);

        let cache = Arc::new(MemoryCacheStore::new());
        let process = Arc::new(MockProcess::default());
        let http = Arc::new(MockHttp::default());
        let dataset = Arc::new(CountingDataset::new(CsvDataset::new(
            graham_file.path(),
            valuation_file.path(),
        )));

        let http_dyn: Arc<dyn HttpCollaborator> = match http_override {
            Some(h) => h,
            None => http.clone(),
        };
        let cache_dyn: Arc<dyn CacheStore> = cache.clone();

        let orchestrator = Arc::new(QueryOrchestrator::new(
            cache_dyn,
            process.clone(),
            http_dyn,
            dataset.clone(),
            3600,
        ));

        Self {
            router: build_router(AppState::new(orchestrator)),
            cache,
            process,
            http,
            dataset,
            _files: vec![graham_file, valuation_file],
        }
    }

    pub fn empty() -> Self {
        Self::new(&graham_csv(&[]), VALUATION_CSV)
    }

    /// GET `uri` and decode the JSON body.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}
