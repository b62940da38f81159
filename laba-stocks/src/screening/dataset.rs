//! CSV snapshot loading.
//!
//! Snapshots are re-read on every uncached request: the file is read
//! asynchronously and parsed on a blocking worker.

use async_trait::async_trait;
use laba_common::config::DatasetsConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::graham::ScreeningRow;
use super::valuation::ValuationRow;
use crate::error::{StockError, StockResult};

const GRAHAM_LOAD_FAILED: &str = "Failed to process CSV data";
const VALUATION_LOAD_FAILED: &str = "Failed to load intrinsic value data";

/// Source of screening snapshots.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn load_graham(&self) -> StockResult<Vec<ScreeningRow>>;

    async fn load_valuation(&self) -> StockResult<Vec<ValuationRow>>;
}

/// Snapshots stored as CSV files on disk.
#[derive(Debug, Clone)]
pub struct CsvDataset {
    graham_csv: PathBuf,
    valuation_csv: PathBuf,
}

impl CsvDataset {
    pub fn new(graham_csv: impl Into<PathBuf>, valuation_csv: impl Into<PathBuf>) -> Self {
        Self {
            graham_csv: graham_csv.into(),
            valuation_csv: valuation_csv.into(),
        }
    }

    pub fn from_config(config: &DatasetsConfig) -> Self {
        Self::new(config.graham_csv.clone(), config.valuation_csv.clone())
    }

    async fn load<T, F>(path: &Path, parse: F, public_msg: &'static str) -> StockResult<Vec<T>>
    where
        T: Send + 'static,
        F: FnOnce(&[u8]) -> Result<Vec<T>, String> + Send + 'static,
    {
        let fail = |detail: String| {
            tracing::error!(path = %path.display(), error = %detail, "Snapshot load failed");
            StockError::dataset(public_msg)
        };

        let bytes = tokio::fs::read(path).await.map_err(|e| fail(e.to_string()))?;

        let rows = tokio::task::spawn_blocking(move || parse(bytes.as_slice()))
            .await
            .map_err(|e| fail(format!("parser task failed: {e}")))?
            .map_err(fail)?;

        tracing::debug!(path = %path.display(), rows = rows.len(), "Snapshot loaded");
        Ok(rows)
    }
}

#[async_trait]
impl DatasetSource for CsvDataset {
    async fn load_graham(&self) -> StockResult<Vec<ScreeningRow>> {
        Self::load(&self.graham_csv, parse_graham_csv, GRAHAM_LOAD_FAILED).await
    }

    async fn load_valuation(&self) -> StockResult<Vec<ValuationRow>> {
        Self::load(&self.valuation_csv, parse_valuation_csv, VALUATION_LOAD_FAILED).await
    }
}

/// Parse the Graham snapshot. Any malformed row fails the whole load.
pub fn parse_graham_csv(bytes: &[u8]) -> Result<Vec<ScreeningRow>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<ScreeningRow>().enumerate() {
        let row = record.map_err(|e| format!("row {}: {e}", idx + 1))?;
        row.validate().map_err(|e| format!("row {}: {e}", idx + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Parse the intrinsic-value snapshot, coercing numeric cells per column.
pub fn parse_valuation_csv(bytes: &[u8]) -> Result<Vec<ValuationRow>, String> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers().map_err(|e| e.to_string())?.clone();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("row {}: {e}", idx + 1))?;
        let cells: HashMap<&str, &str> = headers.iter().zip(record.iter()).collect();
        let row = ValuationRow::from_cells(&cells);
        if row.symbol.is_empty() {
            return Err(format!("row {}: missing Stock Symbol", idx + 1));
        }
        rows.push(row);
    }
    Ok(rows)
}
