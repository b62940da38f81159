//! Cache-key derivation.
//!
//! Keys are `<prefix>:<param>:<param>...`. Params are canonicalized by the
//! caller (uppercase symbols, stringified pages, absent optionals as empty
//! strings); this module only joins and escapes them.

use std::fmt;

/// Logical operations served by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    StockData,
    StockProfile,
    TopStocks,
    Analysis,
    HistoricalData,
    Forecast,
    Eps,
    PeRatio,
    AaaCorporateBondYield,
    Search,
    DcfValue,
    DdmValue,
    GrahamValue,
    GrahamList,
    IntrinsicValueList,
}

impl Operation {
    /// Cache key prefix.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Self::StockData => "stockData",
            Self::StockProfile => "stockProfile",
            Self::TopStocks => "topStocks",
            Self::Analysis => "stockAnalysis",
            Self::HistoricalData => "historicalData",
            Self::Forecast => "forecastData",
            Self::Eps => "epsData",
            Self::PeRatio => "peRatio",
            Self::AaaCorporateBondYield => "AaaCorporateBondYield",
            Self::Search => "search",
            Self::DcfValue => "dcfValue",
            Self::DdmValue => "ddmValue",
            Self::GrahamValue => "benjaminGrahamValue",
            Self::GrahamList => "benjaminGrahamList",
            Self::IntrinsicValueList => "intrinsicValueList",
        }
    }

    /// Extractor script for process-backed operations.
    pub fn script(&self) -> Option<&'static str> {
        match self {
            Self::StockData => Some("getStockData.py"),
            Self::StockProfile => Some("getStockProfile.py"),
            Self::TopStocks => Some("getTopStock.py"),
            Self::Analysis => Some("getAnalysis.py"),
            Self::HistoricalData => Some("getHistoricalData.py"),
            Self::Eps => Some("getEPSData.py"),
            Self::PeRatio => Some("getPeRatioData.py"),
            Self::AaaCorporateBondYield => Some("getAaaCorporateBondYield.py"),
            Self::Search => Some("searchStock.py"),
            Self::DcfValue => Some("getDCFValue.py"),
            Self::DdmValue => Some("getDDMValue.py"),
            Self::GrahamValue => Some("getBenjaminGrahamValue.py"),
            Self::Forecast | Self::GrahamList | Self::IntrinsicValueList => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_prefix())
    }
}

/// An operation plus its canonical parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalQuery {
    pub operation: Operation,
    pub params: Vec<String>,
}

impl LogicalQuery {
    pub fn new(operation: Operation, params: Vec<String>) -> Self {
        Self { operation, params }
    }

    pub fn cache_key(&self) -> String {
        derive_key(self.operation, &self.params)
    }
}

/// Build the cache key for an operation and its canonical params.
pub fn derive_key<S: AsRef<str>>(operation: Operation, params: &[S]) -> String {
    let mut key = String::from(operation.key_prefix());
    for param in params {
        key.push(':');
        escape_into(&mut key, param.as_ref());
    }
    key
}

fn escape_into(out: &mut String, param: &str) {
    for c in param.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            _ => out.push(c),
        }
    }
}

/// Canonical form of a ticker symbol or search query.
pub fn canonical_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}
