//! External data collaborators.
//!
//! Two fetch strategies feed the orchestrator:
//! - [`ExtractorProcess`]: spawns one extractor script per query and parses
//!   its stdout as a single JSON document.
//! - [`ForecastClient`]: HTTP GET against the forecast API, unwrapping the
//!   first element of an array payload.

mod http;
mod process;

pub use http::ForecastClient;
pub use process::ExtractorProcess;

use async_trait::async_trait;
use serde_json::Value;

/// Collaborator failures. Each maps into `StockError::Upstream`.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("failed to start extractor {script}: {reason}")]
    Spawn { script: String, reason: String },

    #[error("extractor exited with code {}", exit_code_label(*code))]
    Exit { code: Option<i32> },

    #[error("extractor reported an error: {0}")]
    Stderr(String),

    #[error("invalid JSON from upstream: {0}")]
    InvalidJson(String),

    #[error("upstream timed out after {0} seconds")]
    Timeout(u64),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },

    #[error("upstream returned an empty payload")]
    EmptyPayload,
}

fn exit_code_label(code: Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

/// Runs an extractor script with positional arguments and returns its JSON.
#[async_trait]
pub trait ProcessCollaborator: Send + Sync {
    async fn run(&self, script: &str, args: &[String]) -> Result<Value, UpstreamError>;
}

/// Fetches the forecast document for a symbol.
#[async_trait]
pub trait HttpCollaborator: Send + Sync {
    async fn get_json(&self, symbol: &str) -> Result<Value, UpstreamError>;
}
