//! Error types for laba-stocks.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::upstream::UpstreamError;

/// Result alias for orchestrator and screening operations.
pub type StockResult<T> = std::result::Result<T, StockError>;

/// Failures that cross the core boundary into the HTTP surface.
///
/// Cache failures never appear here: reads fail open and writes are logged.
#[derive(Debug, thiserror::Error)]
pub enum StockError {
    /// Malformed request input (400). Never retried, never cached.
    #[error("{0}")]
    Validation(String),

    /// Extractor process or HTTP collaborator failed (500). Cache untouched.
    #[error("{0}")]
    Upstream(String),

    /// CSV snapshot could not be read or parsed (500).
    #[error("{0}")]
    Dataset(String),
}

impl StockError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::Dataset(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UpstreamError> for StockError {
    fn from(err: UpstreamError) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl IntoResponse for StockError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
