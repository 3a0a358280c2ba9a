//! Error types for the ledger and its HTTP surface.
//!
//! [`LedgerError`] is what every ledger operation returns. Local store
//! failures arrive as [`StoreError`], mirror failures as [`RemoteError`].
//! [`AppError`] turns either into an HTTP response.

use ntex::http::StatusCode;
use ntex::web::{HttpResponse, WebResponseError};

/// Failures of the local key/value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("invalid timestamp in record {key}: {value}")]
    Timestamp { key: &'static str, value: String },
}

/// Failures of the shared remote document.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("remote mirroring is not enabled")]
    Disabled,

    #[error("remote request failed: {0}")]
    Transport(String),

    #[error("remote request timed out")]
    Timeout,

    #[error("remote returned status {0}")]
    Status(u16),

    #[error("malformed remote document: {0}")]
    Malformed(String),

    /// Someone else pushed since our last pull.
    #[error("remote revision conflict: expected {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid submission: {0}")]
    Validation(String),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("remote mirror failed: {0}")]
    Remote(#[from] RemoteError),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl WebResponseError for AppError {
    fn error_response(&self, _: &ntex::web::HttpRequest) -> HttpResponse {
        let (status, message) = match self {
            AppError::Ledger(LedgerError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::Ledger(LedgerError::Persistence(e)) => {
                tracing::error!(error = %e, "ledger persistence failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Ledger storage error".to_string())
            }
            AppError::Ledger(LedgerError::Remote(e)) => (StatusCode::BAD_GATEWAY, e.to_string()),
        };
        HttpResponse::build(status).json(&serde_json::json!({ "error": message }))
    }
}
