//! Error types for the key-value server
//!
//! Provides layered error handling using thiserror: storage and pool errors
//! stay close to their source and collapse into [`KvError`] at the service.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Storage Error ==
/// Failure reported by a durable-store connection.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The store is unreachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The connection was already closed
    #[error("connection closed")]
    Closed,

    /// Reading or writing the backing file failed
    #[error("storage I/O: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file holds malformed data
    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),
}

// == Pool Error ==
/// Failure to obtain a pooled connection.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Opening a connection during construction failed
    #[error("failed to open connection {index} of {size}: {source}")]
    Connect {
        index: usize,
        size: usize,
        #[source]
        source: StorageError,
    },

    /// No connection became available in time
    #[error("no connection available after {0:?}")]
    Timeout(Duration),
}

// == KV Error Enum ==
/// Outcome taxonomy surfaced to callers of the service.
#[derive(Error, Debug)]
pub enum KvError {
    /// Missing or malformed key
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Key absent from both cache and durable store
    #[error("Key not found: {0}")]
    NotFound(i64),

    /// Pool exhausted or durable store failing
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for KvError {
    fn from(err: StorageError) -> Self {
        KvError::BackendUnavailable(err.to_string())
    }
}

impl From<PoolError> for KvError {
    fn from(err: PoolError) -> Self {
        KvError::BackendUnavailable(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for KvError {
    fn into_response(self) -> Response {
        let status = match &self {
            KvError::Validation(_) => StatusCode::BAD_REQUEST,
            KvError::NotFound(_) => StatusCode::NOT_FOUND,
            KvError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            KvError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the service layer.
pub type Result<T> = std::result::Result<T, KvError>;

/// Result type for durable-store operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (KvError::Validation("id".into()), StatusCode::BAD_REQUEST),
            (KvError::NotFound(7), StatusCode::NOT_FOUND),
            (
                KvError::BackendUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (KvError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_lower_errors_become_backend_unavailable() {
        let storage: KvError = StorageError::Unavailable("offline".into()).into();
        assert!(matches!(storage, KvError::BackendUnavailable(msg) if msg.contains("offline")));

        let pool: KvError = PoolError::Timeout(Duration::from_millis(5)).into();
        assert!(matches!(pool, KvError::BackendUnavailable(_)));
    }
}
