//! Response DTOs for the key-value API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::pool::PoolStats;
use crate::service::ServiceStats;

/// Response body for `GET /get`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: i64,
    pub value: String,
}

impl GetResponse {
    pub fn new(key: i64, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Response body for `POST /set`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    pub key: i64,
}

impl SetResponse {
    pub fn new(key: i64) -> Self {
        Self {
            message: format!("Key {} set successfully", key),
            key,
        }
    }
}

/// Response body for `DELETE /del`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    pub key: i64,
}

impl DeleteResponse {
    pub fn new(key: i64) -> Self {
        Self {
            message: format!("Key {} deleted successfully", key),
            key,
        }
    }
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    pub pool: PoolStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Resident entries over capacity
    pub occupancy: f64,
}

impl From<ServiceStats> for StatsResponse {
    fn from(stats: ServiceStats) -> Self {
        Self {
            hit_rate: stats.cache.hit_rate(),
            occupancy: stats.cache.occupancy(),
            cache: stats.cache,
            pool: stats.pool,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
