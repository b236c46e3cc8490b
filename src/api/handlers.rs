//! API Handlers
//!
//! HTTP request handlers for each key-value endpoint. Keys are validated on
//! the async side; service calls then run on the blocking worker pool since
//! they may wait for a pooled connection.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::{KvError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, KeyQuery, SetResponse, StatsResponse,
};
use crate::service::KvService;
use crate::storage::Connector;

/// Application state shared across all handlers.
pub struct AppState<K: Connector> {
    pub service: Arc<KvService<K>>,
}

impl<K: Connector> Clone for AppState<K> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<K: Connector + 'static> AppState<K> {
    pub fn new(service: KvService<K>) -> Self {
        Self::from_shared(Arc::new(service))
    }

    pub fn from_shared(service: Arc<KvService<K>>) -> Self {
        Self { service }
    }

    /// Runs `op` against the service on a blocking worker thread.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&KvService<K>) -> Result<T> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || op(&service))
            .await
            .map_err(|err| KvError::Internal(format!("worker failed: {err}")))?
    }
}

/// Handler for POST /set?id=<key>
///
/// Stores the raw request body as the value.
pub async fn set_handler<K: Connector + 'static>(
    State(state): State<AppState<K>>,
    Query(query): Query<KeyQuery>,
    value: String,
) -> Result<Json<SetResponse>> {
    let key = query.key()?;
    state.run(move |svc| svc.set(key, value)).await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /get?id=<key>
pub async fn get_handler<K: Connector + 'static>(
    State(state): State<AppState<K>>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<GetResponse>> {
    let key = query.key()?;
    let value = state.run(move |svc| svc.get(key)).await?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del?id=<key>
pub async fn delete_handler<K: Connector + 'static>(
    State(state): State<AppState<K>>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<DeleteResponse>> {
    let key = query.key()?;
    state.run(move |svc| svc.delete(key)).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler<K: Connector + 'static>(
    State(state): State<AppState<K>>,
) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.service.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTable;

    fn test_state(table: &MemoryTable) -> AppState<MemoryTable> {
        AppState::new(KvService::connect(table, 100, 2).unwrap())
    }

    fn id(raw: &str) -> Query<KeyQuery> {
        Query(KeyQuery {
            id: Some(raw.to_string()),
        })
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let table = MemoryTable::new();
        let state = test_state(&table);

        let result = set_handler(State(state.clone()), id("1"), "test_value".to_string()).await;
        assert!(result.is_ok());
        assert_eq!(table.peek(1), Some("test_value".to_string()));

        let response = get_handler(State(state), id("1")).await.unwrap();
        assert_eq!(response.key, 1);
        assert_eq!(response.value, "test_value");
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state(&MemoryTable::new());

        let result = get_handler(State(state), id("404")).await;
        assert!(matches!(result, Err(KvError::NotFound(404))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state(&MemoryTable::new());
        set_handler(State(state.clone()), id("5"), "value".to_string())
            .await
            .unwrap();

        let result = delete_handler(State(state.clone()), id("5")).await;
        assert!(result.is_ok());

        let result = get_handler(State(state.clone()), id("5")).await;
        assert!(matches!(result, Err(KvError::NotFound(5))));

        let result = delete_handler(State(state), id("5")).await;
        assert!(matches!(result, Err(KvError::NotFound(5))));
    }

    #[tokio::test]
    async fn test_invalid_key_touches_nothing() {
        let table = MemoryTable::new();
        let state = test_state(&table);

        let result = set_handler(State(state.clone()), id("abc"), "v".to_string()).await;
        assert!(matches!(result, Err(KvError::Validation(_))));

        let result = get_handler(State(state.clone()), Query(KeyQuery::default())).await;
        assert!(matches!(result, Err(KvError::Validation(_))));

        assert!(table.is_empty());
        let stats = state.service.stats();
        assert_eq!(stats.cache.hits + stats.cache.misses, 0);
    }

    #[tokio::test]
    async fn test_backend_failure_handler() {
        let table = MemoryTable::new();
        let state = test_state(&table);
        table.set_online(false);

        let result = get_handler(State(state), id("1")).await;
        assert!(matches!(result, Err(KvError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state(&MemoryTable::new());

        let response = stats_handler(State(state)).await;
        assert_eq!(response.cache.hits, 0);
        assert_eq!(response.pool.size, 2);
        assert_eq!(response.pool.available, 2);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
