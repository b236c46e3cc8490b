//! API Routes
//!
//! Configures the Axum router with all key-value server endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, set_handler, stats_handler, AppState,
};
use crate::storage::Connector;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /set?id=<key>` - Store the request body under an integer key
/// - `GET /get?id=<key>` - Retrieve a value by key
/// - `DELETE /del?id=<key>` - Delete a key
/// - `GET /stats` - Cache and pool statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router<K: Connector + 'static>(state: AppState<K>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", post(set_handler::<K>))
        .route("/get", get(get_handler::<K>))
        .route("/del", delete(delete_handler::<K>))
        .route("/stats", get(stats_handler::<K>))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::KvService;
    use crate::storage::MemoryTable;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let service = KvService::connect(&MemoryTable::new(), 100, 2).unwrap();
        create_router(AppState::new(service))
    }

    async fn status_of(app: Router, method: &str, uri: &str) -> StatusCode {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(status_of(create_test_app(), "GET", "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        assert_eq!(status_of(create_test_app(), "GET", "/stats").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_set_endpoint() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/set?id=1")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        assert_eq!(
            status_of(create_test_app(), "GET", "/get?id=99").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_missing_or_bad_id_is_bad_request() {
        let app = create_test_app();
        assert_eq!(status_of(app.clone(), "GET", "/get").await, StatusCode::BAD_REQUEST);
        assert_eq!(status_of(app.clone(), "DELETE", "/del?id=x").await, StatusCode::BAD_REQUEST);
        assert_eq!(status_of(app, "POST", "/set?id=").await, StatusCode::BAD_REQUEST);
    }
}
