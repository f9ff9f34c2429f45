#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use photoshare_core::gateway::AccessGateway;
use photoshare_core::memory::MemoryEngagementStore;
use serde_json::Value;
use tower::ServiceExt;

use photoshare_api::config::{MediaConfig, ServerConfig};
use photoshare_api::middleware::identity::USER_ID_HEADER;
use photoshare_api::router::build_app_router;
use photoshare_api::state::AppState;

pub const TEST_SIGNING_KEY: &str = "integration-test-signing-key";

/// Build a test `ServerConfig` with safe defaults and a fixed signing key.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: None,
        media: MediaConfig {
            signing_key: TEST_SIGNING_KEY.to_string(),
            signing_key_id: "test".to_string(),
            retired_keys: vec![("old".to_string(), "retired-test-key".to_string())],
            base_url: "http://localhost:3000/media".to_string(),
            url_ttl_secs: 3600,
        },
    }
}

/// Build the full application router over a fresh in-memory store.
///
/// Uses [`build_app_router`] so tests exercise the same middleware stack
/// (CORS, request ID, timeout, tracing, panic recovery) that production uses.
pub fn build_test_app() -> Router {
    build_test_app_with_store(Arc::new(MemoryEngagementStore::new()))
}

pub fn build_test_app_with_store(store: Arc<MemoryEngagementStore>) -> Router {
    let config = test_config();
    let signer = config.media.build_signer().unwrap();
    let gateway = AccessGateway::new(
        Arc::new(signer),
        store.clone(),
        store,
        config.media.gateway_config(),
    );

    let state = AppState {
        gateway: Arc::new(gateway),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_as(app: Router, uri: &str, user_id: i64) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(USER_ID_HEADER, user_id.to_string())
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_as(app: Router, uri: &str, user_id: i64, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header(USER_ID_HEADER, user_id.to_string())
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a photo through the API and return its id.
pub async fn register_photo(app: &Router, resource_path: &str) -> uuid::Uuid {
    let photo_id = uuid::Uuid::new_v4();
    let response = post_json(
        app.clone(),
        "/api/v1/photos",
        serde_json::json!({ "photo_id": photo_id, "resource_path": resource_path }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    photo_id
}

/// Turn an issued absolute media URL into a request path for the test router.
pub fn media_path(url: &str) -> String {
    url.strip_prefix("http://localhost:3000")
        .expect("URL uses the test media base")
        .to_string()
}
