//! Tests for the HTTP router and handlers.

use super::*;
use axum::body::Body;
use axum::http::{Method, Request};
use tower::ServiceExt;

// ============================================================================
// Helpers
// ============================================================================

fn test_state(config: ServiceConfig, store: InMemoryMovieStore) -> AppState {
    let telemetry = Telemetry::disabled();
    let service = build_service(&config, Arc::new(store), telemetry.clone());
    AppState::new(config, Arc::new(service), telemetry)
}

fn test_router(store: InMemoryMovieStore) -> Router {
    create_router(test_state(ServiceConfig::default(), store))
}

fn post_movie(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable")
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_then_get_returns_same_movie() {
    let store = InMemoryMovieStore::new();
    let app = test_router(store.clone());

    let response = app
        .clone()
        .oneshot(post_movie("/movie", r#"{"title":"Inception","year":2010}"#))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["title"], "Inception");
    assert_eq!(created["year"], 2010);

    let id = created["id"].as_str().expect("id should be a string");
    assert_eq!(id.len(), 26);

    let response = app
        .oneshot(get(&format!("/movie?id={}", id)))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, created);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_create_ignores_caller_supplied_id() {
    let store = InMemoryMovieStore::new();
    let app = test_router(store.clone());

    let response = app
        .oneshot(post_movie(
            "/movie",
            r#"{"id":"mine","title":"Inception","year":2010}"#,
        ))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_ne!(created["id"], "mine");
}

#[tokio::test]
async fn test_create_empty_title_returns_bad_request_without_writing() {
    let store = InMemoryMovieStore::new();
    let app = test_router(store.clone());

    let response = app
        .oneshot(post_movie("/movie", r#"{"title":"","year":2010}"#))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], 400);
    assert!(body["error"]
        .as_str()
        .expect("error should be a string")
        .contains("title"));
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_create_negative_year_returns_bad_request() {
    let store = InMemoryMovieStore::new();
    let app = test_router(store.clone());

    let response = app
        .oneshot(post_movie("/movie", r#"{"title":"Inception","year":-5}"#))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_create_malformed_json_returns_bad_request() {
    let store = InMemoryMovieStore::new();
    let app = test_router(store.clone());

    for body in [
        "{not json",
        r#"{"title":"Inception"}"#,
        r#"{"title":"Inception","year":"2010"}"#,
        "",
    ] {
        let response = app
            .clone()
            .oneshot(post_movie("/movie", body))
            .await
            .expect("request should complete");

        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "body {:?} should be rejected",
            body
        );
    }

    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_create_store_failure_returns_internal_error() {
    let store = InMemoryMovieStore::new();
    store.set_unavailable(true);
    let app = test_router(store);

    let response = app
        .oneshot(post_movie("/movie", r#"{"title":"Inception","year":2010}"#))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["status"], 500);
    assert!(body["timestamp"].is_string());
}

// ============================================================================
// Get
// ============================================================================

#[tokio::test]
async fn test_get_unknown_id_returns_not_found_with_empty_body() {
    let app = test_router(InMemoryMovieStore::new());

    let response = app
        .oneshot(get("/movie?id=doesnotexist"))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_get_empty_id_returns_not_found() {
    let app = test_router(InMemoryMovieStore::new());

    let response = app
        .oneshot(get("/movie?id="))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_without_id_returns_bad_request() {
    let app = test_router(InMemoryMovieStore::new());

    let response = app
        .oneshot(get("/movie"))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error should be a string")
        .contains("id"));
}

#[tokio::test]
async fn test_get_store_failure_returns_internal_error() {
    let store = InMemoryMovieStore::new();
    store.set_unavailable(true);
    let app = test_router(store);

    let response = app
        .oneshot(get("/movie?id=01ARZ3NDEKTSV4RRFFQ69G5FAV"))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_unsupported_method_returns_method_not_allowed() {
    let app = test_router(InMemoryMovieStore::new());

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/movie")
        .body(Body::empty())
        .expect("request should build");

    let response = app.oneshot(request).await.expect("request should complete");

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_path_returns_not_found() {
    let app = test_router(InMemoryMovieStore::new());

    let response = app
        .oneshot(get("/movies"))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = test_router(InMemoryMovieStore::new());

    let response = app
        .oneshot(get("/healthz"))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_base_path_prefixes_movie_route() {
    let mut config = ServiceConfig::default();
    config.server.base_path = "/api".to_string();
    let app = create_router(test_state(config, InMemoryMovieStore::new()));

    let response = app
        .clone()
        .oneshot(post_movie("/api/movie", r#"{"title":"Heat","year":1995}"#))
        .await
        .expect("request should complete");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(post_movie("/movie", r#"{"title":"Heat","year":1995}"#))
        .await
        .expect("request should complete");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Health check stays at the root
    let response = app
        .oneshot(get("/healthz"))
        .await
        .expect("request should complete");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let app = test_router(InMemoryMovieStore::new());

    let request = Request::builder()
        .uri("/healthz")
        .header("x-correlation-id", "abc-123")
        .body(Body::empty())
        .expect("request should build");

    let response = app.oneshot(request).await.expect("request should complete");

    assert_eq!(
        response
            .headers()
            .get("x-correlation-id")
            .and_then(|v| v.to_str().ok()),
        Some("abc-123")
    );
}

// ============================================================================
// Server Lifecycle
// ============================================================================

#[tokio::test]
async fn test_serve_stops_when_shutdown_resolves() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let state = test_state(ServiceConfig::default(), InMemoryMovieStore::new());

    let result = serve(listener, state, async {}).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_build_store_defaults_to_memory() {
    let store = build_store(&StoreConfig::default()).await;

    assert!(store.is_ok());
}
