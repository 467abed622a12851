//! Tests for the HTTP and in-process creators.

use super::*;
use movies_core::adapters::InMemoryMovieStore;
use movies_core::MovieError;
use opentelemetry::trace::{TraceContextExt, Tracer};
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn creator_for(server: &MockServer, timeout: Duration) -> HttpMovieCreator {
    HttpMovieCreator::new(
        format!("{}/movie", server.uri()),
        timeout,
        Telemetry::disabled(),
    )
    .expect("creator should build")
}

#[tokio::test]
async fn test_http_creator_posts_movie_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/movie"))
        .and(body_json(serde_json::json!({"title": "Inception", "year": 2010})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "01ARZ3NDEKTSV4RRFFQ69G5FAV",
            "title": "Inception",
            "year": 2010
        })))
        .expect(1)
        .mount(&server)
        .await;

    let creator = creator_for(&server, Duration::from_secs(5));

    let result = creator
        .create_movie(&Context::new(), &NewMovie::new("Inception", 2010))
        .await;

    assert!(result.is_ok(), "unexpected error: {:?}", result);
}

#[tokio::test]
async fn test_http_creator_injects_traceparent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/movie"))
        .and(header_exists("traceparent"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let telemetry = Telemetry::disabled();
    let creator = HttpMovieCreator::new(
        format!("{}/movie", server.uri()),
        Duration::from_secs(5),
        telemetry.clone(),
    )
    .expect("creator should build");

    let span = telemetry.tracer().start("processMessage");
    let cx = Context::new().with_span(span);

    let result = creator
        .create_movie(&cx, &NewMovie::new("Inception", 2010))
        .await;

    assert!(result.is_ok(), "unexpected error: {:?}", result);
}

#[tokio::test]
async fn test_http_creator_server_error_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/movie"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let creator = creator_for(&server, Duration::from_secs(5));

    let result = creator
        .create_movie(&Context::new(), &NewMovie::new("Inception", 2010))
        .await;

    match result {
        Err(e @ CreateError::BadStatus { status: 500, .. }) => assert!(e.is_transient()),
        other => panic!("expected 500 failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_creator_bad_request_is_permanent_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/movie"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let creator = creator_for(&server, Duration::from_secs(5));

    let result = creator
        .create_movie(&Context::new(), &NewMovie::new("", 2010))
        .await;

    match result {
        Err(e @ CreateError::BadStatus { status: 400, .. }) => assert!(!e.is_transient()),
        other => panic!("expected 400 failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_creator_times_out_slow_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/movie"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let creator = creator_for(&server, Duration::from_millis(100));

    let result = creator
        .create_movie(&Context::new(), &NewMovie::new("Inception", 2010))
        .await;

    assert!(matches!(result, Err(CreateError::Request { .. })));
}

#[tokio::test]
async fn test_service_creator_persists_movie() {
    let store = InMemoryMovieStore::new();
    let service = Arc::new(MovieService::new(
        Arc::new(store.clone()),
        Telemetry::disabled(),
    ));
    let creator = ServiceMovieCreator::new(service);

    creator
        .create_movie(&Context::new(), &NewMovie::new("Heat", 1995))
        .await
        .expect("create should succeed");

    let stored = store.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "Heat");
}

#[tokio::test]
async fn test_service_creator_surfaces_validation_failure() {
    let store = InMemoryMovieStore::new();
    let service = Arc::new(MovieService::new(
        Arc::new(store.clone()),
        Telemetry::disabled(),
    ));
    let creator = ServiceMovieCreator::new(service);

    let result = creator
        .create_movie(&Context::new(), &NewMovie::new("Heat", 0))
        .await;

    assert!(matches!(
        result,
        Err(CreateError::Service(MovieError::Validation(_)))
    ));
    assert_eq!(store.put_count(), 0);
}
