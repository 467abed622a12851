//! # Movies HTTP Service
//!
//! HTTP interface to the movie record service.
//!
//! This service provides:
//! - `POST {base_path}/movie` to create a movie from `{"title", "year"}`
//! - `GET {base_path}/movie?id=<id>` to fetch a movie
//! - `GET /healthz` for liveness probes
//!
//! Incoming W3C `traceparent` headers are honoured so that service spans
//! join the caller's trace.

pub mod config;
pub mod errors;

pub use config::{ServerConfig, ServiceConfig, StoreBackend, StoreConfig, LEGACY_VARIABLES};
pub use errors::{ConfigError, MovieHandlerError, ServiceError};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{Json, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use movies_core::{
    adapters::InMemoryMovieStore, Movie, MovieService, MovieServiceConfig, MovieStore, NewMovie,
    Telemetry,
};
use serde::Deserialize;
use std::{future::Future, net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Record service handling creates and lookups
    pub service: Arc<MovieService>,

    /// Tracing provider and propagator
    pub telemetry: Telemetry,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ServiceConfig, service: Arc<MovieService>, telemetry: Telemetry) -> Self {
        Self {
            config,
            service,
            telemetry,
        }
    }
}

// ============================================================================
// Store Wiring
// ============================================================================

/// Build the record store selected by configuration
///
/// # Errors
///
/// Returns a configuration error if DynamoDB is selected but the crate was
/// built without the `dynamodb` feature, or no table name is configured.
pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn MovieStore>, ServiceError> {
    match config.effective_backend() {
        StoreBackend::Memory => {
            warn!("Using in-memory movie store; records are lost on restart");
            Ok(Arc::new(InMemoryMovieStore::new()))
        }
        StoreBackend::Dynamodb => build_dynamodb_store(config).await,
    }
}

#[cfg(feature = "dynamodb")]
async fn build_dynamodb_store(config: &StoreConfig) -> Result<Arc<dyn MovieStore>, ServiceError> {
    let table_name = config
        .table_name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ConfigError::Missing {
            key: "store.table_name".to_string(),
        })?;
    info!(table_name = %table_name, region = ?config.region, "Using DynamoDB movie store");
    let store = movies_core::adapters::DynamoDbMovieStore::new(
        config.region.clone(),
        table_name,
        config.endpoint_url.clone(),
    )
    .await;

    Ok(Arc::new(store))
}

#[cfg(not(feature = "dynamodb"))]
async fn build_dynamodb_store(_config: &StoreConfig) -> Result<Arc<dyn MovieStore>, ServiceError> {
    Err(ConfigError::Invalid {
        message: "store.backend 'dynamodb' requires the 'dynamodb' feature".to_string(),
    }
    .into())
}

/// Build the record service for a configured store
pub fn build_service(
    config: &ServiceConfig,
    store: Arc<dyn MovieStore>,
    telemetry: Telemetry,
) -> MovieService {
    MovieService::with_config(
        store,
        telemetry,
        MovieServiceConfig {
            store_timeout: config.store.timeout(),
        },
    )
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let movie_routes = Router::new().route(
        &state.config.server.movie_route(),
        get(handle_get_movie).post(handle_create_movie),
    );

    let health_routes = Router::new().route("/healthz", get(handle_health_check));

    let request_timeout = state.config.server.request_timeout();

    Router::new()
        .merge(movie_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(TimeoutLayer::new(request_timeout))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server on the configured address
///
/// Runs until SIGINT or SIGTERM, then drains in-flight requests for at most
/// `server.shutdown_timeout_seconds`.
pub async fn start_server(
    config: ServiceConfig,
    service: Arc<MovieService>,
    telemetry: Telemetry,
) -> Result<(), ServiceError> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = address.parse().map_err(|e| ServiceError::BindFailed {
        address: address.clone(),
        message: format!("invalid address: {}", e),
    })?;

    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", addr);

    let state = AppState::new(config, service, telemetry);
    serve(listener, state, movies_core::shutdown::signal()).await
}

/// Serve requests on an already bound listener until `shutdown` resolves
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown_timeout = state.config.server.shutdown_timeout();
    let app = create_router(state);

    let (draining_tx, draining_rx) = tokio::sync::oneshot::channel::<()>();
    let signal = async move {
        shutdown.await;
        info!(
            "Initiating graceful shutdown with {}s timeout",
            shutdown_timeout.as_secs()
        );
        let _ = draining_tx.send(());
    };

    let server = std::future::IntoFuture::into_future(
        axum::serve(listener, app).with_graceful_shutdown(signal),
    );

    let drain_deadline = async move {
        if draining_rx.await.is_ok() {
            tokio::time::sleep(shutdown_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!("Graceful shutdown timed out; dropping in-flight requests");
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

// ============================================================================
// Movie Handlers
// ============================================================================

/// Query parameters for movie lookup
#[derive(Debug, Deserialize)]
pub struct GetMovieParams {
    pub id: Option<String>,
}

/// Create a movie
///
/// The body is decoded by hand rather than through the `Json` extractor so
/// that every decode failure maps to `400` with the service's error body.
#[instrument(skip_all)]
pub async fn handle_create_movie(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Movie>), MovieHandlerError> {
    let request: NewMovie =
        serde_json::from_slice(&body).map_err(|e| MovieHandlerError::InvalidBody {
            message: e.to_string(),
        })?;

    let parent = state.telemetry.extract_context(&headers);
    let movie = state.service.create(&parent, request).await?;

    Ok((StatusCode::CREATED, Json(movie)))
}

/// Fetch a movie by ID
#[instrument(skip_all, fields(id = ?params.id))]
pub async fn handle_get_movie(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<GetMovieParams>,
) -> Result<Json<Movie>, MovieHandlerError> {
    let id = params.id.ok_or_else(|| MovieHandlerError::MissingParameter {
        name: "id".to_string(),
    })?;

    let parent = state.telemetry.extract_context(&headers);
    let movie = state.service.get_by_id(&parent, &id).await?;

    Ok(Json(movie))
}

// ============================================================================
// Health Handlers
// ============================================================================

/// Liveness probe
async fn handle_health_check() -> StatusCode {
    StatusCode::OK
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// Logs method, path, status and latency for every request and echoes the
/// `x-correlation-id` header, generating one when the caller sent none.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}
