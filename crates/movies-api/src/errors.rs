//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use movies_core::{telemetry::TelemetryError, MovieError};
use tracing::{error, warn};

/// Movie handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: malformed JSON, missing fields or parameters, or
///   values that fail validation. The client should not retry.
/// - `404 Not Found`: no movie with the requested ID. Returned with an empty
///   body.
/// - `500 Internal Server Error`: the record store failed or timed out.
///
/// Error bodies are JSON objects with `error`, `status` and `timestamp`
/// fields. Store failure details are logged server-side; the client gets a
/// generic message.
#[derive(Debug, thiserror::Error)]
pub enum MovieHandlerError {
    /// Request body is not a valid movie document
    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },

    /// Required query parameter absent
    #[error("Missing required query parameter: {name}")]
    MissingParameter { name: String },

    /// Record service failure
    #[error(transparent)]
    Service(#[from] MovieError),
}

impl IntoResponse for MovieHandlerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidBody { .. } | Self::MissingParameter { .. } => {
                warn!(error = %self, "Rejecting bad request");
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::Service(MovieError::Validation(e)) => {
                warn!(error = %e, "Movie failed validation");
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::Service(MovieError::NotFound { .. }) => {
                return StatusCode::NOT_FOUND.into_response();
            }
            Self::Service(MovieError::Store(e)) => {
                error!(error = %e, transient = e.is_transient(), "Record store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error occurred. Please try again later.".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl ServiceError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BindFailed { .. } => 1,
            Self::ServerFailed { .. } => 2,
            Self::Configuration(_) => 3,
            Self::Telemetry(_) => 3,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration loading failed: {0}")]
    Loading(#[from] config::ConfigError),
}
