//! # Movie Creators
//!
//! The consumer hands each decoded message to a [`MovieCreator`]. Two
//! implementations exist:
//!
//! - [`HttpMovieCreator`] POSTs to the ingestion endpoint and propagates the
//!   trace context in a `traceparent` header
//! - [`ServiceMovieCreator`] calls a [`MovieService`] in-process

use crate::error::CreateError;
use async_trait::async_trait;
use movies_core::{MovieService, NewMovie, Telemetry};
use opentelemetry::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

#[cfg(test)]
#[path = "creator_tests.rs"]
mod tests;

/// Creates a movie record from a decoded creation request
#[async_trait]
pub trait MovieCreator: Send + Sync {
    /// Create the movie, with `cx` as the parent trace context
    async fn create_movie(&self, cx: &Context, movie: &NewMovie) -> Result<(), CreateError>;
}

// ============================================================================
// HTTP Creator
// ============================================================================

/// Creator that calls the ingestion endpoint over HTTP
#[derive(Debug, Clone)]
pub struct HttpMovieCreator {
    client: reqwest::Client,
    url: String,
    telemetry: Telemetry,
}

impl HttpMovieCreator {
    /// Create a client posting to `url` with a per-request `timeout`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        telemetry: Telemetry,
    ) -> Result<Self, CreateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("movie-processor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CreateError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url: url.into(),
            telemetry,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MovieCreator for HttpMovieCreator {
    #[instrument(skip(self, cx, movie), fields(url = %self.url))]
    async fn create_movie(&self, cx: &Context, movie: &NewMovie) -> Result<(), CreateError> {
        let mut headers = http::HeaderMap::new();
        self.telemetry.inject_context(cx, &mut headers);

        let response = self
            .client
            .post(&self.url)
            .headers(headers)
            .json(movie)
            .send()
            .await
            .map_err(|e| CreateError::Request {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(CreateError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = %status, "Movie created via endpoint");
        Ok(())
    }
}

// ============================================================================
// In-Process Creator
// ============================================================================

/// Creator that calls the record service directly
#[derive(Debug, Clone)]
pub struct ServiceMovieCreator {
    service: Arc<MovieService>,
}

impl ServiceMovieCreator {
    pub fn new(service: Arc<MovieService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl MovieCreator for ServiceMovieCreator {
    async fn create_movie(&self, cx: &Context, movie: &NewMovie) -> Result<(), CreateError> {
        let created = self.service.create(cx, movie.clone()).await?;
        debug!(movie_id = %created.id, "Movie created in-process");
        Ok(())
    }
}
