//! # Record Service
//!
//! Validates creation requests, assigns identifiers and delegates persistence
//! to a [`MovieStore`]. Used by both the HTTP endpoint and the in-process
//! queue creator.

use crate::store::{MovieStore, StoreError};
use crate::telemetry::Telemetry;
use crate::{Movie, MovieError, MovieId, MovieIdGenerator, MovieResult, NewMovie};
use opentelemetry::trace::{Span, Status, Tracer};
use opentelemetry::{Context, KeyValue};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

/// Record service settings
#[derive(Debug, Clone)]
pub struct MovieServiceConfig {
    /// Deadline applied to every store call
    pub store_timeout: Duration,
}

impl Default for MovieServiceConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(10),
        }
    }
}

/// Create and look up movie records
pub struct MovieService {
    store: Arc<dyn MovieStore>,
    ids: MovieIdGenerator,
    telemetry: Telemetry,
    config: MovieServiceConfig,
}

impl MovieService {
    pub fn new(store: Arc<dyn MovieStore>, telemetry: Telemetry) -> Self {
        Self::with_config(store, telemetry, MovieServiceConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn MovieStore>,
        telemetry: Telemetry,
        config: MovieServiceConfig,
    ) -> Self {
        Self {
            store,
            ids: MovieIdGenerator::new(),
            telemetry,
            config,
        }
    }

    /// Create a movie with a freshly generated ID
    ///
    /// The span `movies.create` is started as a child of `parent`.
    ///
    /// # Errors
    ///
    /// - [`MovieError::Validation`] if the title is blank or the year is not
    ///   positive. Nothing is written in that case.
    /// - [`MovieError::Store`] if the write fails or exceeds the store
    ///   deadline. The caller decides whether to retry.
    #[instrument(skip(self, parent, request), fields(title = %request.title, year = request.year))]
    pub async fn create(&self, parent: &Context, request: NewMovie) -> MovieResult<Movie> {
        let mut span = self
            .telemetry
            .tracer()
            .start_with_context("movies.create", parent);

        let result = self.create_movie(request).await;

        match &result {
            Ok(movie) => span.set_attribute(KeyValue::new("movie.id", movie.id.to_string())),
            Err(e) => span.set_status(Status::error(e.to_string())),
        }
        span.end();

        result
    }

    async fn create_movie(&self, request: NewMovie) -> MovieResult<Movie> {
        if let Err(e) = request.validate() {
            warn!(error = %e, "Rejecting invalid movie");
            return Err(MovieError::Validation(e));
        }

        let movie = Movie::from_request(self.ids.next_id(), request);
        debug!(movie_id = %movie.id, "Creating movie");

        self.with_deadline(self.store.put(&movie)).await?;

        info!(movie_id = %movie.id, title = %movie.title, "Created movie");
        Ok(movie)
    }

    /// Look up a movie by ID
    ///
    /// The span `movies.get` is started as a child of `parent`.
    ///
    /// # Errors
    ///
    /// - [`MovieError::NotFound`] if no record exists. An empty ID is never
    ///   found and does not reach the store.
    /// - [`MovieError::Store`] on backend failure or deadline overrun.
    #[instrument(skip(self, parent))]
    pub async fn get_by_id(&self, parent: &Context, id: &str) -> MovieResult<Movie> {
        let mut span = self
            .telemetry
            .tracer()
            .start_with_context("movies.get", parent);
        span.set_attribute(KeyValue::new("movie.id", id.to_string()));

        let result = self.find_movie(id).await;

        match &result {
            Ok(_) | Err(MovieError::NotFound { .. }) => {}
            Err(e) => span.set_status(Status::error(e.to_string())),
        }
        span.end();

        result
    }

    async fn find_movie(&self, id: &str) -> MovieResult<Movie> {
        if id.is_empty() {
            return Err(MovieError::NotFound { id: String::new() });
        }

        let movie_id = MovieId::new(id);
        match self.with_deadline(self.store.get(&movie_id)).await? {
            Some(movie) => {
                debug!(movie_id = %movie.id, "Got movie");
                Ok(movie)
            }
            None => {
                debug!(movie_id = %movie_id, "No movie found");
                Err(MovieError::NotFound { id: id.to_string() })
            }
        }
    }

    async fn with_deadline<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.config.store_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                duration: self.config.store_timeout,
            }),
        }
    }
}

impl std::fmt::Debug for MovieService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
