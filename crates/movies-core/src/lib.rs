//! # Movies Core
//!
//! Core business logic for the movies record service.
//!
//! This crate contains the single domain entity ([`Movie`]), the identifier
//! scheme used for new records, the [`store::MovieStore`] capability and the
//! [`service::MovieService`] that validates, identifies and persists records.
//!
//! ## Architecture
//!
//! The core follows the same layering as the rest of the workspace:
//! - Business logic depends only on trait abstractions
//! - Infrastructure implementations (in-memory, DynamoDB) live in [`adapters`]
//! - Tracing is an explicitly constructed [`telemetry::Telemetry`] value that
//!   is handed to the components that emit spans
//!
//! ## Usage
//!
//! ```rust
//! use movies_core::{MovieIdGenerator, NewMovie};
//!
//! let ids = MovieIdGenerator::new();
//! let first = ids.next_id();
//! let second = ids.next_id();
//! assert!(first < second);
//!
//! let request = NewMovie::new("Inception", 2010);
//! assert!(request.validate().is_ok());
//! ```

pub mod adapters;
pub mod environment;
pub mod service;
pub mod settings;
pub mod shutdown;
pub mod store;
pub mod telemetry;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use ulid::Ulid;

pub use service::{MovieService, MovieServiceConfig};
pub use store::{MovieStore, StoreError};
pub use telemetry::{init_logging, LoggingConfig, Telemetry, TelemetryConfig};

/// Standard result type for movie operations
pub type MovieResult<T> = Result<T, MovieError>;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Unique identifier for a movie record
///
/// New identifiers are ULIDs: a 48-bit millisecond timestamp followed by 80
/// random bits, rendered as 26 Crockford base32 characters. The textual form
/// sorts lexicographically in creation order.
///
/// Lookups accept any string (an id that was never issued is simply not
/// found), so the type does not enforce the ULID format on parse.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl MovieId {
    /// Wrap an already-issued identifier
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get string representation of the movie ID
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the ULID if this identifier was generated by the service
    pub fn as_ulid(&self) -> Option<Ulid> {
        self.0.parse::<Ulid>().ok()
    }
}

impl From<Ulid> for MovieId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid.to_string())
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MovieId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Generator for strictly increasing movie identifiers
///
/// Wraps a monotonic ULID generator so that identifiers created within the
/// same millisecond still sort in creation order.
pub struct MovieIdGenerator {
    inner: Mutex<ulid::Generator>,
}

impl MovieIdGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ulid::Generator::new()),
        }
    }

    /// Issue the next identifier
    pub fn next_id(&self) -> MovieId {
        let mut generator = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match generator.generate() {
            Ok(ulid) => MovieId::from(ulid),
            Err(e) => {
                // Only reachable after 2^80 ids in one millisecond.
                tracing::warn!(error = %e, "Monotonic id space exhausted, using a fresh ULID");
                MovieId::from(Ulid::new())
            }
        }
    }
}

impl Default for MovieIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MovieIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovieIdGenerator").finish_non_exhaustive()
    }
}

// ============================================================================
// Domain Entities
// ============================================================================

/// A persisted movie record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub year: i32,
}

impl Movie {
    /// Assign an identifier to a creation request
    pub fn from_request(id: MovieId, request: NewMovie) -> Self {
        Self {
            id,
            title: request.title,
            year: request.year,
        }
    }
}

/// A request to create a movie
///
/// This is both the HTTP create body and the queue message payload. Unknown
/// fields (including a caller-supplied `id`) are ignored on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovie {
    pub title: String,
    pub year: i32,
}

impl NewMovie {
    pub fn new(title: impl Into<String>, year: i32) -> Self {
        Self {
            title: title.into(),
            year,
        }
    }

    /// Check required fields
    ///
    /// The title must contain at least one non-whitespace character and the
    /// year must be positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "title".to_string(),
            });
        }

        if self.year <= 0 {
            return Err(ValidationError::OutOfRange {
                field: "year".to_string(),
                message: format!("must be positive, got {}", self.year),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors returned by the record service
#[derive(Debug, thiserror::Error)]
pub enum MovieError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("No movie found with id '{id}'")]
    NotFound { id: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl MovieError {
    /// Check if the failure may succeed when retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::NotFound { .. } => false,
            Self::Store(e) => e.is_transient(),
        }
    }
}

/// Input validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
