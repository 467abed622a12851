//! # Record Store Interface
//!
//! Abstraction over the key-value backend that persists movie records.
//!
//! Implementations live in [`crate::adapters`].

use crate::{Movie, MovieId};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Core Trait
// ============================================================================

/// Interface for movie persistence
///
/// Every write is an unconditional overwrite keyed by the movie ID. There are
/// no secondary indexes, no partial updates and no conditional writes.
///
/// # Examples
///
/// ```no_run
/// use movies_core::{Movie, MovieId, store::{MovieStore, StoreError}};
/// # async fn example(store: impl MovieStore) -> Result<(), StoreError> {
/// let movie = Movie {
///     id: MovieId::new("01ARZ3NDEKTSV4RRFFQ69G5FAV"),
///     title: "Inception".to_string(),
///     year: 2010,
/// };
///
/// store.put(&movie).await?;
///
/// if let Some(stored) = store.get(&movie.id).await? {
///     println!("Found {}", stored.title);
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Write the record, replacing any record with the same ID
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unavailable or rejects the write.
    async fn put(&self, movie: &Movie) -> Result<(), StoreError>;

    /// Fetch a record by exact ID
    ///
    /// Returns `None` if no record exists with the ID. Absence is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unavailable or the stored item cannot
    /// be decoded into a [`Movie`].
    async fn get(&self, id: &MovieId) -> Result<Option<Movie>, StoreError>;
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors from the record store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Store rejected the request: {message}")]
    Rejected { message: String },

    #[error("Stored item for '{id}' is malformed: {message}")]
    Malformed { id: String, message: String },
}

impl StoreError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Unavailable { .. } => true,
            Self::Rejected { .. } => false,
            Self::Malformed { .. } => false,
        }
    }
}
