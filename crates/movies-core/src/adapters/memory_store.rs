//! # In-Memory Movie Store
//!
//! Thread-safe in-memory record store for testing and local development.

use crate::store::{MovieStore, StoreError};
use crate::{Movie, MovieId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;

/// In-memory movie store
///
/// Clones share the same underlying map, so a test can keep a handle for
/// inspection while the service owns another.
#[derive(Clone, Default)]
pub struct InMemoryMovieStore {
    movies: Arc<RwLock<HashMap<MovieId, Movie>>>,
    put_count: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryMovieStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls that reached the store, successful or not
    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.movies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.movies.read().await.is_empty()
    }

    /// Snapshot of every stored record, ordered by ID
    pub async fn all(&self) -> Vec<Movie> {
        let mut movies: Vec<Movie> = self.movies.read().await.values().cloned().collect();
        movies.sort_by(|a, b| a.id.cmp(&b.id));
        movies
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                message: "in-memory store marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MovieStore for InMemoryMovieStore {
    async fn put(&self, movie: &Movie) -> Result<(), StoreError> {
        self.put_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        self.movies
            .write()
            .await
            .insert(movie.id.clone(), movie.clone());
        Ok(())
    }

    async fn get(&self, id: &MovieId) -> Result<Option<Movie>, StoreError> {
        self.check_available()?;
        Ok(self.movies.read().await.get(id).cloned())
    }
}

impl std::fmt::Debug for InMemoryMovieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMovieStore")
            .field("put_count", &self.put_count())
            .finish_non_exhaustive()
    }
}
