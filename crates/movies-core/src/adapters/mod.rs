//! # Infrastructure Adapters
//!
//! Infrastructure implementations of the record store interface.

pub mod memory_store;

#[cfg(feature = "dynamodb")]
pub mod dynamodb_store;

pub use memory_store::InMemoryMovieStore;

#[cfg(feature = "dynamodb")]
pub use dynamodb_store::DynamoDbMovieStore;
