//! # Movie Processor
//!
//! Queue-driven ingestion for the movies record service.
//!
//! The processor long-polls a queue for `{title, year}` creation requests,
//! hands each one to a [`MovieCreator`] and deletes the message only after
//! the movie was created. Failed messages stay in the queue and come back
//! once their visibility timeout lapses.
//!
//! ## Module Organization
//!
//! - [`config`] - Layered processor configuration
//! - [`creator`] - HTTP and in-process creators
//! - [`consumer`] - The receive loop
//! - [`error`] - Error types

pub mod config;
pub mod consumer;
pub mod creator;
pub mod error;

pub use config::{ProcessorConfig, Target, LEGACY_VARIABLES};
pub use consumer::{ConsumerSettings, CycleReport, MovieQueueConsumer};
pub use creator::{HttpMovieCreator, MovieCreator, ServiceMovieCreator};
pub use error::{ConfigError, CreateError, ProcessError};
