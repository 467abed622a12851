//! # Movie Queue
//!
//! Queue runtime for the movie ingestion path, with AWS SQS and in-memory
//! providers behind a single [`QueueProvider`] trait.
//!
//! Delivery is at-least-once. A received message stays invisible to other
//! receivers until it is completed (deleted), abandoned (made visible again
//! immediately) or its visibility timeout lapses.
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Message structures and receipt handles
//! - [`provider`] - Provider types and configuration
//! - [`client`] - Provider trait and factory
//! - [`providers`] - In-memory and AWS SQS implementations

pub mod client;
pub mod error;
pub mod message;
pub mod provider;
pub mod providers;

pub use client::{QueueClientFactory, QueueProvider};
pub use error::{ConfigurationError, QueueError, ValidationError};
pub use message::{Message, MessageId, QueueName, ReceiptHandle, ReceivedMessage, Timestamp};
pub use provider::{AwsSqsConfig, InMemoryConfig, ProviderConfig, ProviderType};
pub use providers::{AwsSqsProvider, InMemoryProvider};
