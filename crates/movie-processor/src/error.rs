//! Error types for the queue consumer.

use movie_queue::QueueError;
use movies_core::MovieError;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

/// Failure to hand a movie to the record service
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    /// The request never produced a response (connect, timeout, body)
    #[error("Create request failed: {message}")]
    Request { message: String },

    /// The endpoint answered with a non-2xx status
    #[error("Create request returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    /// In-process record service failure
    #[error("Record service error: {0}")]
    Service(#[from] MovieError),

    #[error("Invalid creator configuration: {message}")]
    Configuration { message: String },
}

impl CreateError {
    /// Check if a later redelivery of the same message might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { .. } => true,
            Self::BadStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Service(e) => e.is_transient(),
            Self::Configuration { .. } => false,
        }
    }
}

/// Failure processing a single queue message
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Message body is not a `{title, year}` document
    #[error("Failed to decode message body: {message}")]
    Decode { message: String },

    #[error(transparent)]
    Create(#[from] CreateError),

    /// The movie was created but the message could not be deleted
    #[error("Failed to delete message: {0}")]
    Delete(#[source] QueueError),
}

impl ProcessError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Decode { .. } => false,
            Self::Create(e) => e.is_transient(),
            Self::Delete(e) => e.is_transient(),
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
