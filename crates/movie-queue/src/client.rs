//! Provider trait and factory for queue operations.

use crate::error::QueueError;
use crate::message::{Message, MessageId, QueueName, ReceiptHandle, ReceivedMessage};
use crate::provider::{ProviderConfig, ProviderType};
use crate::providers::{AwsSqsProvider, InMemoryProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Interface implemented by specific queue providers
#[async_trait]
pub trait QueueProvider: Send + Sync {
    /// Send single message
    async fn send_message(
        &self,
        queue: &QueueName,
        message: &Message,
    ) -> Result<MessageId, QueueError>;

    /// Receive up to `max_messages`, waiting at most `wait` for the first one
    ///
    /// Returns an empty batch when nothing arrives in time. Each returned
    /// message is hidden from other receivers until completed, abandoned or
    /// its visibility timeout lapses.
    async fn receive_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Delete a processed message
    async fn complete_message(&self, receipt: &ReceiptHandle) -> Result<(), QueueError>;

    /// Make a received message visible again immediately
    async fn abandon_message(&self, receipt: &ReceiptHandle) -> Result<(), QueueError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;

    /// Get maximum batch size
    fn max_batch_size(&self) -> u32 {
        self.provider_type().max_batch_size()
    }
}

/// Factory for creating queue providers from configuration
pub struct QueueClientFactory;

impl QueueClientFactory {
    /// Create a provider from configuration
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ConfigurationError`] if the configuration is
    /// rejected by [`ProviderConfig::validate`].
    pub async fn create_provider(
        config: ProviderConfig,
    ) -> Result<Arc<dyn QueueProvider>, QueueError> {
        config.validate()?;

        let provider: Arc<dyn QueueProvider> = match config {
            ProviderConfig::InMemory(in_memory_config) => {
                Arc::new(InMemoryProvider::new(in_memory_config))
            }
            ProviderConfig::AwsSqs(aws_config) => Arc::new(AwsSqsProvider::new(aws_config).await),
        };

        Ok(provider)
    }

    /// Create an in-memory provider with default settings
    pub fn create_test_provider() -> Arc<dyn QueueProvider> {
        Arc::new(InMemoryProvider::default())
    }
}

/// Validate a receive request against provider limits
pub(crate) fn check_batch_size(
    provider_type: ProviderType,
    max_messages: u32,
) -> Result<(), QueueError> {
    let limit = provider_type.max_batch_size();
    if max_messages == 0 || max_messages > limit {
        return Err(QueueError::ValidationError(
            crate::error::ValidationError::OutOfRange {
                field: "max_messages".to_string(),
                message: format!("must be between 1 and {}, got {}", limit, max_messages),
            },
        ));
    }
    Ok(())
}

/// Validate a message body against provider limits
pub(crate) fn check_message_size(
    provider_type: ProviderType,
    message: &Message,
) -> Result<(), QueueError> {
    let max_size = provider_type.max_message_size();
    if message.body.len() > max_size {
        return Err(QueueError::MessageTooLarge {
            size: message.body.len(),
            max_size,
        });
    }
    Ok(())
}
