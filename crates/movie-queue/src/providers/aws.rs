//! AWS SQS provider implementation using the AWS SDK.
//!
//! ## Key Features
//!
//! - **Long polling**: receive waits up to 20 seconds for the first message
//! - **Delivery counts**: read from the `ApproximateReceiveCount` system
//!   attribute
//! - **Queue URL caching**: names are resolved once through `GetQueueUrl`,
//!   or a known URL can be registered up front
//! - **Abandon**: resets the visibility timeout to zero so the message is
//!   redelivered immediately
//!
//! Credentials and region come from the default AWS provider chain unless
//! overridden in [`AwsSqsConfig`]. An endpoint override targets LocalStack or
//! ElasticMQ.
//!
//! ## Example
//!
//! ```no_run
//! use movie_queue::{AwsSqsConfig, AwsSqsProvider, QueueName, QueueProvider};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = AwsSqsProvider::new(AwsSqsConfig {
//!     region: Some("us-east-1".to_string()),
//!     ..Default::default()
//! })
//! .await;
//!
//! let queue = QueueName::new("movies-processor")?;
//! for message in provider.receive_messages(&queue, 10, Duration::from_secs(20)).await? {
//!     provider.complete_message(&message.receipt_handle).await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::client::{check_batch_size, check_message_size, QueueProvider};
use crate::error::{QueueError, ValidationError};
use crate::message::{Message, MessageId, QueueName, ReceiptHandle, ReceivedMessage, Timestamp};
use crate::provider::{AwsSqsConfig, ProviderType};
use async_trait::async_trait;
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sqs::types::{Message as SqsMessage, MessageAttributeValue, MessageSystemAttributeName};
use aws_sdk_sqs::Client as SqsClient;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[cfg(test)]
#[path = "aws_tests.rs"]
mod tests;

const PROVIDER_NAME: &str = "AwsSqs";

/// Visibility timeout SQS applies when the queue does not override it
const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// AwsSqsProvider
// ============================================================================

/// AWS SQS queue provider
#[derive(Clone)]
pub struct AwsSqsProvider {
    client: SqsClient,
    config: AwsSqsConfig,
    queue_url_cache: Arc<RwLock<HashMap<QueueName, String>>>,
}

impl AwsSqsProvider {
    /// Create a provider using the default AWS configuration chain
    pub async fn new(config: AwsSqsConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let sdk_config = loader.load().await;
        Self::from_client(SqsClient::new(&sdk_config), config)
    }

    /// Create a provider from an existing SDK client
    pub fn from_client(client: SqsClient, config: AwsSqsConfig) -> Self {
        Self {
            client,
            config,
            queue_url_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a known queue URL so no `GetQueueUrl` call is made
    pub async fn with_queue_url(self, queue: QueueName, url: impl Into<String>) -> Self {
        self.queue_url_cache.write().await.insert(queue, url.into());
        self
    }

    /// Resolve the URL for a queue, consulting the cache first
    pub async fn queue_url(&self, queue: &QueueName) -> Result<String, QueueError> {
        {
            let cache = self.queue_url_cache.read().await;
            if let Some(url) = cache.get(queue) {
                return Ok(url.clone());
            }
        }

        let output = self
            .client
            .get_queue_url()
            .queue_name(queue.as_str())
            .send()
            .await
            .map_err(|e| {
                if let SdkError::ServiceError(context) = &e {
                    if context.err().is_queue_does_not_exist() {
                        return QueueError::QueueNotFound {
                            queue_name: queue.to_string(),
                        };
                    }
                }
                map_sdk_error(e)
            })?;

        let url = output
            .queue_url()
            .ok_or_else(|| QueueError::QueueNotFound {
                queue_name: queue.to_string(),
            })?
            .to_string();

        debug!(queue = %queue, queue_url = %url, "Resolved queue URL");
        self.queue_url_cache
            .write()
            .await
            .insert(queue.clone(), url.clone());

        Ok(url)
    }

    fn visibility_timeout(&self) -> Duration {
        self.config
            .visibility_timeout_seconds
            .map(|seconds| Duration::from_secs(u64::from(seconds)))
            .unwrap_or(DEFAULT_VISIBILITY_TIMEOUT)
    }
}

impl fmt::Debug for AwsSqsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSqsProvider")
            .field("region", &self.config.region)
            .field("endpoint_url", &self.config.endpoint_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl QueueProvider for AwsSqsProvider {
    #[instrument(skip(self, message), fields(queue = %queue))]
    async fn send_message(
        &self,
        queue: &QueueName,
        message: &Message,
    ) -> Result<MessageId, QueueError> {
        check_message_size(ProviderType::AwsSqs, message)?;

        let body = std::str::from_utf8(&message.body).map_err(|_| {
            ValidationError::InvalidFormat {
                field: "body".to_string(),
                message: "SQS message bodies must be valid UTF-8".to_string(),
            }
        })?;

        let url = self.queue_url(queue).await?;
        let mut request = self.client.send_message().queue_url(url).message_body(body);

        for (key, value) in &message.attributes {
            let attribute = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(value)
                .build()
                .map_err(|e| ValidationError::InvalidFormat {
                    field: format!("attributes.{}", key),
                    message: e.to_string(),
                })?;
            request = request.message_attributes(key, attribute);
        }

        let output = request.send().await.map_err(map_sdk_error)?;

        let message_id = output
            .message_id()
            .and_then(|id| id.parse::<MessageId>().ok())
            .unwrap_or_default();

        debug!(message_id = %message_id, "Message sent");
        Ok(message_id)
    }

    #[instrument(skip(self), fields(queue = %queue))]
    async fn receive_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        check_batch_size(ProviderType::AwsSqs, max_messages)?;

        let url = self.queue_url(queue).await?;
        let mut request = self
            .client
            .receive_message()
            .queue_url(url)
            .max_number_of_messages(max_messages as i32)
            .wait_time_seconds(wait_time_seconds(wait))
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .message_attribute_names("All");

        if let Some(seconds) = self.config.visibility_timeout_seconds {
            request = request.visibility_timeout(seconds as i32);
        }

        let output = request.send().await.map_err(map_sdk_error)?;

        let expires_at = Timestamp::now().plus(self.visibility_timeout());
        let received = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|message| to_received_message(message, queue, expires_at))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = received.len(), "Messages received");
        Ok(received)
    }

    #[instrument(skip(self, receipt), fields(queue = %receipt.queue()))]
    async fn complete_message(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let url = self.queue_url(receipt.queue()).await?;

        self.client
            .delete_message()
            .queue_url(url)
            .receipt_handle(receipt.handle())
            .send()
            .await
            .map_err(|e| map_receipt_error(e, receipt))?;

        Ok(())
    }

    #[instrument(skip(self, receipt), fields(queue = %receipt.queue()))]
    async fn abandon_message(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let url = self.queue_url(receipt.queue()).await?;

        self.client
            .change_message_visibility()
            .queue_url(url)
            .receipt_handle(receipt.handle())
            .visibility_timeout(0)
            .send()
            .await
            .map_err(|e| map_receipt_error(e, receipt))?;

        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::AwsSqs
    }
}

// ============================================================================
// Conversions
// ============================================================================

/// Long-poll wait in whole seconds, capped at the SQS maximum
fn wait_time_seconds(wait: Duration) -> i32 {
    wait.min(ProviderType::AwsSqs.max_wait_time()).as_secs() as i32
}

fn to_received_message(
    message: SqsMessage,
    queue: &QueueName,
    expires_at: Timestamp,
) -> Result<ReceivedMessage, QueueError> {
    let receipt = message
        .receipt_handle()
        .ok_or_else(|| QueueError::ProviderError {
            provider: PROVIDER_NAME.to_string(),
            code: "MissingReceiptHandle".to_string(),
            message: "received message has no receipt handle".to_string(),
        })?
        .to_string();

    let message_id = message
        .message_id()
        .and_then(|id| id.parse::<MessageId>().ok())
        .unwrap_or_default();

    let delivery_count = message
        .attributes()
        .and_then(|attributes| attributes.get(&MessageSystemAttributeName::ApproximateReceiveCount))
        .and_then(|count| count.parse::<u32>().ok())
        .unwrap_or(1);

    let attributes = message
        .message_attributes()
        .map(|attributes| {
            attributes
                .iter()
                .filter_map(|(key, value)| {
                    value
                        .string_value()
                        .map(|value| (key.clone(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ReceivedMessage {
        message_id,
        body: Bytes::from(message.body().unwrap_or_default().to_string()),
        attributes,
        receipt_handle: ReceiptHandle::new(receipt, queue.clone(), expires_at, ProviderType::AwsSqs),
        delivery_count,
        delivered_at: Timestamp::now(),
    })
}

// ============================================================================
// Error Mapping
// ============================================================================

fn map_sdk_error<E, R>(error: SdkError<E, R>) -> QueueError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: fmt::Debug,
{
    let message = DisplayErrorContext(&error).to_string();

    match &error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            QueueError::ConnectionFailed { message }
        }
        SdkError::ServiceError(context) => {
            let code = context.err().code().unwrap_or("Unknown").to_string();
            match code.as_str() {
                "AccessDenied"
                | "AccessDeniedException"
                | "InvalidClientTokenId"
                | "SignatureDoesNotMatch"
                | "UnrecognizedClientException" => QueueError::AuthenticationFailed { message },
                _ => QueueError::ProviderError {
                    provider: PROVIDER_NAME.to_string(),
                    code,
                    message,
                },
            }
        }
        _ => QueueError::ProviderError {
            provider: PROVIDER_NAME.to_string(),
            code: "RequestFailed".to_string(),
            message,
        },
    }
}

fn map_receipt_error<E, R>(error: SdkError<E, R>, receipt: &ReceiptHandle) -> QueueError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: fmt::Debug,
{
    if let SdkError::ServiceError(context) = &error {
        if matches!(
            context.err().code(),
            Some("ReceiptHandleIsInvalid") | Some("InvalidParameterValue")
        ) {
            return QueueError::MessageNotFound {
                receipt: receipt.handle().to_string(),
            };
        }
    }
    map_sdk_error(error)
}
