//! Message types and queue identifiers.

use crate::error::ValidationError;
use crate::provider::ProviderType;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Validated queue name
///
/// Follows the SQS naming rules: 1-80 characters of ASCII alphanumerics,
/// hyphens and underscores, with an optional `.fifo` suffix counted in the
/// length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    pub const MAX_LENGTH: usize = 80;
    const FIFO_SUFFIX: &'static str = ".fifo";

    /// Create a queue name
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty, too long or contains characters
    /// other than ASCII alphanumerics, `-` and `_`.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() || name.len() > Self::MAX_LENGTH {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: format!("must be 1-{} characters", Self::MAX_LENGTH),
            });
        }

        let base = name.strip_suffix(Self::FIFO_SUFFIX).unwrap_or(&name);
        if base.is_empty()
            || !base
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only ASCII alphanumeric, hyphens, and underscores allowed".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Derive the queue name from an SQS queue URL
    ///
    /// The name is the last path segment, e.g.
    /// `https://sqs.us-east-1.amazonaws.com/123456789012/movies` gives
    /// `movies`.
    pub fn from_queue_url(url: &str) -> Result<Self, ValidationError> {
        let segment = url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        Self::new(segment)
    }

    pub fn is_fifo(&self) -> bool {
        self.0.ends_with(Self::FIFO_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Unique identifier for a queued message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a random message ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// UTC timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Timestamp `duration` after this one
    pub fn plus(&self, duration: std::time::Duration) -> Self {
        let delta = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
        Self(self.0.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// A message to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub body: Bytes,
    pub attributes: HashMap<String, String>,
}

impl Message {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            attributes: HashMap::new(),
        }
    }

    /// Create a message whose body is the JSON encoding of `payload`
    pub fn from_json<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_vec(payload)?))
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A message handed out by a receive call
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message_id: MessageId,
    pub body: Bytes,
    pub attributes: HashMap<String, String>,
    pub receipt_handle: ReceiptHandle,

    /// Number of times the message has been received, including this one
    pub delivery_count: u32,
    pub delivered_at: Timestamp,
}

impl ReceivedMessage {
    /// Decode the body as JSON
    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn is_redelivery(&self) -> bool {
        self.delivery_count > 1
    }
}

/// Opaque token used to complete or abandon a received message
///
/// Only valid for the receive that produced it. Once the visibility timeout
/// lapses the message may be handed to another receiver with a new handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptHandle {
    handle: String,
    queue: QueueName,
    expires_at: Timestamp,
    provider_type: ProviderType,
}

impl ReceiptHandle {
    pub fn new(
        handle: String,
        queue: QueueName,
        expires_at: Timestamp,
        provider_type: ProviderType,
    ) -> Self {
        Self {
            handle,
            queue,
            expires_at,
            provider_type,
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Queue the message was received from
    pub fn queue(&self) -> &QueueName {
        &self.queue
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Timestamp::now() >= self.expires_at
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
