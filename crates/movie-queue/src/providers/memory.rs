//! In-memory queue provider implementation for testing and development.
//!
//! This module provides an in-memory queue that:
//! - Hides received messages for a visibility timeout
//! - Redelivers messages that are abandoned or not completed in time
//! - Tracks delivery counts
//! - Wakes long-polling receivers as soon as a message is sent
//!
//! Visibility deadlines use `tokio::time`, so tests may drive them with a
//! paused clock.

use crate::client::{check_batch_size, check_message_size, QueueProvider};
use crate::error::QueueError;
use crate::message::{Message, MessageId, QueueName, ReceiptHandle, ReceivedMessage, Timestamp};
use crate::provider::{InMemoryConfig, ProviderType};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, trace};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// A message stored in the queue with metadata
#[derive(Clone)]
struct StoredMessage {
    message_id: MessageId,
    body: Bytes,
    attributes: HashMap<String, String>,
    delivery_count: u32,
}

/// A message currently hidden from receivers
struct InFlightMessage {
    message: StoredMessage,
    visible_at: Instant,
}

/// Internal queue state for a single queue
#[derive(Default)]
struct InMemoryQueue {
    /// Visible messages in FIFO order
    ready: VecDeque<StoredMessage>,
    /// Received messages keyed by receipt token
    in_flight: HashMap<String, InFlightMessage>,
}

impl InMemoryQueue {
    fn len(&self) -> usize {
        self.ready.len() + self.in_flight.len()
    }

    /// Return messages whose visibility timeout has lapsed to the ready list
    fn release_expired(&mut self, now: Instant) {
        let mut expired: Vec<(String, Instant)> = self
            .in_flight
            .iter()
            .filter(|(_, entry)| entry.visible_at <= now)
            .map(|(token, entry)| (token.clone(), entry.visible_at))
            .collect();
        expired.sort_by_key(|(_, visible_at)| *visible_at);

        for (token, _) in expired {
            if let Some(entry) = self.in_flight.remove(&token) {
                trace!(message_id = %entry.message.message_id, "Visibility timeout lapsed");
                self.ready.push_back(entry.message);
            }
        }
    }

    fn next_visibility_deadline(&self) -> Option<Instant> {
        self.in_flight.values().map(|entry| entry.visible_at).min()
    }
}

// ============================================================================
// InMemoryProvider
// ============================================================================

/// In-memory queue provider implementation
///
/// Clones share the same queues.
#[derive(Clone)]
pub struct InMemoryProvider {
    queues: Arc<Mutex<HashMap<QueueName, InMemoryQueue>>>,
    arrivals: Arc<Notify>,
    config: InMemoryConfig,
}

impl InMemoryProvider {
    /// Create new in-memory provider with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            arrivals: Arc::new(Notify::new()),
            config,
        }
    }

    /// Number of messages currently visible to receivers
    pub async fn visible_count(&self, queue: &QueueName) -> usize {
        let mut queues = self.queues.lock().await;
        match queues.get_mut(queue) {
            Some(state) => {
                state.release_expired(Instant::now());
                state.ready.len()
            }
            None => 0,
        }
    }

    /// Number of received messages that are neither completed nor released
    pub async fn in_flight_count(&self, queue: &QueueName) -> usize {
        let mut queues = self.queues.lock().await;
        match queues.get_mut(queue) {
            Some(state) => {
                state.release_expired(Instant::now());
                state.in_flight.len()
            }
            None => 0,
        }
    }

    /// Total messages held for the queue, visible or in flight
    pub async fn message_count(&self, queue: &QueueName) -> usize {
        let queues = self.queues.lock().await;
        queues.get(queue).map(InMemoryQueue::len).unwrap_or(0)
    }

    /// Take up to `max_messages` visible messages, or report when to retry
    async fn try_receive(
        &self,
        queue: &QueueName,
        max_messages: u32,
    ) -> (Vec<ReceivedMessage>, Option<Instant>) {
        let now = Instant::now();
        let visibility = self.config.visibility_timeout();
        let mut queues = self.queues.lock().await;
        let state = queues.entry(queue.clone()).or_default();
        state.release_expired(now);

        let mut received = Vec::new();
        while received.len() < max_messages as usize {
            let Some(mut message) = state.ready.pop_front() else {
                break;
            };
            message.delivery_count += 1;

            let token = uuid::Uuid::new_v4().to_string();
            let receipt = ReceiptHandle::new(
                token.clone(),
                queue.clone(),
                Timestamp::now().plus(visibility),
                ProviderType::InMemory,
            );

            received.push(ReceivedMessage {
                message_id: message.message_id.clone(),
                body: message.body.clone(),
                attributes: message.attributes.clone(),
                receipt_handle: receipt,
                delivery_count: message.delivery_count,
                delivered_at: Timestamp::now(),
            });

            state.in_flight.insert(
                token,
                InFlightMessage {
                    message,
                    visible_at: now + visibility,
                },
            );
        }

        (received, state.next_visibility_deadline())
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl QueueProvider for InMemoryProvider {
    async fn send_message(
        &self,
        queue: &QueueName,
        message: &Message,
    ) -> Result<MessageId, QueueError> {
        check_message_size(ProviderType::InMemory, message)?;

        let message_id = MessageId::new();
        {
            let mut queues = self.queues.lock().await;
            let state = queues.entry(queue.clone()).or_default();

            if state.len() >= self.config.max_queue_size {
                return Err(QueueError::QueueFull {
                    queue_name: queue.to_string(),
                    max_size: self.config.max_queue_size,
                });
            }

            state.ready.push_back(StoredMessage {
                message_id: message_id.clone(),
                body: message.body.clone(),
                attributes: message.attributes.clone(),
                delivery_count: 0,
            });
        }

        debug!(queue = %queue, message_id = %message_id, "Message enqueued");
        self.arrivals.notify_waiters();
        Ok(message_id)
    }

    async fn receive_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        check_batch_size(ProviderType::InMemory, max_messages)?;

        let deadline = Instant::now() + wait.min(ProviderType::InMemory.max_wait_time());

        loop {
            // Register for arrivals before checking so a send between the
            // check and the wait is not missed.
            let arrival = self.arrivals.notified();

            let (received, next_visible) = self.try_receive(queue, max_messages).await;
            if !received.is_empty() {
                debug!(queue = %queue, count = received.len(), "Messages received");
                return Ok(received);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }

            let wake_at = next_visible
                .map(|visible_at| visible_at.min(deadline))
                .unwrap_or(deadline);

            tokio::select! {
                _ = arrival => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn complete_message(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().await;
        let removed = queues
            .get_mut(receipt.queue())
            .and_then(|state| state.in_flight.remove(receipt.handle()));

        match removed {
            Some(entry) => {
                debug!(queue = %receipt.queue(), message_id = %entry.message.message_id, "Message completed");
                Ok(())
            }
            None => Err(QueueError::MessageNotFound {
                receipt: receipt.handle().to_string(),
            }),
        }
    }

    async fn abandon_message(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        {
            let mut queues = self.queues.lock().await;
            let state = queues
                .get_mut(receipt.queue())
                .ok_or_else(|| QueueError::MessageNotFound {
                    receipt: receipt.handle().to_string(),
                })?;

            let entry = state.in_flight.remove(receipt.handle()).ok_or_else(|| {
                QueueError::MessageNotFound {
                    receipt: receipt.handle().to_string(),
                }
            })?;

            debug!(queue = %receipt.queue(), message_id = %entry.message.message_id, "Message abandoned");
            state.ready.push_front(entry.message);
        }

        self.arrivals.notify_waiters();
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}
