//! # Queue Consumer
//!
//! Poll, decode, create, delete.
//!
//! Each receive cycle pulls up to `max_messages` from the queue and hands
//! every message to a [`MovieCreator`]. A message is deleted only after its
//! own create call succeeded. Any failure leaves the message in the queue,
//! where the visibility timeout brings it back for another attempt.
//!
//! Tracing: every cycle is a `recvAndProcess` server span with messaging
//! attributes, and every message a `processMessage` child span.

use crate::creator::MovieCreator;
use crate::error::ProcessError;
use futures::stream::{self, StreamExt};
use movie_queue::{ProviderType, QueueError, QueueName, QueueProvider, ReceivedMessage};
use movies_core::{NewMovie, Telemetry};
use opentelemetry::trace::{Span, SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;

/// Receive loop settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSettings {
    /// Messages requested per receive
    pub max_messages: u32,

    /// Long-poll wait per receive
    pub wait_time: Duration,

    /// Messages from one batch processed at the same time
    pub max_concurrency: usize,

    /// Pause after a failed receive
    pub error_pause: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            max_messages: 1,
            wait_time: Duration::from_secs(20),
            max_concurrency: 1,
            error_pause: Duration::from_secs(1),
        }
    }
}

/// Outcome of one receive cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Messages returned by the queue
    pub received: usize,

    /// Messages created and deleted
    pub acknowledged: usize,

    /// Messages left in the queue for redelivery
    pub failed: usize,
}

/// Long-running consumer for movie creation requests
pub struct MovieQueueConsumer {
    provider: Arc<dyn QueueProvider>,
    queue: QueueName,
    creator: Arc<dyn MovieCreator>,
    telemetry: Telemetry,
    settings: ConsumerSettings,
}

impl MovieQueueConsumer {
    pub fn new(
        provider: Arc<dyn QueueProvider>,
        queue: QueueName,
        creator: Arc<dyn MovieCreator>,
        telemetry: Telemetry,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            provider,
            queue,
            creator,
            telemetry,
            settings,
        }
    }

    pub fn queue(&self) -> &QueueName {
        &self.queue
    }

    pub fn settings(&self) -> &ConsumerSettings {
        &self.settings
    }

    /// Run receive cycles until `shutdown` resolves
    ///
    /// Shutdown interrupts a pending receive but never a batch that is
    /// already being processed. A failed receive is followed by
    /// `error_pause` before the next attempt.
    #[instrument(skip(self, shutdown), fields(queue = %self.queue))]
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            max_messages = self.settings.max_messages,
            wait_seconds = self.settings.wait_time.as_secs(),
            max_concurrency = self.settings.max_concurrency,
            "Starting queue consumer"
        );

        tokio::pin!(shutdown);

        loop {
            let cx = self.start_cycle_span();

            let received = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                received = self.receive(&cx) => received,
            };

            match received {
                Ok(messages) => {
                    let report = self.process_batch(&cx, messages).await;
                    if report.received > 0 {
                        debug!(
                            received = report.received,
                            acknowledged = report.acknowledged,
                            failed = report.failed,
                            "Receive cycle complete"
                        );
                    }
                }
                Err(e) => {
                    error!(error = %e, pause_ms = self.settings.error_pause.as_millis() as u64, "Failed to receive messages");
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.settings.error_pause) => {}
                    }
                }
            }
        }

        info!("Queue consumer stopped");
    }

    /// Run a single receive cycle
    ///
    /// # Errors
    ///
    /// Returns the queue error if the receive itself fails. Per-message
    /// failures are counted in the report instead.
    #[instrument(skip(self), fields(queue = %self.queue))]
    pub async fn receive_and_process(&self) -> Result<CycleReport, QueueError> {
        let cx = self.start_cycle_span();
        let messages = self.receive(&cx).await?;
        Ok(self.process_batch(&cx, messages).await)
    }

    fn start_cycle_span(&self) -> Context {
        let tracer = self.telemetry.tracer();
        let span = tracer
            .span_builder("recvAndProcess")
            .with_kind(SpanKind::Server)
            .with_attributes(vec![
                KeyValue::new("messaging.system", messaging_system(self.provider.provider_type())),
                KeyValue::new("messaging.destination", self.queue.to_string()),
                KeyValue::new("messaging.destination_kind", "queue"),
            ])
            .start(tracer);

        Context::new().with_span(span)
    }

    /// Receive a batch; on failure the cycle span is closed with an error
    async fn receive(&self, cx: &Context) -> Result<Vec<ReceivedMessage>, QueueError> {
        let result = self
            .provider
            .receive_messages(
                &self.queue,
                self.settings.max_messages,
                self.settings.wait_time,
            )
            .await;

        if let Err(e) = &result {
            let span = cx.span();
            span.set_status(Status::error(e.to_string()));
            span.end();
        }

        result
    }

    async fn process_batch(&self, cx: &Context, messages: Vec<ReceivedMessage>) -> CycleReport {
        let mut report = CycleReport {
            received: messages.len(),
            ..CycleReport::default()
        };

        let results: Vec<Result<(), ProcessError>> = stream::iter(messages.iter())
            .map(|message| self.process_message(cx, message))
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        for result in results {
            match result {
                Ok(()) => report.acknowledged += 1,
                Err(_) => report.failed += 1,
            }
        }

        let span = cx.span();
        span.set_attribute(KeyValue::new("messaging.batch.message_count", report.received as i64));
        if report.failed > 0 {
            span.set_status(Status::error(format!(
                "{} of {} messages failed",
                report.failed, report.received
            )));
        }
        span.end();

        report
    }

    async fn process_message(
        &self,
        parent: &Context,
        message: &ReceivedMessage,
    ) -> Result<(), ProcessError> {
        let mut span = self
            .telemetry
            .tracer()
            .start_with_context("processMessage", parent);
        span.set_attribute(KeyValue::new(
            "messaging.message_id",
            message.message_id.to_string(),
        ));
        let cx = parent.with_span(span);

        let result = self.handle_message(&cx, message).await;

        let span = cx.span();
        match &result {
            Ok(()) => {
                debug!(message_id = %message.message_id, "Message processed and deleted");
            }
            Err(e) => {
                span.set_status(Status::error(e.to_string()));
                warn!(
                    message_id = %message.message_id,
                    delivery_count = message.delivery_count,
                    transient = e.is_transient(),
                    error = %e,
                    "Message processing failed; leaving it for redelivery"
                );
            }
        }
        span.end();

        result
    }

    async fn handle_message(
        &self,
        cx: &Context,
        message: &ReceivedMessage,
    ) -> Result<(), ProcessError> {
        let movie: NewMovie = message.body_json().map_err(|e| ProcessError::Decode {
            message: e.to_string(),
        })?;

        self.creator.create_movie(cx, &movie).await?;

        self.provider
            .complete_message(&message.receipt_handle)
            .await
            .map_err(ProcessError::Delete)
    }
}

impl std::fmt::Debug for MovieQueueConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieQueueConsumer")
            .field("queue", &self.queue)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn messaging_system(provider: ProviderType) -> &'static str {
    match provider {
        ProviderType::AwsSqs => "AmazonSQS",
        ProviderType::InMemory => "in-memory",
    }
}
