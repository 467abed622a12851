//! Common test utilities for the movies integration tests
//!
//! Starts the real HTTP service on an ephemeral port backed by an in-memory
//! store, and builds queue consumers that talk to it.

#![allow(dead_code)]

use movie_processor::{ConsumerSettings, HttpMovieCreator, MovieQueueConsumer};
use movie_queue::{InMemoryProvider, Message, QueueName, QueueProvider};
use movies_api::{build_service, serve, AppState, ServiceConfig};
use movies_core::adapters::InMemoryMovieStore;
use movies_core::Telemetry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// ============================================================================
// Test Server
// ============================================================================

/// Movies HTTP service running on `127.0.0.1` with an in-memory store
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: InMemoryMovieStore,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server with default configuration
    pub async fn start() -> Self {
        Self::start_with(ServiceConfig::default()).await
    }

    /// Start a server with the given configuration; host and port are
    /// ignored in favour of an ephemeral local port
    pub async fn start_with(config: ServiceConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind ephemeral port");
        let addr = listener.local_addr().expect("listener should have address");

        let store = InMemoryMovieStore::new();
        let telemetry = Telemetry::disabled();
        let service = build_service(&config, Arc::new(store.clone()), telemetry.clone());
        let state = AppState::new(config, Arc::new(service), telemetry);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            serve(listener, state, shutdown)
                .await
                .expect("server should run cleanly");
        });

        Self {
            addr,
            store,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// URL for `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stop accepting requests and wait for the server task
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.expect("server task should not panic");
        }
    }
}

// ============================================================================
// Queue Helpers
// ============================================================================

pub fn queue_name() -> QueueName {
    QueueName::new("movies-ingest").expect("valid queue name")
}

/// Enqueue a raw message body
pub async fn enqueue(provider: &InMemoryProvider, body: &str) {
    provider
        .send_message(&queue_name(), &Message::new(body.to_string()))
        .await
        .expect("send should succeed");
}

/// Consumer posting to `url` with a short long-poll wait
pub fn consumer_for(provider: InMemoryProvider, url: String) -> MovieQueueConsumer {
    let telemetry = Telemetry::disabled();
    let creator = HttpMovieCreator::new(url, Duration::from_secs(5), telemetry.clone())
        .expect("creator should build");

    MovieQueueConsumer::new(
        Arc::new(provider),
        queue_name(),
        Arc::new(creator),
        telemetry,
        ConsumerSettings {
            max_messages: 10,
            wait_time: Duration::from_millis(100),
            max_concurrency: 2,
            error_pause: Duration::from_millis(50),
        },
    )
}
