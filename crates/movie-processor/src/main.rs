//! # Movie Processor
//!
//! Binary entry point for the queue consumer.
//!
//! Loads layered configuration, builds the SQS provider and the configured
//! creator, then runs receive cycles until SIGINT or SIGTERM.

use anyhow::Context as _;
use movie_processor::{
    HttpMovieCreator, MovieCreator, MovieQueueConsumer, ProcessorConfig, ServiceMovieCreator,
    Target, LEGACY_VARIABLES,
};
use movie_queue::{AwsSqsProvider, QueueProvider};
use movies_core::{
    adapters::DynamoDbMovieStore, environment, init_logging, settings, shutdown, LoggingConfig,
    MovieService, MovieServiceConfig, Telemetry,
};
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_LOG_DIRECTIVES: &str = "movie_processor=info,movie_queue=info,movies_core=info";

#[tokio::main]
async fn main() {
    let loaded = load_config();

    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    if let Err(e) = init_logging(&logging, DEFAULT_LOG_DIRECTIVES) {
        eprintln!("{}", e);
    }

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(error = ?e, "Processor configuration is invalid; aborting");
            std::process::exit(3);
        }
    };

    if let Err(e) = run(config).await {
        error!(error = ?e, "Movie processor stopped with an error");
        std::process::exit(1);
    }
}

fn load_config() -> anyhow::Result<ProcessorConfig> {
    let raw = settings::load_layered("processor", LEGACY_VARIABLES)
        .context("failed to load configuration")?;

    let mut config: ProcessorConfig = raw
        .try_deserialize()
        .context("failed to deserialize configuration")?;

    config.telemetry.service_name = environment::service_name(&config.telemetry.service_name);
    config.validate()?;

    Ok(config)
}

async fn run(config: ProcessorConfig) -> anyhow::Result<()> {
    let telemetry = Telemetry::new(&config.telemetry)?;
    info!(service_name = %telemetry.service_name(), "Starting movie processor");

    let queue = config.queue.queue_name()?;
    let provider = build_queue(&config).await?;
    let creator = build_creator(&config, telemetry.clone()).await?;

    let consumer = MovieQueueConsumer::new(
        provider,
        queue,
        creator,
        telemetry.clone(),
        config.consumer_settings(),
    );

    consumer.run_until(shutdown::signal()).await;

    if let Err(e) = telemetry.shutdown() {
        warn!(error = %e, "Failed to flush spans on shutdown");
    }

    Ok(())
}

/// Build the SQS provider for the configured queue
async fn build_queue(config: &ProcessorConfig) -> anyhow::Result<Arc<dyn QueueProvider>> {
    let queue = config.queue.queue_name()?;
    let provider = AwsSqsProvider::new(config.queue.provider_config()).await;

    let provider = match config.queue.queue_url() {
        Some(url) => {
            info!(queue = %queue, url = %url, "Using configured queue URL");
            provider.with_queue_url(queue, url).await
        }
        None => {
            let url = provider
                .queue_url(&queue)
                .await
                .with_context(|| format!("failed to resolve queue '{}'", queue))?;
            info!(queue = %queue, url = %url, "Resolved queue URL");
            provider
        }
    };

    Ok(Arc::new(provider))
}

/// Build the creator selected by the configured target
async fn build_creator(
    config: &ProcessorConfig,
    telemetry: Telemetry,
) -> anyhow::Result<Arc<dyn MovieCreator>> {
    match config.target.resolve()? {
        Target::Endpoint { url } => {
            info!(url = %url, "Creating movies through the ingestion endpoint");
            let creator = HttpMovieCreator::new(url, config.request_timeout(), telemetry)?;
            Ok(Arc::new(creator))
        }
        Target::Table { name } => {
            info!(table_name = %name, "Creating movies directly in the record store");
            let store = DynamoDbMovieStore::new(config.queue.region.clone(), name, None).await;
            let service = MovieService::with_config(
                Arc::new(store),
                telemetry,
                MovieServiceConfig {
                    store_timeout: config.request_timeout(),
                },
            );
            Ok(Arc::new(ServiceMovieCreator::new(Arc::new(service))))
        }
    }
}
