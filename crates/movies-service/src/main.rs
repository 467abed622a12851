//! # Movies Service
//!
//! Binary entry point for the movies HTTP service.
//!
//! This executable:
//! - Loads layered configuration from files and the environment
//! - Initializes logging and tracing
//! - Builds the record store and record service
//! - Starts the HTTP server from movies-api
//!
//! Exit codes: `1` bind failure, `2` server failure, `3` configuration or
//! telemetry failure.

use movies_api::{build_service, build_store, start_server, ServiceConfig, ServiceError};
use movies_core::{environment, init_logging, settings, LoggingConfig, Telemetry};
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_LOG_DIRECTIVES: &str =
    "movies_service=info,movies_api=info,movies_core=info,tower_http=debug";

#[tokio::main]
async fn main() {
    let loaded = load_config();

    // Logging comes up before the configuration is checked so that a broken
    // configuration is still reported.
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    if let Err(e) = init_logging(&logging, DEFAULT_LOG_DIRECTIVES) {
        eprintln!("{}", e);
    }

    info!("Starting movies service");

    let exit_code = match loaded {
        Ok(config) => match run(config).await {
            Ok(()) => 0,
            Err(e) => {
                error!(error = %e, "Movies service stopped with an error");
                e.exit_code()
            }
        },
        Err(e) => {
            error!(error = %e, "Service configuration is invalid; aborting");
            e.exit_code()
        }
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Load and validate the service configuration
fn load_config() -> Result<ServiceConfig, ServiceError> {
    let raw = settings::load_layered("service", movies_api::LEGACY_VARIABLES)
        .map_err(movies_api::ConfigError::from)?;

    let mut config: ServiceConfig = raw
        .try_deserialize()
        .map_err(movies_api::ConfigError::from)?;

    config.telemetry.service_name = environment::service_name(&config.telemetry.service_name);
    config.validate()?;

    Ok(config)
}

async fn run(config: ServiceConfig) -> Result<(), ServiceError> {
    let telemetry = Telemetry::new(&config.telemetry)?;
    info!(
        service_name = %telemetry.service_name(),
        exporting = config.telemetry.otlp_endpoint.is_some(),
        "Telemetry initialized"
    );

    let store = build_store(&config.store).await?;
    let service = Arc::new(build_service(&config, store, telemetry.clone()));

    info!(
        host = %config.server.host,
        port = config.server.port,
        movie_route = %config.server.movie_route(),
        "Starting HTTP server"
    );

    let result = start_server(config, service, telemetry.clone()).await;

    if let Err(e) = telemetry.shutdown() {
        warn!(error = %e, "Failed to flush spans on shutdown");
    }

    result
}
