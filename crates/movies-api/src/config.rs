//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use movies_core::settings::LegacyVariable;
use movies_core::{LoggingConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Deployment variables that map onto single service settings
pub const LEGACY_VARIABLES: &[LegacyVariable] = &[LegacyVariable {
    variable: "MOVIES_NAME",
    key: "store.table_name",
}];

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Record store settings
    pub store: StoreConfig,

    /// Distributed tracing
    pub telemetry: TelemetryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for inconsistent values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;

        if !(0.0..=1.0).contains(&self.telemetry.sampling_ratio) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "telemetry.sampling_ratio must be between 0.0 and 1.0, got {}",
                    self.telemetry.sampling_ratio
                ),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Prefix for the movie route, e.g. `/api` serves `/api/movie`
    pub base_path: String,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

impl ServerConfig {
    /// Full path of the movie route
    pub fn movie_route(&self) -> String {
        format!("{}/movie", self.base_path)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must not be 0".to_string(),
            });
        }

        if !self.base_path.is_empty()
            && (!self.base_path.starts_with('/') || self.base_path.ends_with('/'))
        {
            return Err(ConfigError::Invalid {
                message: format!(
                    "server.base_path must start with '/' and must not end with '/', got '{}'",
                    self.base_path
                ),
            });
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "server.request_timeout_seconds must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_path: String::new(),
            shutdown_timeout_seconds: 30,
            request_timeout_seconds: 30,
        }
    }
}

/// Record store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Dynamodb,
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to use; DynamoDB when a table name is set, otherwise memory
    pub backend: Option<StoreBackend>,

    /// DynamoDB table name
    pub table_name: Option<String>,

    /// AWS region; the SDK default chain is used when unset
    pub region: Option<String>,

    /// Endpoint override for DynamoDB Local or LocalStack
    pub endpoint_url: Option<String>,

    /// Deadline for each store call in seconds
    pub timeout_seconds: u64,
}

impl StoreConfig {
    /// Backend after applying the table-name default
    pub fn effective_backend(&self) -> StoreBackend {
        match (self.backend, &self.table_name) {
            (Some(backend), _) => backend,
            (None, Some(table)) if !table.is_empty() => StoreBackend::Dynamodb,
            (None, _) => StoreBackend::Memory,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "store.timeout_seconds must be greater than 0".to_string(),
            });
        }

        if self.effective_backend() == StoreBackend::Dynamodb
            && self.table_name.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Missing {
                key: "store.table_name".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: None,
            table_name: None,
            region: None,
            endpoint_url: None,
            timeout_seconds: 10,
        }
    }
}
