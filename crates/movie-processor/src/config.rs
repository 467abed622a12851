//! Configuration types for the queue consumer

use crate::consumer::ConsumerSettings;
use crate::error::ConfigError;
use movie_queue::{AwsSqsConfig, QueueName};
use movies_core::settings::LegacyVariable;
use movies_core::{LoggingConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Deployment variables that map onto single processor settings
pub const LEGACY_VARIABLES: &[LegacyVariable] = &[
    LegacyVariable {
        variable: "COPILOT_QUEUE_URI",
        key: "queue.queue_url",
    },
    LegacyVariable {
        variable: "MOVIES_NAME",
        key: "target.movies_table",
    },
];

/// Largest batch a single receive may request
pub const MAX_MESSAGES_LIMIT: u32 = 10;

/// Longest long-poll wait a single receive may request
pub const MAX_WAIT_TIME_SECONDS: u64 = 20;

/// Processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Source queue
    pub queue: QueueConfig,

    /// Receive loop tuning
    pub consumer: ConsumerConfig,

    /// Where decoded movies are sent
    pub target: TargetConfig,

    /// Deadline for each create call, in seconds
    pub request_timeout_seconds: u64,

    /// Distributed tracing
    pub telemetry: TelemetryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            consumer: ConsumerConfig::default(),
            target: TargetConfig::default(),
            request_timeout_seconds: 10,
            telemetry: TelemetryConfig {
                service_name: "movie-processor".to_string(),
                ..TelemetryConfig::default()
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl ProcessorConfig {
    /// Check the configuration for inconsistent values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.queue.queue_name()?;
        self.target.resolve()?;

        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "request_timeout_seconds must be greater than zero".to_string(),
            });
        }

        if self.consumer.max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                message: "consumer.max_concurrency must be greater than zero".to_string(),
            });
        }

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

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Runtime settings for [`crate::MovieQueueConsumer`]
    pub fn consumer_settings(&self) -> ConsumerSettings {
        ConsumerSettings {
            max_messages: self.queue.max_messages(),
            wait_time: self.queue.wait_time(),
            max_concurrency: self.consumer.max_concurrency.max(1),
            error_pause: self.consumer.error_pause(),
        }
    }
}

/// Source queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue name; derived from `queue_url` when unset
    pub queue_name: Option<String>,

    /// Full SQS queue URL, skipping the name lookup when set
    pub queue_url: Option<String>,

    /// AWS region; the SDK default chain is used when unset
    pub region: Option<String>,

    /// Endpoint override for LocalStack or ElasticMQ
    pub endpoint_url: Option<String>,

    /// Messages per receive, clamped to 1..=10
    pub max_messages: u32,

    /// Long-poll wait in seconds, clamped to 0..=20
    pub wait_time_seconds: u64,

    /// Visibility timeout applied on receive; the queue default when unset
    pub visibility_timeout_seconds: Option<u32>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_name: None,
            queue_url: None,
            region: None,
            endpoint_url: None,
            max_messages: 1,
            wait_time_seconds: MAX_WAIT_TIME_SECONDS,
            visibility_timeout_seconds: None,
        }
    }
}

impl QueueConfig {
    /// Name of the source queue
    ///
    /// # Errors
    ///
    /// Returns error if neither a name nor a URL is configured, or the name
    /// is not a valid queue name.
    pub fn queue_name(&self) -> Result<QueueName, ConfigError> {
        let result = match (non_empty(&self.queue_name), non_empty(&self.queue_url)) {
            (Some(name), _) => QueueName::new(name),
            (None, Some(url)) => QueueName::from_queue_url(url),
            (None, None) => {
                return Err(ConfigError::Missing {
                    key: "queue.queue_name or queue.queue_url".to_string(),
                })
            }
        };

        result.map_err(|e| ConfigError::Invalid {
            message: format!("queue name: {}", e),
        })
    }

    /// Configured URL, if any
    pub fn queue_url(&self) -> Option<&str> {
        non_empty(&self.queue_url)
    }

    pub fn max_messages(&self) -> u32 {
        self.max_messages.clamp(1, MAX_MESSAGES_LIMIT)
    }

    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_seconds.min(MAX_WAIT_TIME_SECONDS))
    }

    /// Provider settings for the SQS client
    pub fn provider_config(&self) -> AwsSqsConfig {
        AwsSqsConfig {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            visibility_timeout_seconds: self.visibility_timeout_seconds,
        }
    }
}

/// Receive loop tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Messages from one batch processed at the same time
    pub max_concurrency: usize,

    /// Pause after a failed receive, in milliseconds
    pub error_pause_millis: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            error_pause_millis: 1000,
        }
    }
}

impl ConsumerConfig {
    pub fn error_pause(&self) -> Duration {
        Duration::from_millis(self.error_pause_millis)
    }
}

/// Creation target; exactly one field must be set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Ingestion endpoint URL, e.g. `http://movies:8080/movie`
    pub create_movie_url: Option<String>,

    /// DynamoDB table written to in-process
    pub movies_table: Option<String>,
}

/// Resolved creation target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// POST each movie to the ingestion endpoint
    Endpoint { url: String },

    /// Create each movie in-process against a DynamoDB table
    Table { name: String },
}

impl TargetConfig {
    /// Select the configured target
    ///
    /// # Errors
    ///
    /// Returns error unless exactly one of `create_movie_url` and
    /// `movies_table` is set.
    pub fn resolve(&self) -> Result<Target, ConfigError> {
        match (non_empty(&self.create_movie_url), non_empty(&self.movies_table)) {
            (Some(url), None) => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::Invalid {
                        message: format!("target.create_movie_url must be an HTTP URL, got '{}'", url),
                    });
                }
                Ok(Target::Endpoint {
                    url: url.to_string(),
                })
            }
            (None, Some(name)) => Ok(Target::Table {
                name: name.to_string(),
            }),
            (Some(_), Some(_)) => Err(ConfigError::Invalid {
                message: "set only one of target.create_movie_url and target.movies_table"
                    .to_string(),
            }),
            (None, None) => Err(ConfigError::Missing {
                key: "target.create_movie_url or target.movies_table".to_string(),
            }),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
