//! Provider types and configuration.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest visibility timeout SQS accepts (12 hours)
const MAX_SQS_VISIBILITY_TIMEOUT_SECONDS: u32 = 43_200;

/// Enumeration of supported queue providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    AwsSqs,
    InMemory,
}

impl ProviderType {
    /// Get maximum message body size for provider
    pub fn max_message_size(&self) -> usize {
        match self {
            Self::AwsSqs => 256 * 1024,         // 256KB
            Self::InMemory => 10 * 1024 * 1024, // 10MB
        }
    }

    /// Get maximum number of messages a single receive may return
    pub fn max_batch_size(&self) -> u32 {
        match self {
            Self::AwsSqs => 10,
            Self::InMemory => 100,
        }
    }

    /// Get the longest long-poll wait the provider honours
    pub fn max_wait_time(&self) -> Duration {
        match self {
            Self::AwsSqs => Duration::from_secs(20),
            Self::InMemory => Duration::from_secs(20),
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwsSqs => write!(f, "AwsSqs"),
            Self::InMemory => write!(f, "InMemory"),
        }
    }
}

/// Provider-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderConfig {
    AwsSqs(AwsSqsConfig),
    InMemory(InMemoryConfig),
}

impl ProviderConfig {
    /// Check the configuration before a provider is built
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Missing`] for an empty region or
    /// endpoint override, and [`ConfigurationError::Invalid`] for limits the
    /// provider cannot honour.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::AwsSqs(config) => {
                if config.region.as_deref().is_some_and(|r| r.trim().is_empty()) {
                    return Err(ConfigurationError::Missing {
                        key: "region".to_string(),
                    });
                }
                if config.endpoint_url.as_deref().is_some_and(|u| u.trim().is_empty()) {
                    return Err(ConfigurationError::Missing {
                        key: "endpoint_url".to_string(),
                    });
                }
                if let Some(seconds) = config.visibility_timeout_seconds {
                    if seconds > MAX_SQS_VISIBILITY_TIMEOUT_SECONDS {
                        return Err(ConfigurationError::Invalid {
                            message: format!(
                                "visibility_timeout_seconds must be at most {}, got {}",
                                MAX_SQS_VISIBILITY_TIMEOUT_SECONDS, seconds
                            ),
                        });
                    }
                }
            }
            Self::InMemory(config) => {
                if config.max_queue_size == 0 {
                    return Err(ConfigurationError::Invalid {
                        message: "max_queue_size must be greater than zero".to_string(),
                    });
                }
                if config.visibility_timeout_seconds == 0 {
                    return Err(ConfigurationError::Invalid {
                        message: "visibility_timeout_seconds must be greater than zero"
                            .to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// AWS SQS configuration
///
/// Credentials come from the default AWS provider chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSqsConfig {
    /// Region; the SDK default chain is used when unset
    pub region: Option<String>,

    /// Endpoint override for LocalStack or ElasticMQ
    pub endpoint_url: Option<String>,

    /// Visibility timeout applied on receive; the queue default when unset
    pub visibility_timeout_seconds: Option<u32>,
}

/// In-memory provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryConfig {
    /// Maximum messages held per queue, visible and in flight together
    pub max_queue_size: usize,

    /// How long a received message stays hidden before redelivery
    pub visibility_timeout_seconds: u64,
}

impl InMemoryConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10000,
            visibility_timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
