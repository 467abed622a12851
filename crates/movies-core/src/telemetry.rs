//! # Telemetry
//!
//! Explicitly constructed OpenTelemetry tracing for the record service and
//! the queue consumer.
//!
//! A [`Telemetry`] owns its tracer provider, tracer and trace-context
//! propagator. Nothing is registered globally: components that emit spans
//! receive a `Telemetry` value at construction time.

use opentelemetry::{
    propagation::{Extractor, Injector, TextMapPropagator},
    trace::TracerProvider as _,
    Context,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracer, SdkTracerProvider},
    Resource,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;

// ============================================================================
// Configuration
// ============================================================================

/// OpenTelemetry configuration for distributed tracing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name reported on every span
    pub service_name: String,

    /// OTLP/HTTP collector endpoint; spans are not exported when unset
    pub otlp_endpoint: Option<String>,

    /// Trace sampling ratio for root spans (0.0 to 1.0)
    pub sampling_ratio: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "movies".to_string(),
            otlp_endpoint: None,
            sampling_ratio: 1.0,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,

    /// Emit JSON formatted log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Telemetry setup errors
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Invalid telemetry configuration: {message}")]
    Invalid { message: String },

    #[error("Failed to build span exporter: {message}")]
    Exporter { message: String },

    #[error("Failed to shut down tracer provider: {message}")]
    Shutdown { message: String },

    #[error("Failed to install log subscriber: {message}")]
    Subscriber { message: String },
}

// ============================================================================
// Logging
// ============================================================================

/// Install the process-wide log subscriber
///
/// `RUST_LOG` takes precedence. Otherwise `default_directives` is used with
/// `config.level` appended as the fallback level for other targets.
pub fn init_logging(config: &LoggingConfig, default_directives: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},{}", config.level, default_directives))
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| TelemetryError::Subscriber {
        message: e.to_string(),
    })
}

// ============================================================================
// Telemetry
// ============================================================================

/// Tracer, provider and propagator bundle
#[derive(Clone)]
pub struct Telemetry {
    provider: SdkTracerProvider,
    tracer: SdkTracer,
    propagator: TraceContextPropagator,
    service_name: String,
}

impl Telemetry {
    /// Build telemetry from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the sampling ratio is outside `0.0..=1.0` or the OTLP
    /// exporter cannot be created.
    pub fn new(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        if !(0.0..=1.0).contains(&config.sampling_ratio) {
            return Err(TelemetryError::Invalid {
                message: format!(
                    "sampling_ratio must be between 0.0 and 1.0, got {}",
                    config.sampling_ratio
                ),
            });
        }

        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .build();

        let mut builder = SdkTracerProvider::builder()
            .with_resource(resource)
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                config.sampling_ratio,
            ))));

        if let Some(endpoint) = &config.otlp_endpoint {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint.clone())
                .build()
                .map_err(|e| TelemetryError::Exporter {
                    message: e.to_string(),
                })?;
            builder = builder.with_batch_exporter(exporter);
        }

        Ok(Self::with_provider(
            builder.build(),
            config.service_name.clone(),
        ))
    }

    /// Telemetry that records spans but never exports them
    pub fn disabled() -> Self {
        Self::with_provider(SdkTracerProvider::builder().build(), "movies".to_string())
    }

    /// Wrap an already built tracer provider
    ///
    /// Used when spans go to an exporter chosen by the caller, such as an
    /// in-memory exporter in tests.
    pub fn with_provider(provider: SdkTracerProvider, service_name: impl Into<String>) -> Self {
        let service_name = service_name.into();
        let tracer = provider.tracer(service_name.clone());
        Self {
            provider,
            tracer,
            propagator: TraceContextPropagator::new(),
            service_name,
        }
    }

    /// Tracer used to start spans
    pub fn tracer(&self) -> &SdkTracer {
        &self.tracer
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Write the W3C `traceparent` for the span in `cx` into `headers`
    pub fn inject_context(&self, cx: &Context, headers: &mut http::HeaderMap) {
        self.propagator
            .inject_context(cx, &mut HeaderInjector(headers));
    }

    /// Read the caller's trace context from `headers`
    ///
    /// Returns an empty context when the headers carry no valid
    /// `traceparent`.
    pub fn extract_context(&self, headers: &http::HeaderMap) -> Context {
        self.propagator
            .extract_with_context(&Context::new(), &HeaderExtractor(headers))
    }

    /// Flush pending spans and stop the exporter
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        self.provider
            .shutdown()
            .map_err(|e| TelemetryError::Shutdown {
                message: e.to_string(),
            })
    }
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Header Carriers
// ============================================================================

struct HeaderInjector<'a>(&'a mut http::HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let name = http::header::HeaderName::from_bytes(key.as_bytes());
        let value = http::HeaderValue::from_str(&value);
        if let (Ok(name), Ok(value)) = (name, value) {
            self.0.insert(name, value);
        }
    }
}

struct HeaderExtractor<'a>(&'a http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}
