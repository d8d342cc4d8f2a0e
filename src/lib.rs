//! MQTT bridge for Prometheus exposition endpoints.
//!
//! Scrapes one or more Prometheus text-format endpoints on a fixed
//! interval and republishes every metric as a Home-Assistant-discoverable
//! MQTT entity:
//!
//! - [`exposition`] - text-exposition parser (HELP/TYPE metadata + samples)
//! - [`entity`] - entity identifier sanitization and display naming
//! - [`discovery`] - Home Assistant discovery payloads
//! - [`fetch`] - HTTP fetcher for exposition endpoints
//! - [`mqtt`] - MQTT transport with per-call delivery modes
//! - [`bridge`] - the sweep engine and poll loop
//! - [`config`] - JSON5 configuration
//! - [`error`] - error types

pub mod args;
pub mod bridge;
pub mod config;
pub mod discovery;
pub mod entity;
pub mod error;
pub mod exposition;
pub mod fetch;
pub mod mqtt;

// Re-export commonly used types at the crate root
pub use bridge::{MetricsBridge, PublishedSet};
pub use config::{BridgeConfig, LogFormat, LoggingConfig};
pub use error::{BridgeError, Result};
pub use fetch::MetricsFetcher;
pub use mqtt::{Delivery, MqttPublisher};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| BridgeError::Logging(e.to_string()))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| BridgeError::Logging(e.to_string()))?;
        }
    }

    Ok(())
}
