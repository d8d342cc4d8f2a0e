//! Configuration for the Prometheus-to-MQTT bridge.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Prometheus exposition endpoints to scrape.
    pub sources: Vec<SourceConfig>,

    /// MQTT broker settings.
    pub mqtt: MqttConfig,

    /// Entity naming and device metadata for discovery payloads.
    #[serde(default)]
    pub discovery: DiscoverySettings,

    /// Scrape interval in seconds (default: 60).
    /// A configured 0 is treated as unset and falls back to the default.
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_secs: u64,

    /// HTTP timeout for one scrape in seconds (default: 30).
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One scrape source: an exposition endpoint and the label naming the
/// device/feed behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Endpoint URL (e.g. "http://192.168.1.10:9100/metrics").
    pub url: String,

    /// Short label identifying this source; becomes part of every entity
    /// identifier derived from its metrics.
    pub label: String,
}

/// MQTT broker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host.
    pub broker: String,

    /// Broker port (default: 1883).
    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Client identifier, also used to namespace unique ids and device
    /// identifiers in discovery payloads.
    pub client_id: String,

    /// Topic prefix, concatenated directly with entity identifiers, so it
    /// carries its own trailing separator (e.g. "homeassistant/sensor/").
    pub topic_base: String,

    /// Username (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Keep-alive interval in seconds (default: 30).
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    30
}

fn default_fetch_interval() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    30
}

/// Naming and device metadata used when building discovery payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// Metric-name prefix stripped before deriving display names
    /// (e.g. "wingbits_").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_prefix: Option<String>,

    /// Prefix prepended to entity and device display names.
    #[serde(default)]
    pub name_prefix: String,

    /// Device manufacturer reported to the discovering consumer.
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,

    /// Device model reported to the discovering consumer.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            strip_prefix: None,
            name_prefix: String::new(),
            manufacturer: default_manufacturer(),
            model: default_model(),
        }
    }
}

fn default_manufacturer() -> String {
    "Prometheus".to_string()
}

fn default_model() -> String {
    "Prometheus Forwarder".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: BridgeConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Validation(
                "no scrape sources configured".to_string(),
            ));
        }

        for (i, source) in self.sources.iter().enumerate() {
            if source.url.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "source {}: url is required",
                    i
                )));
            }
            if source.label.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "source {}: label is required",
                    i
                )));
            }
        }

        if self.mqtt.broker.is_empty() {
            return Err(ConfigError::Validation("mqtt.broker is required".to_string()));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(ConfigError::Validation(
                "mqtt.client_id is required".to_string(),
            ));
        }
        if self.mqtt.topic_base.is_empty() {
            return Err(ConfigError::Validation(
                "mqtt.topic_base is required".to_string(),
            ));
        }

        Ok(())
    }

    /// The effective scrape interval. A configured 0 means unset.
    pub fn fetch_interval(&self) -> Duration {
        let secs = if self.fetch_interval_secs == 0 {
            default_fetch_interval()
        } else {
            self.fetch_interval_secs
        };
        Duration::from_secs(secs)
    }

    /// The effective HTTP timeout for one scrape.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
