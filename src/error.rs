//! Error types for the bridge.

use thiserror::Error;

/// Result type alias using [`BridgeError`].
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur in the bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// MQTT broker connection error.
    #[error("MQTT connection error: {0}")]
    MqttConnection(String),

    /// The broker did not accept the connection within the bounded wait.
    #[error("MQTT connection timed out")]
    MqttConnectTimeout,

    /// HTTP client construction error.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// HTTP fetch failed (transport-level).
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// HTTP fetch returned a non-200 status.
    #[error("Failed to fetch {url}: status code {status}")]
    FetchStatus { url: String, status: u16 },

    /// MQTT publish error.
    #[error("Failed to publish to {topic}: {message}")]
    Publish { topic: String, message: String },

    /// A confirmed publish was not acknowledged within the bounded wait.
    #[error("Publish to {topic} not acknowledged in time")]
    AckTimeout { topic: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Logging initialization error.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Create an MQTT connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::MqttConnection(msg.into())
    }

    /// Create a transport-level fetch error.
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a publish error.
    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }
}
