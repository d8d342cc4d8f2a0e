//! MQTT bridge for Prometheus exposition endpoints.
//!
//! Scrapes configured Prometheus endpoints on a fixed interval and
//! republishes metrics as Home-Assistant-discoverable MQTT entities.

use anyhow::Result;
use tokio::signal;
use tracing::info;

use mqtt_bridge_prometheus::args::BridgeArgs;
use mqtt_bridge_prometheus::config::{BridgeConfig, LoggingConfig};
use mqtt_bridge_prometheus::{MetricsBridge, MetricsFetcher, MqttPublisher, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = BridgeArgs::parse_with_default("prometheus.json5");

    // Load and validate configuration
    let config = BridgeConfig::load_from_file(&args.config)?;

    // Initialize logging with optional CLI override
    let log_config = match &args.log_level {
        Some(level) => LoggingConfig {
            level: level.clone(),
            ..config.logging.clone()
        },
        None => config.logging.clone(),
    };
    init_tracing(&log_config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Prometheus-to-MQTT bridge"
    );

    // Connect to the broker; a refused connection is fatal at startup
    let publisher = MqttPublisher::connect(&config.mqtt).await?;
    info!(
        "Connected to MQTT broker {}:{}",
        config.mqtt.broker, config.mqtt.port
    );

    let fetcher = MetricsFetcher::new(config.fetch_timeout())?;

    // Spawn the sweep loop and run until Ctrl+C
    let bridge = MetricsBridge::new(&config, fetcher, publisher);
    let worker = tokio::spawn(bridge.run());

    signal::ctrl_c().await?;
    info!("Received shutdown signal");
    worker.abort();

    Ok(())
}
