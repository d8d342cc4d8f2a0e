//! The sweep engine: fetch, parse, and republish on a fixed interval.
//!
//! One sequential worker drives everything. Each sweep processes every
//! configured source in order, one source fully before the next; within a
//! source, discovery is gated by the published-config cache while state is
//! published for every sample unconditionally.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{BridgeConfig, DiscoverySettings, SourceConfig};
use crate::discovery;
use crate::entity;
use crate::exposition::{self, MetricMetadata};
use crate::fetch::MetricsFetcher;
use crate::mqtt::{Delivery, MqttPublisher};

/// Entity identifiers whose discovery config has been published and
/// acknowledged during this process's lifetime.
///
/// Empty at startup, entries are added only after the broker acknowledges
/// the discovery publish, and never removed. A failed or timed-out publish
/// leaves the identifier unmarked so the next cycle retries.
#[derive(Debug, Default)]
pub struct PublishedSet {
    entries: HashSet<String>,
}

impl PublishedSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether discovery for this entity has already been acknowledged.
    pub fn contains(&self, entity_id: &str) -> bool {
        self.entries.contains(entity_id)
    }

    /// Record an acknowledged discovery publish.
    pub fn mark(&mut self, entity_id: &str) {
        self.entries.insert(entity_id.to_string());
    }

    /// Number of entities with published discovery.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no discovery has been published yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether discovery must be attempted for an entity this cycle: not yet
/// acknowledged, and the scrape declared metadata for the metric.
pub fn discovery_due(
    published: &PublishedSet,
    metadata: &HashMap<String, MetricMetadata>,
    metric: &str,
    entity_id: &str,
) -> bool {
    !published.contains(entity_id) && metadata.contains_key(metric)
}

/// Per-source publish counters for one cycle.
#[derive(Debug, Clone, Copy, Default)]
struct SourceStats {
    states_published: usize,
    config_attempts: usize,
    config_published: usize,
}

/// The metrics-to-MQTT bridge.
pub struct MetricsBridge {
    sources: Vec<SourceConfig>,
    client_id: String,
    settings: DiscoverySettings,
    interval: Duration,
    fetcher: MetricsFetcher,
    publisher: MqttPublisher,
    published: PublishedSet,
}

impl MetricsBridge {
    /// Create a bridge over an established publisher.
    pub fn new(config: &BridgeConfig, fetcher: MetricsFetcher, publisher: MqttPublisher) -> Self {
        Self {
            sources: config.sources.clone(),
            client_id: config.mqtt.client_id.clone(),
            settings: config.discovery.clone(),
            interval: config.fetch_interval(),
            fetcher,
            publisher,
            published: PublishedSet::new(),
        }
    }

    /// Run the poll loop forever.
    ///
    /// The first sweep runs immediately; afterwards sweeps repeat on the
    /// fixed interval. A sweep that overruns the interval delays the next
    /// one instead of overlapping it.
    pub async fn run(mut self) {
        info!(
            "Starting poll loop ({} sources, interval: {}s)",
            self.sources.len(),
            self.interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    /// One full pass over all configured sources, sequentially.
    async fn sweep(&mut self) {
        for source in self.sources.clone() {
            self.process_source(&source).await;
        }
    }

    /// Fetch, parse, and republish one source. A fetch failure skips only
    /// this source's cycle; nothing here is fatal.
    async fn process_source(&mut self, source: &SourceConfig) {
        info!("Scraping {} ({})", source.url, source.label);

        let body = match self.fetcher.fetch(&source.url).await {
            Ok(body) => body,
            Err(e) => {
                error!("Error fetching metrics: {}", e);
                return;
            }
        };

        let scrape = exposition::parse(&body);
        let mut stats = SourceStats::default();

        for sample in &scrape.samples {
            let entity_id = entity::entity_id(&source.label, &sample.metric);

            self.maybe_publish_discovery(
                &sample.metric,
                &entity_id,
                &source.label,
                &scrape.metadata,
                &mut stats,
            )
            .await;

            let topic = self.publisher.state_topic(&entity_id);
            match self
                .publisher
                .publish(&topic, sample.value.clone().into_bytes(), Delivery::BestEffort)
                .await
            {
                Ok(()) => {
                    stats.states_published += 1;
                    debug!("Published {} = {}", topic, sample.value);
                }
                Err(e) => warn!("Failed to publish state for {}: {}", sample.metric, e),
            }
        }

        info!(
            "Source {}: published {} states, {}/{} configs, skipped {} comment/blank and {} malformed lines",
            source.label,
            stats.states_published,
            stats.config_published,
            stats.config_attempts,
            scrape.stats.comments_or_blank,
            scrape.stats.malformed,
        );
    }

    /// Publish discovery config for an entity at most once per process run.
    ///
    /// Skipped when already acknowledged or when the scrape carried no
    /// metadata for the metric (the sample still publishes as state). The
    /// cache is marked only after the broker acknowledges the publish, so
    /// failures and timeouts retry on the next cycle.
    async fn maybe_publish_discovery(
        &mut self,
        metric: &str,
        entity_id: &str,
        source_label: &str,
        metadata: &HashMap<String, MetricMetadata>,
        stats: &mut SourceStats,
    ) {
        if !discovery_due(&self.published, metadata, metric, entity_id) {
            return;
        }
        let Some(info) = metadata.get(metric) else {
            return;
        };

        stats.config_attempts += 1;

        let payload = discovery::build_payload(
            metric,
            info,
            source_label,
            self.publisher.state_topic(entity_id),
            &self.client_id,
            &self.settings,
        );
        let bytes = match serde_json::to_vec(&payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize discovery config for {}: {}", metric, e);
                return;
            }
        };

        let topic = self.publisher.config_topic(entity_id);
        match self.publisher.publish(&topic, bytes, Delivery::Confirmed).await {
            Ok(()) => {
                self.published.mark(entity_id);
                stats.config_published += 1;
                debug!("Published discovery config for {}", entity_id);
            }
            Err(e) => warn!("Failed to publish discovery config for {}: {}", metric, e),
        }
    }
}
