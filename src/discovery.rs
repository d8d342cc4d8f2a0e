//! Home Assistant MQTT discovery payloads.
//!
//! A discovery payload is a retained message describing an entity to an
//! auto-discovering consumer. It is derived deterministically from the
//! metric, its metadata, the source label, and the MQTT configuration, so
//! republishing it is always idempotent.

use serde::{Deserialize, Serialize};

use crate::config::DiscoverySettings;
use crate::entity::{friendly_name, icon_for, sanitize, title_case};
use crate::exposition::MetricMetadata;

/// Discovery configuration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryPayload {
    /// Entity display name.
    pub name: String,

    /// Topic the entity's state is published on.
    pub state_topic: String,

    /// Unique id, namespaced by client id, source and metric.
    pub unique_id: String,

    /// Owning device description.
    pub device: DeviceInfo,

    /// Always empty: source metrics carry heterogeneous, unknown units.
    /// Omitted from the serialized payload.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit_of_measurement: String,

    /// Icon hint, omitted when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,
}

/// Device block grouping all entities of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

/// Build the discovery payload for one (source, metric) pair.
///
/// One logical device per source: every metric of a source shares the
/// `<client_id>_<source_label>` device identifier.
pub fn build_payload(
    metric: &str,
    metadata: &MetricMetadata,
    source_label: &str,
    state_topic: String,
    client_id: &str,
    settings: &DiscoverySettings,
) -> DiscoveryPayload {
    let source_title = title_case(source_label);
    let friendly = friendly_name(metric, settings.strip_prefix.as_deref());

    DiscoveryPayload {
        name: join_name(&[&settings.name_prefix, &source_title, &friendly]),
        state_topic,
        unique_id: format!("{}_{}_{}", client_id, source_label, sanitize(metric)),
        device: DeviceInfo {
            identifiers: vec![format!("{}_{}", client_id, source_label)],
            name: join_name(&[&settings.name_prefix, &source_title]),
            manufacturer: settings.manufacturer.clone(),
            model: settings.model.clone(),
        },
        unit_of_measurement: String::new(),
        icon: icon_for(metric, &metadata.metric_type).to_string(),
    }
}

/// Join name parts with single spaces, skipping empty parts.
fn join_name(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<&str>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wingbits_settings() -> DiscoverySettings {
        DiscoverySettings {
            strip_prefix: Some("wingbits_".to_string()),
            name_prefix: "Wingbits".to_string(),
            manufacturer: "Wingbits".to_string(),
            model: "Prometheus Forwarder".to_string(),
        }
    }

    fn gauge_metadata() -> MetricMetadata {
        MetricMetadata {
            help: "GPS fix status".to_string(),
            metric_type: "gauge".to_string(),
        }
    }

    #[test]
    fn test_build_payload() {
        let payload = build_payload(
            "wingbits_gps_fix",
            &gauge_metadata(),
            "station1",
            "homeassistant/sensor/station1_wingbits_gps_fix/state".to_string(),
            "wingbits",
            &wingbits_settings(),
        );

        assert_eq!(payload.name, "Wingbits Station1 Gps Fix");
        assert_eq!(
            payload.state_topic,
            "homeassistant/sensor/station1_wingbits_gps_fix/state"
        );
        assert_eq!(payload.unique_id, "wingbits_station1_wingbits_gps_fix");
        assert_eq!(payload.device.identifiers, vec!["wingbits_station1"]);
        assert_eq!(payload.device.name, "Wingbits Station1");
        assert_eq!(payload.device.manufacturer, "Wingbits");
        assert_eq!(payload.device.model, "Prometheus Forwarder");
        assert_eq!(payload.icon, "mdi:gauge");
        assert!(payload.unit_of_measurement.is_empty());
    }

    #[test]
    fn test_payload_is_deterministic() {
        let build = || {
            build_payload(
                "wingbits_frames_total",
                &MetricMetadata {
                    help: String::new(),
                    metric_type: "counter".to_string(),
                },
                "station1",
                "base/station1_wingbits_frames_total/state".to_string(),
                "wingbits",
                &wingbits_settings(),
            )
        };

        assert_eq!(build(), build());
    }

    #[test]
    fn test_empty_unit_is_omitted_from_json() {
        let payload = build_payload(
            "wingbits_gps_fix",
            &gauge_metadata(),
            "station1",
            "base/station1_wingbits_gps_fix/state".to_string(),
            "wingbits",
            &wingbits_settings(),
        );

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("unit_of_measurement").is_none());
        assert_eq!(json["icon"], "mdi:gauge");
        assert_eq!(json["device"]["identifiers"][0], "wingbits_station1");
    }

    #[test]
    fn test_default_settings_have_no_name_prefix() {
        let payload = build_payload(
            "uptime_seconds",
            &gauge_metadata(),
            "feeder",
            "base/feeder_uptime_seconds/state".to_string(),
            "bridge",
            &DiscoverySettings::default(),
        );

        assert_eq!(payload.name, "Feeder Uptime Seconds");
        assert_eq!(payload.device.name, "Feeder");
        assert_eq!(payload.device.manufacturer, "Prometheus");
    }

    #[test]
    fn test_dotted_metric_unique_id_is_sanitized() {
        let payload = build_payload(
            "wingbits.altitude-ft",
            &gauge_metadata(),
            "station1",
            "base/station1_wingbits_altitude_ft/state".to_string(),
            "wingbits",
            &wingbits_settings(),
        );

        assert_eq!(payload.unique_id, "wingbits_station1_wingbits_altitude_ft");
    }
}
