//! MQTT transport.
//!
//! Wraps a rumqttc client behind a publisher with an explicit per-call
//! delivery mode. The client's event loop runs on a background task that
//! also forwards publish acknowledgments, so confirmed publishes can wait
//! for the broker within a bound.

use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::MqttConfig;
use crate::error::{BridgeError, Result};

/// Bounded wait for the broker to accept the initial connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded wait for the acknowledgment of a confirmed publish.
const ACK_TIMEOUT: Duration = Duration::from_secs(2);

/// Delivery mode for one publish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// QoS 0, not retained, no acknowledgment wait. Used for state
    /// updates, where the next cycle resends current values anyway.
    BestEffort,
    /// QoS 1, retained, bounded acknowledgment wait. Used for discovery
    /// config, which must survive broker and consumer restarts.
    Confirmed,
}

impl Delivery {
    /// QoS level for this delivery mode.
    pub fn qos(self) -> QoS {
        match self {
            Delivery::BestEffort => QoS::AtMostOnce,
            Delivery::Confirmed => QoS::AtLeastOnce,
        }
    }

    /// Retain flag for this delivery mode.
    pub fn retain(self) -> bool {
        matches!(self, Delivery::Confirmed)
    }
}

/// Build the discovery config topic for an entity.
pub fn config_topic(topic_base: &str, entity_id: &str) -> String {
    format!("{}{}/config", topic_base, entity_id)
}

/// Build the state topic for an entity.
pub fn state_topic(topic_base: &str, entity_id: &str) -> String {
    format!("{}{}/state", topic_base, entity_id)
}

/// Publisher over one MQTT connection.
pub struct MqttPublisher {
    client: AsyncClient,
    topic_base: String,
    acks: Mutex<mpsc::Receiver<u16>>,
    ack_timeout: Duration,
}

impl MqttPublisher {
    /// Connect to the broker.
    ///
    /// Waits for the broker to accept the session before returning; a
    /// refused or unreachable broker is an error, fatal at startup. After
    /// that, the client's own event loop handles keep-alive and reconnects
    /// in the background.
    pub async fn connect(config: &MqttConfig) -> Result<Self> {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker.clone(),
            config.port,
        );
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 64);

        match timeout(CONNECT_TIMEOUT, await_connack(&mut eventloop)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(BridgeError::MqttConnectTimeout),
        }

        let (ack_tx, ack_rx) = mpsc::channel(64);
        tokio::spawn(drive_event_loop(eventloop, ack_tx));

        Ok(Self {
            client,
            topic_base: config.topic_base.clone(),
            acks: Mutex::new(ack_rx),
            ack_timeout: ACK_TIMEOUT,
        })
    }

    /// The configured topic prefix.
    pub fn topic_base(&self) -> &str {
        &self.topic_base
    }

    /// Discovery config topic for an entity under this publisher's prefix.
    pub fn config_topic(&self, entity_id: &str) -> String {
        config_topic(&self.topic_base, entity_id)
    }

    /// State topic for an entity under this publisher's prefix.
    pub fn state_topic(&self, entity_id: &str) -> String {
        state_topic(&self.topic_base, entity_id)
    }

    /// Publish a payload with the given delivery mode.
    ///
    /// Best-effort publishes return as soon as the message is handed to the
    /// client. Confirmed publishes wait for the broker's acknowledgment and
    /// fail after [`ACK_TIMEOUT`].
    pub async fn publish(&self, topic: &str, payload: Vec<u8>, delivery: Delivery) -> Result<()> {
        match delivery {
            Delivery::BestEffort => self
                .client
                .publish(topic, delivery.qos(), delivery.retain(), payload)
                .await
                .map_err(|e| BridgeError::publish(topic, e.to_string())),
            Delivery::Confirmed => {
                let mut acks = self.acks.lock().await;

                // Drop acknowledgments left over from earlier publishes so
                // the wait below observes only this one.
                while acks.try_recv().is_ok() {}

                self.client
                    .publish(topic, delivery.qos(), delivery.retain(), payload)
                    .await
                    .map_err(|e| BridgeError::publish(topic, e.to_string()))?;

                // Publishes run on one sequential path and only confirmed
                // publishes use QoS 1, so the next acknowledgment belongs
                // to the publish just issued.
                match timeout(self.ack_timeout, acks.recv()).await {
                    Ok(Some(_pkid)) => Ok(()),
                    Ok(None) => Err(BridgeError::publish(topic, "event loop terminated")),
                    Err(_) => Err(BridgeError::AckTimeout {
                        topic: topic.to_string(),
                    }),
                }
            }
        }
    }
}

/// Poll until the broker answers the initial CONNECT.
async fn await_connack(eventloop: &mut EventLoop) -> Result<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    return Ok(());
                }
                return Err(BridgeError::connection(format!(
                    "broker refused connection: {:?}",
                    ack.code
                )));
            }
            Ok(_) => {}
            Err(e) => return Err(BridgeError::connection(e.to_string())),
        }
    }
}

/// Drive the client event loop forever, forwarding publish acknowledgments.
async fn drive_event_loop(mut eventloop: EventLoop, acks: mpsc::Sender<u16>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                // Dropped when no confirmed publish is waiting.
                let _ = acks.try_send(ack.pkid);
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Reconnected to MQTT broker");
            }
            Ok(_) => {}
            Err(e) => {
                warn!("MQTT connection error: {}", e);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Publisher round-trips require a live broker; integration tests cover
    // the pure topic and delivery logic.

    #[test]
    fn test_topic_building() {
        assert_eq!(
            config_topic("homeassistant/sensor/", "station1_gps_fix"),
            "homeassistant/sensor/station1_gps_fix/config"
        );
        assert_eq!(
            state_topic("homeassistant/sensor/", "station1_gps_fix"),
            "homeassistant/sensor/station1_gps_fix/state"
        );
    }

    #[test]
    fn test_topic_base_carries_its_own_separator() {
        // The prefix is concatenated verbatim; no separator is inserted.
        assert_eq!(state_topic("base", "x"), "basex/state");
    }

    #[test]
    fn test_delivery_modes() {
        assert_eq!(Delivery::BestEffort.qos(), QoS::AtMostOnce);
        assert!(!Delivery::BestEffort.retain());
        assert_eq!(Delivery::Confirmed.qos(), QoS::AtLeastOnce);
        assert!(Delivery::Confirmed.retain());
    }
}
