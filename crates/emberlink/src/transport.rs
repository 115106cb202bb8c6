use std::time::Duration;

use async_trait::async_trait;
use rumqttc::AsyncClient;
use rumqttc::Event;
use rumqttc::MqttOptions;
use rumqttc::QoS;
use tokio::task::JoinHandle;
use tracing::info;
use tracing::warn;

use crate::config::MqttConfig;

/// Delivery guarantee requested for a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl From<Qos> for QoS {
    fn from(qos: Qos) -> Self {
        match qos {
            Qos::AtMostOnce => QoS::AtMostOnce,
            Qos::AtLeastOnce => QoS::AtLeastOnce,
            Qos::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport not connected; call connect() first")]
    NotConnected,

    #[error("mqtt client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}

/// Delivery function the device core hands its serialized payloads to.
///
/// Best-effort and fire-and-forget: the core never inspects delivery beyond
/// the synchronous result and never retries. The trait also allows mocking
/// the broker connection for testing purposes.
#[async_trait]
pub trait Transport: Send {
    /// Establish the broker connection.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Publish a message, optionally retained.
    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
        qos: Qos,
    ) -> Result<(), TransportError>;
}

/// Mock transport for testing; records every publish.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockTransport {
    pub published: Vec<(String, Vec<u8>, bool, Qos)>,
    pub is_connected: bool,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload of the n-th publish, parsed as JSON.
    pub fn payload_json(&self, n: usize) -> serde_json::Value {
        serde_json::from_slice(&self.published[n].1).unwrap()
    }
}

#[cfg(test)]
#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.is_connected = true;
        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
        qos: Qos,
    ) -> Result<(), TransportError> {
        self.published
            .push((topic.to_string(), payload.to_vec(), retain, qos));
        Ok(())
    }
}

/// Publisher-side MQTT transport backed by rumqttc.
///
/// Publish-only: the event loop still has to be polled for broker
/// acknowledgments, so `connect()` spawns a background task that drains it.
pub struct MqttTransport {
    /// MQTT connection options (stored for lazy initialization)
    mqtt_options: MqttOptions,

    /// AsyncClient (created in connect())
    client: Option<AsyncClient>,

    /// Background event loop task handle
    event_loop_task: Option<JoinHandle<()>>,
}

impl MqttTransport {
    pub fn new(config: &MqttConfig) -> Self {
        let client_id = config.effective_client_id();
        let mut mqtt_options = MqttOptions::new(client_id, config.broker.clone(), config.port);

        mqtt_options.set_keep_alive(Duration::from_secs(30));

        // Allow large MQTT packets (2 MiB) for discovery payloads
        mqtt_options.set_max_packet_size(2 * 1024 * 1024, 2 * 1024 * 1024);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            mqtt_options.set_credentials(username, password);
        }

        Self {
            mqtt_options,
            client: None,
            event_loop_task: None,
        }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let (client, mut event_loop) = AsyncClient::new(self.mqtt_options.clone(), 10);

        // Drain the event loop so outgoing publishes are acknowledged.
        // Incoming packets are ignored: this transport never subscribes.
        let task = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(_)) | Ok(Event::Outgoing(_)) => {}
                    Err(e) => {
                        warn!("MQTT event loop error: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        info!("MQTT transport connected to {}", self.mqtt_options.broker_address().0);

        self.client = Some(client);
        self.event_loop_task = Some(task);

        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
        qos: Qos,
    ) -> Result<(), TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::NotConnected)?;

        client.publish(topic, qos.into(), retain, payload).await?;

        Ok(())
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        if let Some(task) = self.event_loop_task.take() {
            task.abort();
        }
    }
}
