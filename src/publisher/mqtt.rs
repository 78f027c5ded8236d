//! MQTT-backed bus publisher.
//!
//! Topics and payloads are bit-compatible with existing consumers: tool
//! changes and errors are published at QoS 1, heartbeats at QoS 0.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use crate::core::ids::PathId;
use crate::core::traits::{BusPublisher, HeartbeatSnapshot};

const SOURCE: &str = "rpi4-monitor";

/// Connection parameters for the MQTT-backed publisher.
#[derive(Debug, Clone)]
pub struct MqttPublisherConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: bool,
    pub client_id: String,
}

/// Publishes monitoring events over MQTT. Connection lifecycle runs on a
/// background task driving `rumqttc`'s event loop, which owns its own
/// reconnect/backoff behavior; this type only tracks whether the last known
/// connection state was up.
pub struct MqttPublisher {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl MqttPublisher {
    /// Connect to the broker and spawn the background event loop driver.
    /// Returns immediately; the first publish attempts may fail until the
    /// initial handshake completes.
    pub fn start(config: MqttPublisherConfig) -> Self {
        if config.tls {
            warn!("TLS requested but not yet wired into the MQTT transport; connecting in plaintext");
        }

        let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, mut event_loop) = AsyncClient::new(options, 64);
        let connected = Arc::new(AtomicBool::new(false));

        let connected_writer = connected.clone();
        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!(host = %config.host, port = config.port, "mqtt publisher connected");
                        connected_writer.store(true, Ordering::SeqCst);
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        connected_writer.store(false, Ordering::SeqCst);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        connected_writer.store(false, Ordering::SeqCst);
                        error!(error = %err, "mqtt event loop error, retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Self { client, connected }
    }

    async fn publish_json(&self, topic: String, payload: Value, qos: QoS) -> bool {
        if !self.connected.load(Ordering::SeqCst) {
            warn!(topic = %topic, "cannot publish - not connected to mqtt broker");
            return false;
        }

        let body = match serde_json::to_vec(&payload) {
            Ok(b) => b,
            Err(err) => {
                error!(topic = %topic, error = %err, "failed to encode mqtt payload");
                return false;
            }
        };

        match self.client.publish(&topic, qos, false, body).await {
            Ok(()) => {
                debug!(topic = %topic, "published");
                true
            }
            Err(err) => {
                error!(topic = %topic, error = %err, "failed to publish");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl BusPublisher for MqttPublisher {
    async fn publish_tool_change(
        &self,
        machine: &str,
        path: PathId,
        ip: &str,
        previous: i64,
        current: i64,
    ) -> bool {
        let topic = format!("fanuc/{machine}/event/tool_change/path{path}");
        let payload = json!({
            "machine_id": machine,
            "path": path.0,
            "ip": ip,
            "event": "tool_change",
            "tool_previous": previous,
            "tool_current": current,
            "ts_unix_ms": now_unix_ms(),
            "source": SOURCE,
        });
        self.publish_json(topic, payload, QoS::AtLeastOnce).await
    }

    async fn publish_error(&self, machine: &str, path: PathId, ip: &str, message: &str) -> bool {
        let topic = format!("fanuc/{machine}/event/error");
        let payload = json!({
            "machine_id": machine,
            "path": path.0,
            "ip": ip,
            "error": message,
            "ts_unix_ms": now_unix_ms(),
            "source": SOURCE,
        });
        self.publish_json(topic, payload, QoS::AtLeastOnce).await
    }

    async fn publish_heartbeat(&self, machine: &str, ip: &str, snapshot: &HeartbeatSnapshot) -> bool {
        let topic = format!("fanuc/{machine}/state");
        let mut fields = Map::new();
        fields.insert("machine_id".into(), json!(machine));
        fields.insert("ip".into(), json!(ip));
        fields.insert("connected".into(), json!(snapshot.connected));
        fields.insert("ts_unix_ms".into(), json!(now_unix_ms()));
        fields.insert("source".into(), json!(SOURCE));

        for (path, status) in &snapshot.per_path_status {
            let status_str = if matches!(status, crate::core::path_state::PathStatus::Ok) {
                "ok"
            } else {
                "error"
            };
            fields.insert(format!("path{path}_status"), json!(status_str));
        }
        for (path, error) in &snapshot.per_path_errors {
            if let Some(message) = error {
                fields.insert(format!("path{path}_error"), json!(message));
            }
        }

        self.publish_json(topic, Value::Object(fields), QoS::AtMostOnce)
            .await
    }
}

fn now_unix_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
