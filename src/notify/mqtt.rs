// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! MQTT notification channel

use async_trait::async_trait;
use parking_lot::RwLock;
use rumqttc::{AsyncClient, ConnectReturnCode, ConnectionError, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{DeliveryError, Notification, NotificationSink, Permission};
use crate::config::NotificationConfig;

/// Publishes notifications as JSON to a broker topic.
///
/// Permission mirrors the broker session: `Default` until the first ConnAck,
/// `Granted` once the broker accepts the connection, `Denied` when it refuses
/// it (bad credentials, not authorized).
pub struct MqttSink {
    client: AsyncClient,
    topic: String,
    permission: Arc<RwLock<Permission>>,
}

impl MqttSink {
    pub async fn new(config: &NotificationConfig) -> anyhow::Result<Self> {
        let mut options = MqttOptions::new(&config.mqtt_client_id, &config.mqtt_broker, config.mqtt_port);
        options.set_keep_alive(Duration::from_secs(30));

        if let (Some(username), Some(password)) = (&config.mqtt_username, &config.mqtt_password) {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 100);
        let permission = Arc::new(RwLock::new(Permission::Default));

        let state = permission.clone();
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        let outcome = if ack.code == ConnectReturnCode::Success {
                            info!("MQTT connected");
                            Permission::Granted
                        } else {
                            warn!("MQTT broker refused connection: {:?}", ack.code);
                            Permission::Denied
                        };
                        *state.write() = outcome;
                    }
                    Ok(Event::Incoming(Packet::PubAck(ack))) => {
                        debug!("MQTT publish acknowledged: {}", ack.pkid);
                    }
                    Ok(_) => {}
                    Err(ConnectionError::ConnectionRefused(code)) => {
                        warn!("MQTT broker refused connection: {:?}", code);
                        *state.write() = Permission::Denied;
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    Err(e) => {
                        // Connection lost; stay Default until the broker answers again
                        {
                            let mut current = state.write();
                            if *current == Permission::Granted {
                                *current = Permission::Default;
                            }
                        }
                        warn!("MQTT error: {:?}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        info!("MQTT notification channel for {}:{} topic {}", config.mqtt_broker, config.mqtt_port, config.mqtt_topic);

        Ok(Self {
            client,
            topic: config.mqtt_topic.clone(),
            permission,
        })
    }
}

#[async_trait]
impl NotificationSink for MqttSink {
    fn name(&self) -> &str {
        "mqtt"
    }

    fn permission(&self) -> Permission {
        *self.permission.read()
    }

    async fn request_permission(&self) -> Permission {
        // Authorization is decided by the broker during the connect handshake
        self.permission()
    }

    async fn present(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let payload = serde_json::to_vec(notification)
            .map_err(|e| DeliveryError::Channel(e.to_string()))?;

        self.client
            .publish(&self.topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| DeliveryError::Channel(format!("MQTT publish failed: {}", e)))
    }
}
