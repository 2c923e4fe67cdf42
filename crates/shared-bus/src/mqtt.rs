//! # MQTT Transport
//!
//! [`Connector`] over an MQTT 3.1.1 broker using `rumqttc`.
//!
//! All traffic is QoS 0 with no retained messages. A background task drives
//! the event loop and routes each inbound publish, by exact topic, to the
//! handler registered for it. Subscriptions are re-issued after the event
//! loop reconnects.
//!
//! Only `keep_alive` from [`ConnectOptions`] reaches the client library;
//! `ping_timeout` is not applied.

use crate::client::{ConnectOptions, Connector, PubSubClient, TransportError};
use crate::message::BusMessage;
use crate::subscriber::{dispatch, MessageHandler};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default MQTT port when the address omits one.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// How long `connect` waits for the broker's CONNACK.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Smallest keep-alive the client library accepts.
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

/// Request queue depth between the client handle and its event loop.
const REQUEST_CAPACITY: usize = 64;

/// Back-off between event loop errors.
const RECONNECT_DELAY: Duration = Duration::from_millis(500);

type HandlerMap = Arc<RwLock<HashMap<String, MessageHandler>>>;

/// Opens MQTT sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct MqttConnector;

impl MqttConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Split `tcp://host:port`, `mqtt://host:port` or `host:port` into parts.
pub fn parse_broker_address(address: &str) -> Result<(String, u16), TransportError> {
    let invalid = || TransportError::InvalidAddress(address.to_string());

    let rest = match address.split_once("://") {
        Some(("tcp" | "mqtt", rest)) => rest,
        Some(_) => return Err(invalid()),
        None => address,
    };
    let rest = rest.trim_end_matches('/');

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
        None => (rest, DEFAULT_MQTT_PORT),
    };
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}

#[async_trait]
impl Connector for MqttConnector {
    async fn connect(
        &self,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn PubSubClient>, TransportError> {
        let (host, port) = parse_broker_address(&options.broker_address)?;
        if options.client_id.is_empty() || options.client_id.starts_with(' ') {
            return Err(TransportError::Connect {
                address: options.broker_address.clone(),
                reason: format!("invalid client id '{}'", options.client_id),
            });
        }

        let mut mqtt_options = MqttOptions::new(options.client_id.clone(), host, port);
        mqtt_options.set_keep_alive(options.keep_alive.max(MIN_KEEP_ALIVE));
        mqtt_options.set_clean_session(true);

        let (client, mut event_loop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);

        let connect_error = |reason: String| TransportError::Connect {
            address: options.broker_address.clone(),
            reason,
        };

        // Wait for the session to be acknowledged before handing it out.
        tokio::time::timeout(CONNECT_TIMEOUT, async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => continue,
                    Err(e) => return Err(connect_error(e.to_string())),
                }
            }
        })
        .await
        .map_err(|_| connect_error("timed out waiting for CONNACK".to_string()))??;

        info!(
            address = %options.broker_address,
            client_id = %options.client_id,
            "Connected to MQTT broker"
        );

        let handlers: HandlerMap = Arc::new(RwLock::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));
        let driver = spawn_event_loop(
            event_loop,
            client.clone(),
            Arc::clone(&handlers),
            Arc::clone(&connected),
        );

        Ok(Arc::new(MqttClient {
            client,
            client_id: options.client_id.clone(),
            handlers,
            connected,
            driver,
        }))
    }
}

fn spawn_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    handlers: HandlerMap,
    connected: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while connected.load(Ordering::Acquire) {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let handler = handlers.read().get(&publish.topic).cloned();
                    match handler {
                        Some(handler) => {
                            dispatch(&handler, BusMessage::new(publish.topic, publish.payload));
                        }
                        None => {
                            debug!(topic = %publish.topic, "No handler for topic, dropping");
                        }
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    let topics: Vec<String> = handlers.read().keys().cloned().collect();
                    info!(topics = topics.len(), "Reconnected, restoring subscriptions");
                    for topic in topics {
                        if let Err(e) = client.try_subscribe(topic.clone(), QoS::AtMostOnce) {
                            error!(topic = %topic, error = %e, "Failed to restore subscription");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    if !connected.load(Ordering::Acquire) {
                        break;
                    }
                    warn!(error = %e, "MQTT event loop error, retrying");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
        debug!("MQTT event loop stopped");
    })
}

struct MqttClient {
    client: AsyncClient,
    client_id: String,
    handlers: HandlerMap,
    connected: Arc<AtomicBool>,
    driver: JoinHandle<()>,
}

impl MqttClient {
    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TransportError::NotConnected(self.client_id.clone()))
        }
    }
}

#[async_trait]
impl PubSubClient for MqttClient {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), TransportError> {
        self.ensure_connected()?;
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .await
            .map_err(|e| TransportError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError> {
        self.ensure_connected()?;
        {
            let mut handlers = self.handlers.write();
            if handlers.contains_key(topic) {
                debug!(client_id = %self.client_id, topic = %topic, "Already subscribed");
                return Ok(());
            }
            handlers.insert(topic.to_string(), handler);
        }

        if let Err(e) = self.client.subscribe(topic, QoS::AtMostOnce).await {
            self.handlers.write().remove(topic);
            return Err(TransportError::Subscribe {
                topic: topic.to_string(),
                reason: e.to_string(),
            });
        }
        debug!(client_id = %self.client_id, topic = %topic, "Subscribed");
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        if self.handlers.write().remove(topic).is_none() {
            return Ok(());
        }
        self.client
            .unsubscribe(topic)
            .await
            .map_err(|e| TransportError::Subscribe {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.handlers.write().clear();
        if let Err(e) = self.client.disconnect().await {
            warn!(client_id = %self.client_id, error = %e, "Disconnect request failed");
        }
        info!(client_id = %self.client_id, "Disconnected from MQTT broker");
        Ok(())
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::Release);
        self.driver.abort();
    }
}
