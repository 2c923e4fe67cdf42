//! # In-Memory Broker
//!
//! A process-local broker with one `tokio::sync::broadcast` channel per
//! topic. Suitable for single-node operation and tests; remote targets use a
//! network broker instead (see the `mqtt` feature).

use crate::client::{ConnectOptions, Connector, PubSubClient, TransportError};
use crate::message::BusMessage;
use crate::subscriber::{spawn_pump, MessageHandler};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct BrokerInner {
    /// One broadcast channel per topic, created on first use.
    topics: RwLock<HashMap<String, broadcast::Sender<BusMessage>>>,
    /// Total messages published.
    messages_published: AtomicU64,
    /// Channel capacity per topic.
    capacity: usize,
}

/// In-memory topic broker.
///
/// Cloning yields another handle to the same broker.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<BrokerInner>,
}

impl InMemoryBroker {
    /// Create a broker with default per-topic capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a broker with the given per-topic capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                topics: RwLock::new(HashMap::new()),
                messages_published: AtomicU64::new(0),
                capacity,
            }),
        }
    }

    /// Open a client directly, without going through [`Connector`].
    #[must_use]
    pub fn client(&self, client_id: impl Into<String>) -> InMemoryClient {
        InMemoryClient {
            broker: self.clone(),
            client_id: client_id.into(),
            subscriptions: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Number of live subscriptions on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .read()
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Total messages published through this broker.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.inner.messages_published.load(Ordering::Relaxed)
    }

    /// Per-topic channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<BusMessage> {
        if let Some(sender) = self.inner.topics.read().get(topic) {
            return sender.clone();
        }
        self.inner
            .topics
            .write()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .clone()
    }

    /// Deliver to current subscribers; returns how many there were.
    fn deliver(&self, message: BusMessage) -> usize {
        self.inner.messages_published.fetch_add(1, Ordering::Relaxed);
        let topic = message.topic.clone();

        match self.sender(&topic).send(message) {
            Ok(receivers) => {
                debug!(topic = %topic, receivers = receivers, "Message published");
                receivers
            }
            Err(_) => {
                // No receivers - message is dropped
                debug!(topic = %topic, "Message dropped (no subscribers)");
                0
            }
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for InMemoryBroker {
    async fn connect(
        &self,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn PubSubClient>, TransportError> {
        debug!(
            address = %options.broker_address,
            client_id = %options.client_id,
            "Connected to in-memory broker"
        );
        Ok(Arc::new(self.client(options.client_id.clone())))
    }
}

/// A session on an [`InMemoryBroker`].
///
/// Dropping the client ends all of its subscriptions.
pub struct InMemoryClient {
    broker: InMemoryBroker,
    client_id: String,
    /// Topic -> pump task.
    subscriptions: Mutex<HashMap<String, JoinHandle<()>>>,
    connected: AtomicBool,
}

impl InMemoryClient {
    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TransportError::NotConnected(self.client_id.clone()))
        }
    }

    /// Topics this client currently follows.
    #[must_use]
    pub fn subscribed_topics(&self) -> Vec<String> {
        self.subscriptions.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl PubSubClient for InMemoryClient {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), TransportError> {
        self.ensure_connected()?;
        self.broker.deliver(BusMessage::new(topic, payload));
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError> {
        self.ensure_connected()?;

        let mut subscriptions = self.subscriptions.lock();
        if subscriptions.contains_key(topic) {
            debug!(
                client_id = %self.client_id,
                topic = %topic,
                "Already subscribed, keeping existing handler"
            );
            return Ok(());
        }

        let receiver = self.broker.sender(topic).subscribe();
        let pump = spawn_pump(topic.to_string(), receiver, handler);
        subscriptions.insert(topic.to_string(), pump);

        debug!(client_id = %self.client_id, topic = %topic, "Subscribed");
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        if let Some(pump) = self.subscriptions.lock().remove(topic) {
            pump.abort();
            debug!(client_id = %self.client_id, topic = %topic, "Unsubscribed");
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if !self.connected.swap(false, Ordering::AcqRel) {
            warn!(client_id = %self.client_id, "Disconnect on a closed client");
            return Ok(());
        }
        for (_, pump) in self.subscriptions.lock().drain() {
            pump.abort();
        }
        debug!(client_id = %self.client_id, "Disconnected");
        Ok(())
    }
}

impl Drop for InMemoryClient {
    fn drop(&mut self) {
        for (_, pump) in self.subscriptions.get_mut().drain() {
            pump.abort();
        }
    }
}
