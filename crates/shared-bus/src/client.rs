//! # Transport Client Contract
//!
//! The interface every broker adapter implements.

use crate::subscriber::MessageHandler;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors at the bus layer.
///
/// Fatal to the call in progress; nothing in this crate retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The broker address could not be parsed.
    #[error("invalid broker address '{0}'")]
    InvalidAddress(String),

    /// Establishing the session failed.
    #[error("failed to connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    /// The client was disconnected.
    #[error("client '{0}' is not connected")]
    NotConnected(String),

    /// The local send was rejected.
    #[error("failed to publish on '{topic}': {reason}")]
    Publish { topic: String, reason: String },

    /// The broker rejected the subscription.
    #[error("failed to subscribe to '{topic}': {reason}")]
    Subscribe { topic: String, reason: String },
}

/// Session parameters for [`Connector::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Broker URI, e.g. `tcp://broker:1883` or `memory://local`.
    pub broker_address: String,
    /// Client identifier presented to the broker.
    pub client_id: String,
    pub keep_alive: Duration,
    /// Accepted so existing configurations load; no transport enforces it.
    ///
    /// The MQTT connector detects a missing PINGRESP on the next keep-alive
    /// tick instead, and the in-memory broker has no liveness checks.
    pub ping_timeout: Duration,
}

impl ConnectOptions {
    pub fn new(broker_address: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            broker_address: broker_address.into(),
            client_id: client_id.into(),
            keep_alive: Duration::from_secs(2),
            ping_timeout: Duration::from_secs(1),
        }
    }
}

/// A connected publish/subscribe session.
#[async_trait]
pub trait PubSubClient: Send + Sync {
    /// Identifier this session was opened with.
    fn client_id(&self) -> &str;

    /// Fire-and-forget publish.
    ///
    /// Returns once the local send is accepted, not once anyone received it.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), TransportError>;

    /// Register `handler` for every message on `topic`.
    ///
    /// Each message runs the handler in its own task. Subscribing to a topic
    /// this client already follows is a no-op and keeps the first handler.
    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError>;

    /// Stop delivering `topic`. Unknown topics are ignored.
    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError>;

    /// Close the session and drop all subscriptions.
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Opens sessions against a particular kind of broker.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, options: &ConnectOptions)
        -> Result<Arc<dyn PubSubClient>, TransportError>;
}
