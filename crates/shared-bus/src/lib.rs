//! # Shared Bus - Publish/Subscribe Transport
//!
//! Thin transport clients over a topic-based message broker. Everything above
//! this crate sees only [`PubSubClient`] and [`Connector`]; which broker sits
//! underneath is decided once, at wiring time.
//!
//! ## Delivery Model
//!
//! ```text
//! ┌──────────────┐   publish(topic)   ┌──────────────┐   subscribe(topic)   ┌──────────────┐
//! │  Client A    │ ─────────────────→ │    Broker    │ ───────────────────→ │  Client B    │
//! └──────────────┘                    └──────────────┘   one task per msg   └──────────────┘
//! ```
//!
//! - **At-most-once:** no acknowledgement is visible to this layer; slow
//!   subscribers may lose messages.
//! - **Unordered across topics.**
//! - **Concurrent callbacks:** each inbound message runs its handler in its
//!   own task, including messages on the same topic.
//! - **Idempotent subscribe:** subscribing to a topic the client already
//!   follows succeeds without side effects.
//!
//! ## Transports
//!
//! - [`InMemoryBroker`]: `tokio::sync::broadcast` per topic, for single-process
//!   deployments and tests.
//! - `MqttConnector` (feature `mqtt`): MQTT 3.1.1 via `rumqttc`.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod client;
pub mod message;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use client::{ConnectOptions, Connector, PubSubClient, TransportError};
pub use message::BusMessage;
#[cfg(feature = "mqtt")]
pub use mqtt::MqttConnector;
pub use publisher::{InMemoryBroker, InMemoryClient};
pub use subscriber::{handler_fn, MessageHandler};

/// Maximum messages buffered per topic before slow subscribers start lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
