//! FR-02 Remote Provider - synchronous calls over a publish/subscribe bus.
//!
//! Makes a fire-and-forget, broadcast transport behave like a correlated,
//! timeout-bounded remote call.
//!
//! # Architecture
//!
//! ```text
//! caller ──get/apply/remove──→ PubSubTargetProvider
//!                                   │
//!                  ┌────────────────┴─────────────────┐
//!                  │ 1. register(key, timeout)        │
//!                  │ 2. publish Request ──────────────┼──→ request topic ──→ agent
//!                  │ 3. wait() ◄── complete(key) ◄────┼─── response topic ◄── agent
//!                  └──────── CorrelationRegistry ─────┘
//! ```
//!
//! Each call is `Created → Published → (Resolved | TimedOut)`. Nothing in
//! this crate retries; [`ProviderError::is_retryable`] tells callers which
//! failures are worth repeating.
//!
//! # Usage
//!
//! ```ignore
//! use fr_02_remote_provider::{ProviderConfig, PubSubTargetProvider, TargetProvider};
//!
//! let provider = PubSubTargetProvider::new(Arc::new(MqttConnector::new()));
//! provider.init(ProviderConfig::new("tcp://broker:1883", "orchestrator")).await?;
//! let components = provider.get(&deployment, &[]).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{into_success, response_handler, RemoteCaller};
pub use domain::{
    ConfigError, CorrelationId, CorrelationRegistry, CorrelationScheme, PendingCall,
    ProviderConfig, ProviderError, RegistryError, RegistryStats,
};
pub use ports::TargetProvider;
pub use service::{PubSubTargetProvider, INSTANCES_ROUTE};
