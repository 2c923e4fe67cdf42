//! # Fleet Agent
//!
//! A deployment target reachable over a publish/subscribe broker. The agent
//! keeps the components deployed to it in memory and serves them through
//! [`fr_01_pubsub_binding`], so a remote provider can read, apply and remove
//! components with correlated request/response calls.
//!
//! ## Startup Sequence
//!
//! 1. Install logging (`fleet-telemetry`)
//! 2. Load configuration from a JSON file argument or `FLEET_*` variables
//! 3. Pick the transport from the broker address
//! 4. Launch the binding with the store endpoints
//! 5. Run until Ctrl+C, then shut the binding down

pub mod config;
pub mod runtime;
pub mod store;

pub use config::{AgentConfig, AgentConfigError};
pub use runtime::{connector_for, Agent};
pub use store::{endpoints, ComponentStore};
