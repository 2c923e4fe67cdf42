//! Inbound port: the registration contract for serving endpoints.
//!
//! Any transport that can carry requests and responses (an HTTP router, a
//! bus) can implement it.

use crate::domain::{BindingConfig, BindingError, Endpoint};
use async_trait::async_trait;

#[async_trait]
pub trait Binding: Send + Sync {
    /// Start serving `endpoints`. The set is fixed until `shutdown`.
    async fn launch(&self, config: BindingConfig, endpoints: Vec<Endpoint>)
        -> Result<(), BindingError>;

    /// Stop serving. Safe to call when not launched.
    async fn shutdown(&self) -> Result<(), BindingError>;
}
