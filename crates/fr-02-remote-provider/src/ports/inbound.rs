//! Inbound port: the capability contract every target provider offers.

use crate::domain::config::ProviderConfig;
use crate::domain::error::ProviderError;
use async_trait::async_trait;
use shared_types::{ComponentResult, ComponentSpec, ComponentStep, DeploymentSpec, DeploymentStep};
use std::collections::HashMap;

/// Lifecycle operations against one target.
///
/// The orchestration layer resolves a provider once at startup and drives it
/// only through this trait.
#[async_trait]
pub trait TargetProvider: Send + Sync {
    /// (Re)configure the provider. May be called more than once.
    async fn init(&self, config: ProviderConfig) -> Result<(), ProviderError>;

    /// Current state of the referenced components on the target.
    async fn get(
        &self,
        deployment: &DeploymentSpec,
        references: &[ComponentStep],
    ) -> Result<Vec<ComponentSpec>, ProviderError>;

    /// Drive the target toward `step`. A dry run changes nothing.
    async fn apply(
        &self,
        deployment: &DeploymentSpec,
        step: &DeploymentStep,
        dry_run: bool,
    ) -> Result<HashMap<String, ComponentResult>, ProviderError>;

    /// Remove `components` from the target.
    async fn remove(
        &self,
        deployment: &DeploymentSpec,
        components: &[ComponentSpec],
    ) -> Result<(), ProviderError>;
}
