//! Publish/subscribe target provider - main entry point.
//!
//! Turns `get`/`apply`/`remove` into correlated calls against a remote agent
//! serving the `instances` route.

use crate::adapters::bus_adapter::{into_success, response_handler, RemoteCaller};
use crate::domain::config::ProviderConfig;
use crate::domain::error::ProviderError;
use crate::domain::pending::CorrelationRegistry;
use crate::ports::inbound::TargetProvider;
use async_trait::async_trait;
use shared_bus::{ConnectOptions, Connector, PubSubClient};
use shared_types::{
    ComponentResult, ComponentSpec, ComponentStatus, ComponentStep, DeploymentSpec,
    DeploymentStep, InstancesPayload, Request, Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Route the remote agent serves component state on.
pub const INSTANCES_ROUTE: &str = "instances";

pub const METHOD_GET: &str = "GET";
pub const METHOD_POST: &str = "POST";
pub const METHOD_DELETE: &str = "DELETE";

/// Everything `init` establishes.
struct Session {
    config: ProviderConfig,
    caller: RemoteCaller,
}

/// Target provider that reaches its target over a publish/subscribe bus.
pub struct PubSubTargetProvider {
    connector: Arc<dyn Connector>,
    /// Outlives sessions, so calls in flight across a re-init still resolve.
    registry: Arc<CorrelationRegistry>,
    /// Instance-scoped; `init` holds it for writing while it reconnects.
    session: RwLock<Option<Arc<Session>>>,
}

impl PubSubTargetProvider {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            registry: Arc::new(CorrelationRegistry::new()),
            session: RwLock::new(None),
        }
    }

    /// Create and initialize in one step.
    pub async fn connect(
        connector: Arc<dyn Connector>,
        config: ProviderConfig,
    ) -> Result<Self, ProviderError> {
        let provider = Self::new(connector);
        provider.init(config).await?;
        Ok(provider)
    }

    pub fn registry(&self) -> &Arc<CorrelationRegistry> {
        &self.registry
    }

    /// Configuration of the current session, if initialized.
    pub async fn config(&self) -> Option<ProviderConfig> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.config.clone())
    }

    async fn current(&self) -> Result<Arc<Session>, ProviderError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotInitialized)
    }

    /// Call any route on the target; failure states become `Remote` errors.
    pub async fn invoke(&self, request: Request) -> Result<Response, ProviderError> {
        let session = self.current().await?;
        let response = session.caller.call("Invoke", request).await?;
        into_success(response)
    }

    async fn instances_call(
        &self,
        operation: &str,
        method: &str,
        payload: &InstancesPayload,
    ) -> Result<Response, ProviderError> {
        let session = self.current().await?;
        let request = Request::new(method, INSTANCES_ROUTE).with_json_body(payload)?;
        let response = session.caller.call(operation, request).await?;
        into_success(response)
    }

    async fn open_client(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn PubSubClient>, ProviderError> {
        let mut options = ConnectOptions::new(&config.broker_address, &config.client_id);
        options.keep_alive = config.keep_alive;
        options.ping_timeout = config.ping_timeout;
        Ok(self.connector.connect(&options).await?)
    }

    /// Disconnect the current session.
    pub async fn shutdown(&self) -> Result<(), ProviderError> {
        if let Some(session) = self.session.write().await.take() {
            session.caller.client().disconnect().await?;
            info!(provider = %session.config.name, "Provider session closed");
        }
        Ok(())
    }
}

#[async_trait]
impl TargetProvider for PubSubTargetProvider {
    async fn init(&self, config: ProviderConfig) -> Result<(), ProviderError> {
        config.validate()?;
        let mut slot = self.session.write().await;

        let reusable = slot
            .as_ref()
            .filter(|session| {
                session.config.broker_address == config.broker_address
                    && session.config.client_id == config.client_id
            })
            .map(|session| Arc::clone(session.caller.client()));
        let client = match reusable {
            Some(client) => {
                debug!(provider = %config.name, "Reusing existing bus session");
                client
            }
            None => {
                if let Some(old) = slot.take() {
                    if let Err(e) = old.caller.client().disconnect().await {
                        warn!(error = %e, "Failed to close previous bus session");
                    }
                }
                self.open_client(&config).await?
            }
        };

        // Idempotent when the topic is already followed.
        client
            .subscribe(
                &config.response_topic,
                response_handler(Arc::clone(&self.registry)),
            )
            .await?;

        info!(
            provider = %config.name,
            broker = %config.broker_address,
            request_topic = %config.request_topic,
            response_topic = %config.response_topic,
            timeout_ms = config.timeout.as_millis() as u64,
            "Remote provider initialized"
        );

        let caller = RemoteCaller::new(client, Arc::clone(&self.registry), &config);
        *slot = Some(Arc::new(Session { config, caller }));
        Ok(())
    }

    async fn get(
        &self,
        deployment: &DeploymentSpec,
        references: &[ComponentStep],
    ) -> Result<Vec<ComponentSpec>, ProviderError> {
        let payload = InstancesPayload {
            deployment: deployment.clone(),
            components: references.iter().map(|r| r.component.clone()).collect(),
        };
        let response = self.instances_call("Get", METHOD_GET, &payload).await?;

        if response.body.is_empty() {
            return Ok(Vec::new());
        }
        Ok(response.json::<Vec<ComponentSpec>>()?)
    }

    async fn apply(
        &self,
        deployment: &DeploymentSpec,
        step: &DeploymentStep,
        dry_run: bool,
    ) -> Result<HashMap<String, ComponentResult>, ProviderError> {
        let mut results = HashMap::new();
        if dry_run {
            debug!(step_target = %step.target, "Dry run, nothing sent");
            return Ok(results);
        }

        let updated = step.updated_components();
        if !updated.is_empty() {
            let payload = InstancesPayload {
                deployment: deployment.clone(),
                components: updated,
            };
            self.instances_call("Apply", METHOD_POST, &payload).await?;
            for component in payload.components {
                results.insert(
                    component.name,
                    ComponentResult::new(ComponentStatus::Updated, ""),
                );
            }
        }

        let deleted = step.deleted_components();
        if !deleted.is_empty() {
            let payload = InstancesPayload {
                deployment: deployment.clone(),
                components: deleted,
            };
            self.instances_call("Apply", METHOD_DELETE, &payload).await?;
            for component in payload.components {
                results.insert(
                    component.name,
                    ComponentResult::new(ComponentStatus::Deleted, ""),
                );
            }
        }

        Ok(results)
    }

    async fn remove(
        &self,
        deployment: &DeploymentSpec,
        components: &[ComponentSpec],
    ) -> Result<(), ProviderError> {
        let payload = InstancesPayload {
            deployment: deployment.clone(),
            components: components.to_vec(),
        };
        self.instances_call("Remove", METHOD_DELETE, &payload).await?;
        Ok(())
    }
}
