//! Agent lifecycle: pick a transport, launch the binding, shut down.

use crate::config::AgentConfig;
use crate::store::{endpoints, ComponentStore};
use fr_01_pubsub_binding::{Binding, BindingError, PubSubBinding};
use shared_bus::{Connector, InMemoryBroker, MqttConnector};
use std::sync::Arc;
use tracing::{info, warn};

pub const MEMORY_SCHEME: &str = "memory://";

/// Transport for a broker address: `memory://` runs an in-process broker,
/// anything else is treated as MQTT.
///
/// Every `memory://` call creates a new, private broker. Only sessions opened
/// through the returned connector can reach each other, so a separate process
/// (or a second call here) never sees this agent. Use [`Agent::start_with`]
/// with a shared [`InMemoryBroker`] to co-locate a caller.
pub fn connector_for(broker_address: &str) -> Arc<dyn Connector> {
    if broker_address.starts_with(MEMORY_SCHEME) {
        Arc::new(InMemoryBroker::new())
    } else {
        Arc::new(MqttConnector::new())
    }
}

/// A running agent.
pub struct Agent {
    binding: PubSubBinding,
    store: Arc<ComponentStore>,
}

impl Agent {
    /// Launch over the transport the configuration names.
    pub async fn start(config: AgentConfig) -> Result<Self, BindingError> {
        let connector = connector_for(&config.binding.broker_address);
        if config.binding.broker_address.starts_with(MEMORY_SCHEME) {
            warn!(
                broker = %config.binding.broker_address,
                "Using a private in-process broker; no other process can reach this agent"
            );
        }
        Self::start_with(connector, config).await
    }

    /// Launch over an explicit transport.
    pub async fn start_with(
        connector: Arc<dyn Connector>,
        config: AgentConfig,
    ) -> Result<Self, BindingError> {
        let store = Arc::new(ComponentStore::new());
        let binding = PubSubBinding::new(connector);
        let client_id = config.binding.client_id.clone();
        binding
            .launch(config.binding, endpoints(Arc::clone(&store)))
            .await?;
        info!(client_id = %client_id, "Agent started");
        Ok(Self { binding, store })
    }

    pub fn store(&self) -> &Arc<ComponentStore> {
        &self.store
    }

    pub async fn shutdown(&self) -> Result<(), BindingError> {
        self.binding.shutdown().await?;
        info!(components = self.store.len(), "Agent stopped");
        Ok(())
    }
}
