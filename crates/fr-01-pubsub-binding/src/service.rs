//! Publish/subscribe binding - serves endpoints over a bus.
//!
//! Subscribes to the request topic; each inbound message is routed in its
//! own task and exactly one response is published per message.

use crate::domain::{BindingConfig, BindingError, Endpoint};
use crate::ports::inbound::Binding;
use crate::router::Router;
use async_trait::async_trait;
use bytes::Bytes;
use shared_bus::{handler_fn, BusMessage, ConnectOptions, Connector, MessageHandler, PubSubClient};
use shared_types::Envelope;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

struct Running {
    config: BindingConfig,
    client: Arc<dyn PubSubClient>,
    router: Arc<Router>,
}

/// Bus-backed [`Binding`].
pub struct PubSubBinding {
    connector: Arc<dyn Connector>,
    running: Mutex<Option<Running>>,
}

impl PubSubBinding {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            running: Mutex::new(None),
        }
    }

    pub async fn is_launched(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Routes currently served, for diagnostics.
    pub async fn routes(&self) -> Vec<String> {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|running| {
                running
                    .router
                    .endpoints()
                    .iter()
                    .map(|e| e.route.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Subscription callback: route the payload, publish the answer.
fn request_handler(
    router: Arc<Router>,
    client: Arc<dyn PubSubClient>,
    response_topic: String,
) -> MessageHandler {
    handler_fn(move |message: BusMessage| {
        let router = Arc::clone(&router);
        let client = Arc::clone(&client);
        let response_topic = response_topic.clone();
        async move {
            let response = router.handle(&message.payload).await;
            let key = response.correlation_key().unwrap_or("-").to_string();

            let payload = match response.encode() {
                Ok(payload) => payload,
                Err(e) => {
                    error!(correlation_id = %key, error = %e, "Failed to encode response");
                    return;
                }
            };
            match client.publish(&response_topic, Bytes::from(payload)).await {
                Ok(()) => debug!(
                    correlation_id = %key,
                    state = %response.state,
                    topic = %response_topic,
                    "Response published"
                ),
                Err(e) => error!(correlation_id = %key, error = %e, "Failed to publish response"),
            }
        }
    })
}

#[async_trait]
impl Binding for PubSubBinding {
    async fn launch(
        &self,
        config: BindingConfig,
        endpoints: Vec<Endpoint>,
    ) -> Result<(), BindingError> {
        config.validate()?;
        let router = Arc::new(Router::new(endpoints)?);

        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(BindingError::AlreadyLaunched);
        }

        let mut options = ConnectOptions::new(&config.broker_address, &config.client_id);
        options.keep_alive = config.keep_alive;
        options.ping_timeout = config.ping_timeout;
        let client = self.connector.connect(&options).await?;

        let handler = request_handler(
            Arc::clone(&router),
            Arc::clone(&client),
            config.response_topic.clone(),
        );
        if let Err(e) = client.subscribe(&config.request_topic, handler).await {
            let _ = client.disconnect().await;
            return Err(e.into());
        }

        info!(
            broker = %config.broker_address,
            request_topic = %config.request_topic,
            response_topic = %config.response_topic,
            endpoints = router.endpoints().len(),
            "Binding launched"
        );

        *running = Some(Running {
            config,
            client,
            router,
        });
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), BindingError> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };
        running.client.disconnect().await?;
        info!(request_topic = %running.config.request_topic, "Binding stopped");
        Ok(())
    }
}
