//! Shared wiring for the integration tests.

use bytes::Bytes;
use fr_01_pubsub_binding::{Binding, BindingConfig, Endpoint, PubSubBinding};
use fr_02_remote_provider::{
    CorrelationScheme, ProviderConfig, PubSubTargetProvider, TargetProvider,
};
use shared_bus::{handler_fn, BusMessage, InMemoryBroker, InMemoryClient, PubSubClient};
use shared_types::{Envelope, Request, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

pub const BROKER: &str = "memory://integration";
pub const REQUESTS: &str = "coa-request";
pub const RESPONSES: &str = "coa-response";

pub fn provider_config(timeout: Duration) -> ProviderConfig {
    ProviderConfig::new(BROKER, "provider").with_timeout(timeout)
}

pub async fn provider(broker: &InMemoryBroker, config: ProviderConfig) -> PubSubTargetProvider {
    PubSubTargetProvider::connect(Arc::new(broker.clone()), config)
        .await
        .unwrap()
}

pub async fn binding(broker: &InMemoryBroker, endpoints: Vec<Endpoint>) -> PubSubBinding {
    let binding = PubSubBinding::new(Arc::new(broker.clone()));
    binding
        .launch(BindingConfig::new(BROKER, "agent"), endpoints)
        .await
        .unwrap();
    binding
}

/// Broker with a launched binding and an initialized provider.
pub struct Harness {
    pub broker: InMemoryBroker,
    pub binding: PubSubBinding,
    pub provider: PubSubTargetProvider,
}

pub async fn harness(endpoints: Vec<Endpoint>, timeout: Duration) -> Harness {
    let broker = InMemoryBroker::new();
    let binding = binding(&broker, endpoints).await;
    let provider = provider(&broker, provider_config(timeout)).await;
    Harness {
        broker,
        binding,
        provider,
    }
}

/// Provider with the legacy fixed-key scheme and no binding behind it.
pub async fn legacy_provider(
    broker: &InMemoryBroker,
    timeout: Duration,
) -> PubSubTargetProvider {
    let config = provider_config(timeout).with_correlation_scheme(CorrelationScheme::OperationName);
    let provider = PubSubTargetProvider::new(Arc::new(broker.clone()));
    provider.init(config).await.unwrap();
    provider
}

/// Stands in for a target whose answers the test controls: captures
/// requests and publishes whatever responses the test asks for.
pub struct ManualResponder {
    client: InMemoryClient,
    requests: Mutex<mpsc::UnboundedReceiver<Request>>,
}

impl ManualResponder {
    pub async fn new(broker: &InMemoryBroker) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = broker.client("manual-responder");
        client
            .subscribe(
                REQUESTS,
                handler_fn(move |message: BusMessage| {
                    let tx = tx.clone();
                    async move {
                        let _ = tx.send(Request::decode(&message.payload).unwrap());
                    }
                }),
            )
            .await
            .unwrap();
        Self {
            client,
            requests: Mutex::new(rx),
        }
    }

    /// Next captured request; panics if none arrives within a second.
    pub async fn next_request(&self) -> Request {
        tokio::time::timeout(Duration::from_secs(1), self.requests.lock().await.recv())
            .await
            .expect("no request published")
            .expect("responder closed")
    }

    /// Publish `response` carrying `request`'s correlation key.
    pub async fn reply(&self, request: &Request, response: Response) {
        let key = request.correlation_key().unwrap().to_string();
        self.reply_with_key(&key, response).await;
    }

    pub async fn reply_with_key(&self, key: &str, response: Response) {
        let payload = response.with_correlation_key(key).encode().unwrap();
        self.client
            .publish(RESPONSES, Bytes::from(payload))
            .await
            .unwrap();
    }
}

/// Wait until `condition` holds, polling for up to a second.
pub async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached");
}
