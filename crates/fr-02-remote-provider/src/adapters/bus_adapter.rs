//! Bus adapter for outbound calls.
//!
//! [`RemoteCaller`] publishes requests on the request topic and waits on the
//! [`CorrelationRegistry`]; [`response_handler`] feeds the registry from the
//! response topic.

use crate::domain::config::ProviderConfig;
use crate::domain::correlation::CorrelationScheme;
use crate::domain::error::{ProviderError, RegistryError};
use crate::domain::pending::CorrelationRegistry;
use bytes::Bytes;
use shared_bus::{handler_fn, BusMessage, MessageHandler, PubSubClient};
use shared_types::{Envelope, Request, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Issues correlated calls over one bus session.
pub struct RemoteCaller {
    client: Arc<dyn PubSubClient>,
    registry: Arc<CorrelationRegistry>,
    request_topic: String,
    timeout: Duration,
    scheme: CorrelationScheme,
}

impl RemoteCaller {
    pub fn new(
        client: Arc<dyn PubSubClient>,
        registry: Arc<CorrelationRegistry>,
        config: &ProviderConfig,
    ) -> Self {
        Self {
            client,
            registry,
            request_topic: config.request_topic.clone(),
            timeout: config.timeout,
            scheme: config.correlation_scheme,
        }
    }

    pub fn client(&self) -> &Arc<dyn PubSubClient> {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Publish `request` and wait for its response.
    ///
    /// `operation` names the call for legacy correlation keys. Any response
    /// that arrives is returned as-is, whatever its state; see
    /// [`into_success`] for the usual interpretation.
    pub async fn call(
        &self,
        operation: &str,
        request: Request,
    ) -> Result<Response, ProviderError> {
        let key = self.scheme.key_for(operation);
        let request = request.with_correlation_key(key.clone());
        let payload = request.encode()?;

        let pending = self
            .registry
            .register(key.clone(), self.timeout)
            .map_err(|e| match e {
                RegistryError::DuplicateKey(key) => ProviderError::CallInFlight { key },
                other => ProviderError::Registry(other),
            })?;

        // On failure the pending call drops here and releases the key.
        self.client
            .publish(&self.request_topic, Bytes::from(payload))
            .await?;

        debug!(
            correlation_id = %key,
            method = %request.method,
            route = %request.route,
            topic = %self.request_topic,
            "Request published"
        );

        match pending.wait().await {
            Ok(response) => {
                debug!(
                    correlation_id = %key,
                    state = %response.state,
                    "Response received"
                );
                Ok(response)
            }
            Err(RegistryError::TimedOut { timeout, .. }) => Err(ProviderError::Timeout {
                method: request.method,
                route: request.route,
                timeout,
            }),
            Err(other) => Err(ProviderError::Registry(other)),
        }
    }
}

/// Turn any state but `Ok` into [`ProviderError::Remote`] carrying the body
/// text.
pub fn into_success(response: Response) -> Result<Response, ProviderError> {
    if response.state.is_success() {
        Ok(response)
    } else {
        Err(ProviderError::Remote {
            state: response.state,
            message: response.body_text(),
        })
    }
}

/// Handler for the response topic.
///
/// Malformed payloads and responses without a correlation key cannot be
/// matched to anything and are dropped.
pub fn response_handler(registry: Arc<CorrelationRegistry>) -> MessageHandler {
    handler_fn(move |message: BusMessage| {
        let registry = Arc::clone(&registry);
        async move {
            let response = match Response::decode(&message.payload) {
                Ok(response) => response,
                Err(e) => {
                    warn!(topic = %message.topic, error = %e, "Dropping malformed response");
                    return;
                }
            };
            let Some(key) = response.correlation_key().map(str::to_owned) else {
                warn!(topic = %message.topic, "Dropping response without correlation key");
                return;
            };
            registry.complete(&key, response);
        }
    })
}
