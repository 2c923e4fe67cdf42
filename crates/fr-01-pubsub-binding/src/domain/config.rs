//! Binding configuration.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_REQUEST_TOPIC: &str = "coa-request";
pub const DEFAULT_RESPONSE_TOPIC: &str = "coa-response";

/// Where a binding listens and answers.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BindingConfig {
    /// Broker URI, e.g. `tcp://broker:1883`.
    pub broker_address: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    /// Topic requests arrive on.
    pub request_topic: String,
    /// Topic responses are published to.
    pub response_topic: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "keepAliveSeconds")]
    pub keep_alive: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "pingTimeoutSeconds")]
    pub ping_timeout: Duration,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            broker_address: String::new(),
            client_id: String::new(),
            request_topic: DEFAULT_REQUEST_TOPIC.to_string(),
            response_topic: DEFAULT_RESPONSE_TOPIC.to_string(),
            keep_alive: Duration::from_secs(2),
            ping_timeout: Duration::from_secs(1),
        }
    }
}

impl BindingConfig {
    pub fn new(broker_address: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            broker_address: broker_address.into(),
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_topics(
        mut self,
        request_topic: impl Into<String>,
        response_topic: impl Into<String>,
    ) -> Self {
        self.request_topic = request_topic.into();
        self.response_topic = response_topic.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker_address.is_empty() {
            return Err(ConfigError::Missing("brokerAddress"));
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::Missing("clientID"));
        }
        if self.request_topic.is_empty() {
            return Err(ConfigError::Missing("requestTopic"));
        }
        if self.response_topic.is_empty() {
            return Err(ConfigError::Missing("responseTopic"));
        }
        if self.request_topic == self.response_topic {
            // The binding would consume its own responses.
            return Err(ConfigError::Invalid(
                "request and response topics must differ".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required setting '{0}'")]
    Missing(&'static str),
    #[error("duplicate endpoint: {method} {route}")]
    DuplicateEndpoint { method: String, route: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
