//! Provider configuration with validation.
//!
//! Field names match the JSON form targets are already configured with
//! (`brokerAddress`, `clientID`, `timeoutSeconds`, ...).

use crate::domain::correlation::CorrelationScheme;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_REQUEST_TOPIC: &str = "coa-request";
pub const DEFAULT_RESPONSE_TOPIC: &str = "coa-response";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(2);
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(1);
/// Longest accepted call timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Configuration for one remote provider instance.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Provider instance name, used in logs.
    pub name: String,
    /// Broker URI, e.g. `tcp://broker:1883`.
    pub broker_address: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub request_topic: String,
    pub response_topic: String,
    /// Deadline for each call.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "timeoutSeconds")]
    pub timeout: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "keepAliveSeconds")]
    pub keep_alive: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "pingTimeoutSeconds")]
    pub ping_timeout: Duration,
    pub correlation_scheme: CorrelationScheme,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            broker_address: String::new(),
            client_id: String::new(),
            request_topic: DEFAULT_REQUEST_TOPIC.to_string(),
            response_topic: DEFAULT_RESPONSE_TOPIC.to_string(),
            timeout: DEFAULT_TIMEOUT,
            keep_alive: DEFAULT_KEEP_ALIVE,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            correlation_scheme: CorrelationScheme::default(),
        }
    }
}

impl ProviderConfig {
    /// Minimal configuration for `broker_address` as `client_id`.
    pub fn new(broker_address: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            broker_address: broker_address.into(),
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
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

    #[must_use]
    pub fn with_correlation_scheme(mut self, scheme: CorrelationScheme) -> Self {
        self.correlation_scheme = scheme;
        self
    }

    /// Build from a flat string property map.
    ///
    /// Missing keys keep their defaults; present numeric keys must parse.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let text = |key: &str| properties.get(key).map(|v| v.trim().to_string());

        if let Some(name) = text("name") {
            config.name = name;
        }
        if let Some(address) = text("brokerAddress") {
            config.broker_address = address;
        }
        if let Some(client_id) = text("clientID") {
            config.client_id = client_id;
        }
        if let Some(topic) = text("requestTopic") {
            config.request_topic = topic;
        }
        if let Some(topic) = text("responseTopic") {
            config.response_topic = topic;
        }
        if let Some(seconds) = seconds_property(properties, "timeoutSeconds")? {
            config.timeout = seconds;
        }
        if let Some(seconds) = seconds_property(properties, "keepAliveSeconds")? {
            config.keep_alive = seconds;
        }
        if let Some(seconds) = seconds_property(properties, "pingTimeoutSeconds")? {
            config.ping_timeout = seconds;
        }
        if let Some(scheme) = text("correlationScheme") {
            config.correlation_scheme =
                CorrelationScheme::parse(&scheme).ok_or(ConfigError::UnknownScheme(scheme))?;
        }

        Ok(config)
    }

    /// Validate configuration
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
            return Err(ConfigError::Invalid(
                "request and response topics must differ".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "call timeout cannot be 0".into(),
            ));
        }
        if self.timeout > MAX_TIMEOUT {
            return Err(ConfigError::InvalidTimeout(format!(
                "call timeout {}s exceeds the {}s limit",
                self.timeout.as_secs(),
                MAX_TIMEOUT.as_secs()
            )));
        }
        Ok(())
    }
}

fn seconds_property(
    properties: &HashMap<String, String>,
    key: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = properties.get(key) else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<u64>()
        .map(|secs| Some(Duration::from_secs(secs)))
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        })
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required setting '{0}'")]
    Missing(&'static str),
    #[error("setting '{key}' must be a whole number of seconds, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("unknown correlation scheme '{0}'")]
    UnknownScheme(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
