//! Agent configuration from the environment or a JSON file.

use fr_01_pubsub_binding::{BindingConfig, ConfigError};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_BROKER_ADDRESS: &str = "FLEET_BROKER_ADDRESS";
pub const ENV_CLIENT_ID: &str = "FLEET_CLIENT_ID";
pub const ENV_REQUEST_TOPIC: &str = "FLEET_REQUEST_TOPIC";
pub const ENV_RESPONSE_TOPIC: &str = "FLEET_RESPONSE_TOPIC";

pub const DEFAULT_BROKER_ADDRESS: &str = "tcp://localhost:1883";
pub const DEFAULT_CLIENT_ID: &str = "fleet-agent";

#[derive(Debug, Error)]
pub enum AgentConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Validated agent settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub binding: BindingConfig,
}

impl AgentConfig {
    /// Read `FLEET_*` variables, falling back to a local MQTT broker.
    pub fn from_env() -> Result<Self, AgentConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AgentConfigError> {
        let mut binding = BindingConfig::new(
            lookup(ENV_BROKER_ADDRESS).unwrap_or_else(|| DEFAULT_BROKER_ADDRESS.to_string()),
            lookup(ENV_CLIENT_ID).unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
        );
        if let Some(topic) = lookup(ENV_REQUEST_TOPIC) {
            binding.request_topic = topic;
        }
        if let Some(topic) = lookup(ENV_RESPONSE_TOPIC) {
            binding.response_topic = topic;
        }
        Self::validated(binding)
    }

    /// Binding settings as JSON (`brokerAddress`, `clientID`, ...).
    pub fn from_json(text: &str) -> Result<Self, AgentConfigError> {
        Self::validated(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AgentConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AgentConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    fn validated(binding: BindingConfig) -> Result<Self, AgentConfigError> {
        binding.validate()?;
        Ok(Self { binding })
    }
}
