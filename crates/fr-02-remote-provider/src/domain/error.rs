//! Remote provider error types.

use crate::domain::config::ConfigError;
use shared_bus::TransportError;
use shared_types::{ProtocolError, State};
use std::time::Duration;
use thiserror::Error;

/// Failures of the correlation registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A live call already holds this key.
    #[error("correlation key '{0}' is already in flight")]
    DuplicateKey(String),

    /// No response matched before the deadline.
    #[error("no response for '{key}' within {timeout:?}")]
    TimedOut { key: String, timeout: Duration },

    /// The deadline `timeout` from now does not fit in a clock instant.
    #[error("timeout {0:?} is too large")]
    InvalidTimeout(Duration),

    /// The entry was removed without a response, e.g. the registry was cleared.
    #[error("call '{0}' was abandoned before a response arrived")]
    Abandoned(String),
}

/// Errors surfaced by provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The bus rejected a connect, subscribe or publish.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No matching response arrived in time.
    #[error("{method} {route} timed out after {timeout:?}")]
    Timeout {
        method: String,
        route: String,
        timeout: Duration,
    },

    /// The target answered with a failure state.
    ///
    /// Displays the remote body verbatim.
    #[error("{message}")]
    Remote { state: State, message: String },

    /// A request could not be encoded or a response body could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Legacy correlation only: a call of this kind is still waiting.
    #[error("a call with key '{key}' is already in flight")]
    CallInFlight { key: String },

    /// An operation ran before `init`.
    #[error("provider is not initialized")]
    NotInitialized,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("registry error: {0}")]
    Registry(RegistryError),
}

impl ProviderError {
    /// Whether repeating the call might succeed.
    ///
    /// Retrying is left to callers; this layer never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport(_))
    }

    /// Whether the target itself reported the failure.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Remote state, if the target reported one.
    pub fn remote_state(&self) -> Option<State> {
        match self {
            Self::Remote { state, .. } => Some(*state),
            _ => None,
        }
    }
}
