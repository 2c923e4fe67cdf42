//! Binding error types.

use crate::domain::config::ConfigError;
use shared_bus::TransportError;
use thiserror::Error;

/// Binding-level errors
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// `launch` was called on a running binding.
    #[error("binding is already launched")]
    AlreadyLaunched,
}
