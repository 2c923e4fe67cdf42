//! Domain types for the binding.

pub mod config;
pub mod endpoint;
pub mod error;

// Re-exports for convenience
pub use config::{BindingConfig, ConfigError};
pub use endpoint::{Endpoint, EndpointHandler, HandlerError, HandlerResult};
pub use error::BindingError;
