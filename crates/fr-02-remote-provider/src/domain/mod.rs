//! Domain types for the remote provider.
//!
//! Configuration, correlation keys, the correlation registry and errors.

pub mod config;
pub mod correlation;
pub mod error;
pub mod pending;

// Re-exports for convenience
pub use config::{ConfigError, ProviderConfig};
pub use correlation::{CorrelationId, CorrelationScheme};
pub use error::{ProviderError, RegistryError};
pub use pending::{CorrelationRegistry, PendingCall, RegistryStats};
