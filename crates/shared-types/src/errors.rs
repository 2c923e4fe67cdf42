//! # Error Types
//!
//! Errors raised while encoding or decoding bus envelopes.

use thiserror::Error;

/// Errors from the envelope codec.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload is not a well-formed envelope.
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The envelope could not be serialized.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),

    /// The envelope body does not match the expected payload type.
    #[error("malformed body: {0}")]
    Body(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Whether the error came from decoding inbound bytes.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::Body(_))
    }
}
