//! Correlation keys for matching responses to calls.
//!
//! The default scheme mints a UUID v7 per call. The legacy scheme reuses a
//! fixed tag per operation kind, which only stays correct while at most one
//! call of each kind is in flight.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix of the legacy per-operation keys, e.g. `TargetProvider-Get`.
pub const LEGACY_KEY_PREFIX: &str = "TargetProvider-";

/// Unique identifier for one outbound call.
///
/// UUID v7 is time-ordered, so keys sort by creation time in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new correlation ID (UUID v7)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Milliseconds since the Unix epoch encoded in the ID.
    pub fn timestamp_ms(&self) -> Option<u64> {
        let (secs, nanos) = self.0.get_timestamp()?.to_unix();
        Some(secs * 1000 + u64::from(nanos) / 1_000_000)
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// How a provider picks the correlation key for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CorrelationScheme {
    /// Fresh [`CorrelationId`] per call; any number of calls may overlap.
    #[default]
    PerCall,
    /// Fixed `TargetProvider-<Operation>` key, for responders that echo a
    /// hard-coded tag. One call per operation kind at a time.
    OperationName,
}

impl CorrelationScheme {
    /// Key for a new call of `operation` (`Get`, `Apply`, `Remove`, ...).
    pub fn key_for(self, operation: &str) -> String {
        match self {
            Self::PerCall => CorrelationId::new().to_string(),
            Self::OperationName => format!("{LEGACY_KEY_PREFIX}{operation}"),
        }
    }

    /// Parse the textual form used in property maps.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "percall" | "per-call" | "unique" => Some(Self::PerCall),
            "operationname" | "operation-name" | "legacy" => Some(Self::OperationName),
            _ => None,
        }
    }
}
