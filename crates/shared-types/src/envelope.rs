//! # Request/Response Envelope
//!
//! The two structures exchanged over the bus, and the codec that turns them
//! into bytes.
//!
//! ## Wire Format
//!
//! Envelopes are JSON documents. Bodies are opaque bytes and travel as
//! standard (padded) base64 text; a `null` or missing body decodes to an
//! empty body. The response `state` is a numeric, HTTP-like result code.
//!
//! ```text
//! Request  { "method": "GET", "route": "instances", "body": "e30=",
//!            "metadata": { "call-context": "0190..." } }
//! Response { "state": 200, "body": "W10=",
//!            "metadata": { "call-context": "0190..." } }
//! ```
//!
//! ## Correlation
//!
//! Every request carries its correlation key in `metadata` under
//! [`CORRELATION_KEY`]. Responders echo it back unchanged.

use crate::errors::ProtocolError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as, DefaultOnNull};
use std::collections::HashMap;
use std::fmt;

/// Metadata field that carries the correlation key.
pub const CORRELATION_KEY: &str = "call-context";

/// Result code of a [`Response`].
///
/// Anything other than [`State::Ok`] is a remote-reported failure,
/// [`State::Accepted`] included. Codes without a named variant are preserved
/// in [`State::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum State {
    #[default]
    Ok,
    Accepted,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Conflict,
    InternalError,
    NotImplemented,
    ServiceUnavailable,
    /// A code this build has no name for.
    Other(u16),
}

impl State {
    /// Numeric wire code.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Accepted => 202,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::Conflict => 409,
            Self::InternalError => 500,
            Self::NotImplemented => 501,
            Self::ServiceUnavailable => 503,
            Self::Other(code) => code,
        }
    }

    /// Whether this state reports success. Only `Ok` does.
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Ok
    }

    /// State of a response that carries no `state` field on the wire.
    #[must_use]
    pub fn unset() -> Self {
        Self::Other(0)
    }
}

impl From<u16> for State {
    fn from(code: u16) -> Self {
        match code {
            200 => Self::Ok,
            202 => Self::Accepted,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            409 => Self::Conflict,
            500 => Self::InternalError,
            501 => Self::NotImplemented,
            503 => Self::ServiceUnavailable,
            other => Self::Other(other),
        }
    }
}

impl From<State> for u16 {
    fn from(state: State) -> Self {
        state.code()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "State({code})"),
            named => write!(f, "{named:?}"),
        }
    }
}

/// Codec shared by both envelope structures.
pub trait Envelope: Serialize + DeserializeOwned + Sized {
    /// Serialize to wire bytes.
    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }

    /// Parse wire bytes.
    ///
    /// # Errors
    ///
    /// `ProtocolError::Malformed` when the payload is not a valid envelope.
    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(bytes).map_err(ProtocolError::Malformed)
    }

    /// Envelope metadata.
    fn metadata(&self) -> &HashMap<String, String>;

    /// The correlation key, if present.
    fn correlation_key(&self) -> Option<&str> {
        self.metadata().get(CORRELATION_KEY).map(String::as_str)
    }
}

/// Best-effort extraction of the correlation key from a payload that failed
/// to decode as an envelope.
///
/// Returns `None` when the payload is not JSON at all or carries no string
/// key under `metadata.call-context`.
#[must_use]
pub fn salvage_correlation_key(bytes: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    value
        .get("metadata")?
        .get(CORRELATION_KEY)?
        .as_str()
        .map(str::to_owned)
}

/// A call published on the request topic.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Verb, e.g. `GET`, `POST`, `DELETE`.
    #[serde(default)]
    pub method: String,
    /// Logical endpoint name.
    #[serde(default)]
    pub route: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    /// Opaque payload, typically JSON.
    #[serde_as(as = "DefaultOnNull<Base64>")]
    #[serde(default)]
    pub body: Vec<u8>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, String>,
}

impl Request {
    /// Create a request with no body.
    pub fn new(method: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            route: route.into(),
            ..Self::default()
        }
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// `ProtocolError::Encode` when the value cannot be serialized.
    pub fn with_json_body<T: Serialize>(mut self, value: &T) -> Result<Self, ProtocolError> {
        self.body = serde_json::to_vec(value).map_err(ProtocolError::Encode)?;
        self.content_type = "application/json".to_string();
        Ok(self)
    }

    /// Set the correlation key.
    #[must_use]
    pub fn with_correlation_key(mut self, key: impl Into<String>) -> Self {
        self.metadata.insert(CORRELATION_KEY.to_string(), key.into());
        self
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// `ProtocolError::Body` when the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_slice(&self.body).map_err(ProtocolError::Body)
    }
}

impl Envelope for Request {
    fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }
}

/// The answer published on the response topic.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    /// Result payload on success, error text on failure.
    #[serde_as(as = "DefaultOnNull<Base64>")]
    #[serde(default)]
    pub body: Vec<u8>,
    /// A missing field decodes as [`State::unset`], a failure.
    #[serde(default = "State::unset")]
    pub state: State,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Response {
    /// A successful response carrying `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            state: State::Ok,
            ..Self::default()
        }
    }

    /// A successful response with a JSON body.
    ///
    /// # Errors
    ///
    /// `ProtocolError::Encode` when the value cannot be serialized.
    pub fn json_ok<T: Serialize>(value: &T) -> Result<Self, ProtocolError> {
        let body = serde_json::to_vec(value).map_err(ProtocolError::Encode)?;
        Ok(Self {
            content_type: "application/json".to_string(),
            ..Self::ok(body)
        })
    }

    /// A failure response whose body is the error text.
    pub fn error(state: State, message: impl Into<String>) -> Self {
        Self {
            content_type: "text/plain".to_string(),
            body: message.into().into_bytes(),
            state,
            ..Self::default()
        }
    }

    /// Set the correlation key.
    #[must_use]
    pub fn with_correlation_key(mut self, key: impl Into<String>) -> Self {
        self.metadata.insert(CORRELATION_KEY.to_string(), key.into());
        self
    }

    /// Body as text, lossily decoded.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// `ProtocolError::Body` when the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_slice(&self.body).map_err(ProtocolError::Body)
    }
}

impl Envelope for Response {
    fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }
}
