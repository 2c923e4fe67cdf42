//! FR-01 Pub/Sub Binding - serves endpoints over a publish/subscribe bus.
//!
//! ```text
//! request topic ──→ PubSubBinding ──→ Router ──→ Endpoint handler
//!                                                      │
//! response topic ◄── Response (call-context echoed) ◄──┘
//! ```
//!
//! Every inbound message produces exactly one response:
//!
//! | Inbound | Response state |
//! |---------|----------------|
//! | Matching endpoint, handler ok | handler's response (usually `Ok`) |
//! | Matching endpoint, handler error | handler's failure state |
//! | Handler panic | `InternalError` |
//! | No endpoint for method + route | `NotFound` |
//! | Undecodable payload | `InternalError`, key salvaged if possible |
//!
//! The binding holds no per-call state; ordering between responses to
//! concurrently received requests is not defined.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod ports;
pub mod router;
pub mod service;

pub use domain::{
    BindingConfig, BindingError, ConfigError, Endpoint, EndpointHandler, HandlerError,
    HandlerResult,
};
pub use ports::Binding;
pub use router::Router;
pub use service::PubSubBinding;
