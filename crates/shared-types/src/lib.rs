//! # Shared Types Crate
//!
//! This crate contains the bus envelope (`Request`/`Response`), the envelope
//! codec and the deployment model that remote providers and target agents
//! exchange over the publish/subscribe bus.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Everything that crosses the wire is defined here.
//! - **Self-describing envelope**: JSON with base64 bodies, readable by any
//!   client that speaks the same field names.
//! - **Correlation in metadata**: The correlation key travels in the envelope
//!   metadata under [`CORRELATION_KEY`], never in the body.

pub mod entities;
pub mod envelope;
pub mod errors;

pub use entities::*;
pub use envelope::{Envelope, Request, Response, State, CORRELATION_KEY};
pub use errors::ProtocolError;
