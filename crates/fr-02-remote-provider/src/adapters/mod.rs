//! Adapters between the provider and the bus.

pub mod bus_adapter;

pub use bus_adapter::{into_success, response_handler, RemoteCaller};
