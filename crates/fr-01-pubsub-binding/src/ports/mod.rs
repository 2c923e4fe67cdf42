//! Ports for the binding.

pub mod inbound;

pub use inbound::Binding;
