//! Ports for the remote provider.

pub mod inbound;

pub use inbound::TargetProvider;
