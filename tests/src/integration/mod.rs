//! Binding and provider wired over one broker.

#[cfg(test)]
mod harness;

pub mod agent;
pub mod correlation;
pub mod lifecycle;
pub mod scenarios;
