//! Port contracts for mirror resolution.
//!
//! Ports define infrastructure-agnostic interfaces used by the resolver.

pub mod tracker;

pub use tracker::{TrackerClient, TrackerError, TrackerResult};
