//! Canonical issue lifecycle management.
//!
//! This module owns the system-of-record issue aggregate: creating issues
//! keyed by canonical identifier, enforcing validated state transitions
//! through the delivery pipeline, and binding weak references to tracker
//! mirrors. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
