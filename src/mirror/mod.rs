//! Mirror resolution against the external tracker.
//!
//! A canonical issue owns at most one external mirror artifact. This
//! module finds that artifact without ever creating duplicates: exact
//! marker parsing over a repo-scoped literal search, deterministic
//! precedence, and no side effects. It also renders the marker-bearing
//! documents the surrounding creator publishes. The module follows
//! hexagonal architecture:
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
