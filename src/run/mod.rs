//! External workflow run tracking.
//!
//! An issue entering implementation dispatches a CI workflow at most
//! once per idempotency key. This module owns that guarantee: the
//! fire-and-forget trigger, the bounded locate-run loop, the append-only
//! dispatch ledger, recency-guarded status polling, and exactly-once
//! ingestion of terminal results. The module follows hexagonal
//! architecture:
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
