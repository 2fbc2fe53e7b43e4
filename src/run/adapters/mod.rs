//! Infrastructure adapters for the run module.
//!
//! Concrete implementations of the [`RunLedger`] and [`WorkflowClient`]
//! ports: scriptable in-memory doubles for unit testing and a
//! Diesel-backed `PostgreSQL` ledger for production deployments.
//!
//! [`RunLedger`]: crate::run::ports::RunLedger
//! [`WorkflowClient`]: crate::run::ports::WorkflowClient

pub mod memory;
pub mod postgres;
