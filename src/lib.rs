//! Fabrica: issue fabrication pipeline.
//!
//! This crate coordinates canonical issue records, their external tracker
//! mirrors, and the workflow runs that fabricate implementations, keeping
//! every state change validated and every external side effect idempotent.
//!
//! # Architecture
//!
//! Fabrica follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, APIs, etc.)
//!
//! # Modules
//!
//! - [`issue`]: Canonical issue records and the lifecycle state machine
//! - [`mirror`]: Resolution and templating of external tracker mirrors
//! - [`run`]: Workflow run dispatch, polling, and result ingestion
//! - [`pipeline`]: End-to-end orchestration across the other contexts

pub mod issue;
pub mod mirror;
pub mod pipeline;
pub mod run;
