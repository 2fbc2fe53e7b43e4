//! Port contracts for issue lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by issue services.

pub mod repository;

pub use repository::{IssueRepository, IssueRepositoryError, IssueRepositoryResult, UpdateOutcome};
