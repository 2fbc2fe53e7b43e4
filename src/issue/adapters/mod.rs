//! Persistence adapters for the issue module.
//!
//! Concrete implementations of the [`IssueRepository`] port: a thread-safe
//! in-memory store for unit testing and a Diesel-backed `PostgreSQL`
//! repository for production deployments.
//!
//! [`IssueRepository`]: crate::issue::ports::IssueRepository

pub mod memory;
pub mod postgres;
