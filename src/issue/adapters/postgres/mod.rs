//! `PostgreSQL` adapters for issue lifecycle persistence.

mod models;
mod repository;
mod schema;

pub use repository::{IssuePgPool, PostgresIssueRepository};
