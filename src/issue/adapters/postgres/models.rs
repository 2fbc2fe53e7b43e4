//! Diesel row models for issue persistence.

use super::schema::issues;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for issue records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = issues)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IssueRow {
    /// Internal issue identifier.
    pub id: uuid::Uuid,
    /// Canonical identifier.
    pub canonical_id: String,
    /// Lifecycle state.
    pub state: String,
    /// Optional mirror reference payload.
    pub mirror: Option<Value>,
    /// Optimistic-concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for issue records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = issues)]
pub struct NewIssueRow {
    /// Internal issue identifier.
    pub id: uuid::Uuid,
    /// Canonical identifier.
    pub canonical_id: String,
    /// Lifecycle state.
    pub state: String,
    /// Optional mirror reference payload.
    pub mirror: Option<Value>,
    /// Optimistic-concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
