//! Diesel row models for run ledger persistence.

use super::schema::run_records;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for run records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = run_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RunRecordRow {
    /// Internal record identifier.
    pub id: uuid::Uuid,
    /// Correlation key component of the idempotency key.
    pub correlation_key: String,
    /// Workflow component of the idempotency key.
    pub workflow_id: String,
    /// Repository owner segment.
    pub repo_owner: String,
    /// Repository name segment.
    pub repo_name: String,
    /// Git reference the workflow ran against.
    pub git_ref: String,
    /// Provider run identifier; null for failed starts.
    pub external_run_id: Option<i64>,
    /// Run browse URL.
    pub run_url: Option<String>,
    /// Normalized run status.
    pub status: String,
    /// Raw provider status from the latest applied poll.
    pub raw_status: Option<String>,
    /// Raw provider conclusion from the latest applied poll.
    pub raw_conclusion: Option<String>,
    /// Dispatch timestamp.
    pub dispatched_at: DateTime<Utc>,
    /// Latest applied observation timestamp.
    pub last_polled_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Attached ingest payload.
    pub ingested: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for run records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = run_records)]
pub struct NewRunRecordRow {
    /// Internal record identifier.
    pub id: uuid::Uuid,
    /// Correlation key component of the idempotency key.
    pub correlation_key: String,
    /// Workflow component of the idempotency key.
    pub workflow_id: String,
    /// Repository owner segment.
    pub repo_owner: String,
    /// Repository name segment.
    pub repo_name: String,
    /// Git reference the workflow ran against.
    pub git_ref: String,
    /// Provider run identifier; null for failed starts.
    pub external_run_id: Option<i64>,
    /// Run browse URL.
    pub run_url: Option<String>,
    /// Normalized run status.
    pub status: String,
    /// Raw provider status from the latest applied poll.
    pub raw_status: Option<String>,
    /// Raw provider conclusion from the latest applied poll.
    pub raw_conclusion: Option<String>,
    /// Dispatch timestamp.
    pub dispatched_at: DateTime<Utc>,
    /// Latest applied observation timestamp.
    pub last_polled_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Attached ingest payload.
    pub ingested: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
