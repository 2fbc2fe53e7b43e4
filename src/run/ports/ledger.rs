//! Run ledger port: the single source of truth for dispatch idempotency.

use crate::issue::domain::RepoCoords;
use crate::run::domain::{
    CorrelationKey, ExternalRunId, IngestedResult, PollObservation, RunKey, RunRecord, RunRecordId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for run ledger operations.
pub type RunLedgerResult<T> = Result<T, RunLedgerError>;

/// Outcome of an insert-if-absent or supersession attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was inserted; this writer owns the key.
    Inserted,
    /// Another record already holds the key; the caller must use it.
    Existing(RunRecord),
}

/// Outcome of applying a poll observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollApplied {
    /// The observation was applied; the updated record is returned.
    Applied(RunRecord),
    /// The observation was older than the stored state or the stored
    /// status was terminal; the untouched record is returned.
    Stale(RunRecord),
}

/// Outcome of attaching an ingest payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStored {
    /// The payload was attached; the frozen record is returned.
    Stored(RunRecord),
    /// A payload was already attached; the stored payload is returned.
    AlreadyIngested(IngestedResult),
}

/// Run record persistence contract.
///
/// Every compound operation is atomic: two writers racing on the same
/// key or record observe a total order, never interleaved halves. All
/// mutation timestamps are caller-captured so replicas agree with the
/// recency rule regardless of write arrival order.
#[async_trait]
pub trait RunLedger: Send + Sync {
    /// Inserts a record unless its key is already taken.
    ///
    /// # Errors
    ///
    /// Returns [`RunLedgerError::Persistence`] when the underlying store
    /// fails.
    async fn insert_if_absent(&self, record: &RunRecord) -> RunLedgerResult<InsertOutcome>;

    /// Atomically replaces a failed-to-start record with a fresh dispatch
    /// under the same key.
    ///
    /// When the predecessor is gone or is not a failed start, the current
    /// key holder is returned as [`InsertOutcome::Existing`]; when the
    /// key is entirely vacant the replacement is inserted.
    ///
    /// # Errors
    ///
    /// Returns [`RunLedgerError::Persistence`] when the underlying store
    /// fails.
    async fn supersede_failed_start(
        &self,
        predecessor: RunRecordId,
        replacement: &RunRecord,
    ) -> RunLedgerResult<InsertOutcome>;

    /// Finds the record holding an idempotency key.
    async fn find_by_key(&self, key: &RunKey) -> RunLedgerResult<Option<RunRecord>>;

    /// Finds the record tracking an external run.
    async fn find_by_external_run_id(
        &self,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> RunLedgerResult<Option<RunRecord>>;

    /// Returns all records sharing a correlation key, newest dispatch
    /// first.
    async fn find_by_correlation(
        &self,
        correlation_key: &CorrelationKey,
    ) -> RunLedgerResult<Vec<RunRecord>>;

    /// Applies a poll observation under the recency and terminality
    /// guards.
    ///
    /// The observation lands only when its capture time is not older than
    /// the record's last applied observation and the stored status is
    /// non-terminal; a terminal stored status is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`RunLedgerError::NotFound`] when the record does not
    /// exist.
    async fn record_poll(
        &self,
        id: RunRecordId,
        observation: &PollObservation,
    ) -> RunLedgerResult<PollApplied>;

    /// Attaches an ingest payload unless one is already attached.
    ///
    /// # Errors
    ///
    /// Returns [`RunLedgerError::NotFound`] when the record does not
    /// exist.
    async fn store_ingested(
        &self,
        id: RunRecordId,
        result: &IngestedResult,
        ingested_at: DateTime<Utc>,
    ) -> RunLedgerResult<IngestStored>;
}

/// Errors returned by run ledger implementations.
#[derive(Debug, Clone, Error)]
pub enum RunLedgerError {
    /// The record was not found.
    #[error("run record not found: {0}")]
    NotFound(RunRecordId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RunLedgerError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
