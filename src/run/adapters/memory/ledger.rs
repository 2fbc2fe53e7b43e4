//! Thread-safe in-memory run ledger.

use crate::issue::domain::RepoCoords;
use crate::run::domain::{
    CorrelationKey, ExternalRunId, IngestedResult, PollObservation, RunKey, RunRecord, RunRecordId,
};
use crate::run::ports::{
    IngestStored, InsertOutcome, PollApplied, RunLedger, RunLedgerError, RunLedgerResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct LedgerState {
    records: HashMap<RunRecordId, RunRecord>,
    key_index: HashMap<RunKey, RunRecordId>,
}

/// In-memory [`RunLedger`] for unit testing.
///
/// Every compound operation runs under one write-lock acquisition, so
/// concurrent callers observe the same atomicity the `PostgreSQL`
/// adapter provides through guarded statements.
#[derive(Clone, Default)]
pub struct InMemoryRunLedger {
    state: Arc<RwLock<LedgerState>>,
}

fn lock_poisoned(err: impl std::fmt::Display) -> RunLedgerError {
    RunLedgerError::persistence(std::io::Error::other(format!(
        "ledger state lock poisoned: {err}"
    )))
}

impl InMemoryRunLedger {
    /// Creates an empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerState {
    fn insert_if_absent(&mut self, record: &RunRecord) -> InsertOutcome {
        if let Some(existing_id) = self.key_index.get(record.key()) {
            if let Some(existing) = self.records.get(existing_id) {
                return InsertOutcome::Existing(existing.clone());
            }
        }
        self.key_index.insert(record.key().clone(), record.id());
        self.records.insert(record.id(), record.clone());
        InsertOutcome::Inserted
    }
}

#[async_trait]
impl RunLedger for InMemoryRunLedger {
    async fn insert_if_absent(&self, record: &RunRecord) -> RunLedgerResult<InsertOutcome> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Ok(state.insert_if_absent(record))
    }

    async fn supersede_failed_start(
        &self,
        predecessor: RunRecordId,
        replacement: &RunRecord,
    ) -> RunLedgerResult<InsertOutcome> {
        let mut state = self.state.write().map_err(lock_poisoned)?;

        let supersedable = state
            .records
            .get(&predecessor)
            .is_some_and(|record| record.is_failed_start() && record.key() == replacement.key());
        if supersedable {
            state.records.remove(&predecessor);
            state.key_index.remove(replacement.key());
        }
        Ok(state.insert_if_absent(replacement))
    }

    async fn find_by_key(&self, key: &RunKey) -> RunLedgerResult<Option<RunRecord>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state
            .key_index
            .get(key)
            .and_then(|id| state.records.get(id))
            .cloned())
    }

    async fn find_by_external_run_id(
        &self,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> RunLedgerResult<Option<RunRecord>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state
            .records
            .values()
            .find(|record| record.repo() == repo && record.external_run_id() == Some(run_id))
            .cloned())
    }

    async fn find_by_correlation(
        &self,
        correlation_key: &CorrelationKey,
    ) -> RunLedgerResult<Vec<RunRecord>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        let mut records: Vec<RunRecord> = state
            .records
            .values()
            .filter(|record| record.correlation_key() == correlation_key)
            .cloned()
            .collect();
        records.sort_by_key(|record| std::cmp::Reverse(record.dispatched_at()));
        Ok(records)
    }

    async fn record_poll(
        &self,
        id: RunRecordId,
        observation: &PollObservation,
    ) -> RunLedgerResult<PollApplied> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let record = state
            .records
            .get_mut(&id)
            .ok_or(RunLedgerError::NotFound(id))?;

        if record.status().is_terminal() {
            return Ok(PollApplied::Stale(record.clone()));
        }
        let is_stale = record
            .last_polled_at()
            .is_some_and(|last| observation.observed_at < last);
        if is_stale {
            return Ok(PollApplied::Stale(record.clone()));
        }

        record.apply_poll(observation);
        Ok(PollApplied::Applied(record.clone()))
    }

    async fn store_ingested(
        &self,
        id: RunRecordId,
        result: &IngestedResult,
        ingested_at: DateTime<Utc>,
    ) -> RunLedgerResult<IngestStored> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let record = state
            .records
            .get_mut(&id)
            .ok_or(RunLedgerError::NotFound(id))?;

        if let Some(existing) = record.ingested() {
            return Ok(IngestStored::AlreadyIngested(existing.clone()));
        }
        record.attach_ingested(result.clone(), ingested_at);
        Ok(IngestStored::Stored(record.clone()))
    }
}
