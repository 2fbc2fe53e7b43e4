//! Run ledger record aggregate.

use super::{
    CorrelationKey, ExternalRunId, IngestedResult, PollObservation, RawRunSnapshot, RunKey,
    RunRecordId, RunStatus,
};
use crate::issue::domain::RepoCoords;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// One dispatched (or failed-to-start) external run.
///
/// Records are keyed by [`RunKey`]; the ledger holds at most one record
/// per key. A record whose dispatch never became visible is persisted
/// with [`RunStatus::Failed`] and no external run identifier; such
/// failed-start records are the only kind a later dispatch may
/// supersede. Once an ingest payload is attached the record is never
/// mutated again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    id: RunRecordId,
    key: RunKey,
    repo: RepoCoords,
    git_ref: String,
    external_run_id: Option<ExternalRunId>,
    run_url: Option<String>,
    status: RunStatus,
    raw: Option<RawRunSnapshot>,
    dispatched_at: DateTime<Utc>,
    last_polled_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    ingested: Option<IngestedResult>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for a freshly located dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedRun {
    /// Idempotency key the dispatch was issued under.
    pub key: RunKey,
    /// Repository the workflow ran in.
    pub repo: RepoCoords,
    /// Git reference the workflow ran against.
    pub git_ref: String,
    /// Run identifier assigned by the provider.
    pub external_run_id: ExternalRunId,
    /// Run browse URL, when the provider reports one.
    pub run_url: Option<String>,
}

/// Parameter object for reconstructing a persisted run record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRunRecordData {
    /// Persisted record identifier.
    pub id: RunRecordId,
    /// Persisted idempotency key.
    pub key: RunKey,
    /// Persisted repository coordinates.
    pub repo: RepoCoords,
    /// Persisted git reference.
    pub git_ref: String,
    /// Persisted external run identifier, if the run became visible.
    pub external_run_id: Option<ExternalRunId>,
    /// Persisted run browse URL.
    pub run_url: Option<String>,
    /// Persisted normalized status.
    pub status: RunStatus,
    /// Persisted provider snapshot from the latest applied poll.
    pub raw: Option<RawRunSnapshot>,
    /// Persisted dispatch timestamp.
    pub dispatched_at: DateTime<Utc>,
    /// Persisted latest applied observation timestamp.
    pub last_polled_at: Option<DateTime<Utc>>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted ingest payload.
    pub ingested: Option<IngestedResult>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl RunRecord {
    /// Creates a record for a dispatch whose run has been located.
    #[must_use]
    pub fn dispatched(data: DispatchedRun, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: RunRecordId::new(),
            key: data.key,
            repo: data.repo,
            git_ref: data.git_ref,
            external_run_id: Some(data.external_run_id),
            run_url: data.run_url,
            status: RunStatus::Queued,
            raw: None,
            dispatched_at: timestamp,
            last_polled_at: None,
            completed_at: None,
            ingested: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Creates an audit record for a dispatch whose run never became
    /// visible.
    #[must_use]
    pub fn failed_start(
        key: RunKey,
        repo: RepoCoords,
        git_ref: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: RunRecordId::new(),
            key,
            repo,
            git_ref: git_ref.into(),
            external_run_id: None,
            run_url: None,
            status: RunStatus::Failed,
            raw: None,
            dispatched_at: timestamp,
            last_polled_at: None,
            completed_at: None,
            ingested: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a record from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedRunRecordData) -> Self {
        Self {
            id: data.id,
            key: data.key,
            repo: data.repo,
            git_ref: data.git_ref,
            external_run_id: data.external_run_id,
            run_url: data.run_url,
            status: data.status,
            raw: data.raw,
            dispatched_at: data.dispatched_at,
            last_polled_at: data.last_polled_at,
            completed_at: data.completed_at,
            ingested: data.ingested,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the record identifier.
    #[must_use]
    pub const fn id(&self) -> RunRecordId {
        self.id
    }

    /// Returns the idempotency key.
    #[must_use]
    pub const fn key(&self) -> &RunKey {
        &self.key
    }

    /// Returns the correlation key component of the idempotency key.
    #[must_use]
    pub const fn correlation_key(&self) -> &CorrelationKey {
        self.key.correlation_key()
    }

    /// Returns the repository the workflow ran in.
    #[must_use]
    pub const fn repo(&self) -> &RepoCoords {
        &self.repo
    }

    /// Returns the git reference the workflow ran against.
    #[must_use]
    pub fn git_ref(&self) -> &str {
        &self.git_ref
    }

    /// Returns the external run identifier, absent for failed starts.
    #[must_use]
    pub const fn external_run_id(&self) -> Option<ExternalRunId> {
        self.external_run_id
    }

    /// Returns the run browse URL.
    #[must_use]
    pub fn run_url(&self) -> Option<&str> {
        self.run_url.as_deref()
    }

    /// Returns the normalized run status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns the provider snapshot from the latest applied poll.
    #[must_use]
    pub const fn raw(&self) -> Option<&RawRunSnapshot> {
        self.raw.as_ref()
    }

    /// Returns when the dispatch was issued.
    #[must_use]
    pub const fn dispatched_at(&self) -> DateTime<Utc> {
        self.dispatched_at
    }

    /// Returns the latest applied observation timestamp.
    #[must_use]
    pub const fn last_polled_at(&self) -> Option<DateTime<Utc>> {
        self.last_polled_at
    }

    /// Returns when the run reached its terminal state.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the attached ingest payload, if any.
    #[must_use]
    pub const fn ingested(&self) -> Option<&IngestedResult> {
        self.ingested.as_ref()
    }

    /// Returns when the record was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the record was last mutated.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether this records a dispatch that never became visible.
    #[must_use]
    pub const fn is_failed_start(&self) -> bool {
        matches!(self.status, RunStatus::Failed) && self.external_run_id.is_none()
    }

    /// Applies a poll observation.
    ///
    /// Callers own the recency and terminality guards; this method
    /// overwrites unconditionally. The observation timestamp becomes the
    /// record's mutation timestamp so replicas ordering by `updated_at`
    /// agree with the recency rule.
    pub fn apply_poll(&mut self, observation: &PollObservation) {
        self.status = observation.status;
        self.raw = Some(observation.raw.clone());
        if observation.run_url.is_some() {
            self.run_url.clone_from(&observation.run_url);
        }
        self.last_polled_at = Some(observation.observed_at);
        if observation.status.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(observation.observed_at);
        }
        self.updated_at = observation.observed_at;
    }

    /// Attaches the ingest payload, freezing the record.
    pub fn attach_ingested(&mut self, result: IngestedResult, ingested_at: DateTime<Utc>) {
        self.ingested = Some(result);
        self.updated_at = ingested_at;
    }
}
