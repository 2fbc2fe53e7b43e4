//! Idempotent dispatch, poll, and ingest orchestration for external runs.

use crate::issue::domain::RepoCoords;
use crate::run::{
    domain::{
        ArtifactMeta, CorrelationKey, DispatchedRun, ExternalRunId, IngestedResult, JobResult,
        PollObservation, RawRunSnapshot, RunDomainError, RunKey, RunRecord, RunRecordId, RunStatus,
        RunSummary, WorkflowId,
    },
    ports::{
        CORRELATION_TOKEN_INPUT, IngestStored, InsertOutcome, PollApplied, RunFilter, RunLedger,
        RunLedgerError, WorkflowArtifact, WorkflowClient, WorkflowError, WorkflowInputs,
        WorkflowJob, WorkflowResult, WorkflowRun,
    },
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Retry policy covering the locate-run loop and read-path provider
/// calls.
///
/// The safety margin widens the locate filter's creation cutoff so a run
/// the provider timestamps slightly before the trigger round-trip is not
/// filtered away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts for one retryable operation.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
    /// Slack subtracted from the trigger time when filtering candidate
    /// runs by creation time.
    pub safety_margin: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
            safety_margin: Duration::from_secs(60),
        }
    }
}

/// Parameter object for one dispatch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Repository hosting the workflow.
    pub repo: RepoCoords,
    /// Workflow to trigger.
    pub workflow_id: WorkflowId,
    /// Git reference to run against.
    pub git_ref: String,
    /// Caller-chosen idempotency scope for this dispatch.
    pub correlation_key: CorrelationKey,
    /// Additional trigger inputs.
    pub inputs: WorkflowInputs,
    /// Instant after which the dispatch is abandoned without a trace.
    pub deadline: Option<DateTime<Utc>>,
}

impl DispatchRequest {
    /// Returns the idempotency key this request dispatches under.
    #[must_use]
    pub fn key(&self) -> RunKey {
        RunKey::new(self.correlation_key.clone(), self.workflow_id.clone())
    }
}

/// Outcome of a dispatch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// The ledger record the dispatch settled on.
    pub record: RunRecord,
    /// Whether the record came from an earlier dispatch rather than this
    /// call.
    pub is_existing: bool,
}

/// Errors returned by dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] RunLedgerError),
    /// Workflow provider call failed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    /// The trigger was accepted but no matching run became visible.
    #[error("run for {key} not visible after {attempts} locate attempts")]
    RunNotVisible {
        /// Idempotency key the dispatch was issued under.
        key: RunKey,
        /// Locate attempts that were made.
        attempts: u32,
    },
    /// The deadline passed before the dispatch settled.
    #[error("dispatch for {key} cancelled at its deadline")]
    Cancelled {
        /// Idempotency key the dispatch was issued under.
        key: RunKey,
    },
}

/// Errors returned by poll operations.
#[derive(Debug, Error)]
pub enum PollError {
    /// Ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] RunLedgerError),
    /// Workflow provider call failed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    /// No ledger record tracks the run.
    #[error("no ledger record for run {run_id} in {repo}")]
    UnknownRun {
        /// Repository that was queried.
        repo: RepoCoords,
        /// Run without a ledger record.
        run_id: ExternalRunId,
    },
}

/// Errors returned by ingest operations.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] RunLedgerError),
    /// Workflow provider call failed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    /// Result payload assembly failed.
    #[error(transparent)]
    Domain(#[from] RunDomainError),
    /// No ledger record tracks the run.
    #[error("no ledger record for run {run_id} in {repo}")]
    UnknownRun {
        /// Repository that was queried.
        repo: RepoCoords,
        /// Run without a ledger record.
        run_id: ExternalRunId,
    },
    /// The run has not reached a terminal status.
    #[error("run {run_id} is still {status}; ingest requires a terminal status")]
    RunNotTerminal {
        /// Run that was requested.
        run_id: ExternalRunId,
        /// Status the ledger currently holds.
        status: RunStatus,
    },
}

/// Ledger view of a run after a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSnapshot {
    /// Ledger record identifier.
    pub record_id: RunRecordId,
    /// Normalized status the ledger holds after the poll.
    pub status: RunStatus,
    /// Provider snapshot backing the status.
    pub raw: Option<RawRunSnapshot>,
    /// Latest applied observation timestamp.
    pub last_polled_at: Option<DateTime<Utc>>,
    /// Completion timestamp, once terminal.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&RunRecord> for PollSnapshot {
    fn from(record: &RunRecord) -> Self {
        Self {
            record_id: record.id(),
            status: record.status(),
            raw: record.raw().cloned(),
            last_polled_at: record.last_polled_at(),
            completed_at: record.completed_at(),
        }
    }
}

/// Workflow dispatch orchestration service.
///
/// Dispatch is at-most-once per idempotency key: the trigger itself is
/// never retried, only the subsequent locate-run listing is, and every
/// settled dispatch is recorded in the ledger before the receipt is
/// returned. No ledger state is held locked across provider calls.
#[derive(Clone)]
pub struct RunDispatchService<W, L, C>
where
    W: WorkflowClient,
    L: RunLedger,
    C: Clock + Send + Sync,
{
    workflow: Arc<W>,
    ledger: Arc<L>,
    clock: Arc<C>,
    policy: RetryPolicy,
}

impl<W, L, C> RunDispatchService<W, L, C>
where
    W: WorkflowClient,
    L: RunLedger,
    C: Clock + Send + Sync,
{
    /// Creates a new dispatch service.
    #[must_use]
    pub const fn new(workflow: Arc<W>, ledger: Arc<L>, clock: Arc<C>, policy: RetryPolicy) -> Self {
        Self {
            workflow,
            ledger,
            clock,
            policy,
        }
    }

    /// Dispatches a workflow at most once per idempotency key.
    ///
    /// An existing healthy record short-circuits without any provider
    /// call; an existing failed-start record is superseded by the fresh
    /// dispatch. Passing the deadline abandons the dispatch without
    /// persisting anything.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Cancelled`] when the deadline passes
    /// before the dispatch settles, [`DispatchError::RunNotVisible`] when
    /// the trigger was accepted but no run could be located, and the
    /// underlying [`DispatchError::Workflow`] or [`DispatchError::Ledger`]
    /// failure otherwise.
    #[tracing::instrument(skip(self, request), fields(key = %request.key()))]
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchReceipt, DispatchError> {
        let key = request.key();

        let mut predecessor = None;
        if let Some(existing) = self.ledger.find_by_key(&key).await? {
            if existing.is_failed_start() {
                tracing::debug!(record_id = %existing.id(), "superseding failed-start record");
                predecessor = Some(existing.id());
            } else {
                tracing::debug!(record_id = %existing.id(), "reusing existing dispatch");
                return Ok(DispatchReceipt {
                    record: existing,
                    is_existing: true,
                });
            }
        }

        if self.deadline_passed(request.deadline) {
            return Err(DispatchError::Cancelled { key });
        }

        let inputs = request
            .inputs
            .clone()
            .with_input(CORRELATION_TOKEN_INPUT, request.correlation_key.as_str());
        let cutoff = self.clock.utc() - self.policy.safety_margin;

        // Fire and forget: a trigger failure propagates without retry, as
        // a second trigger could start a second run.
        self.workflow
            .trigger_workflow(&request.repo, &request.workflow_id, &request.git_ref, &inputs)
            .await?;

        let filter = RunFilter::new()
            .with_git_ref(request.git_ref.clone())
            .with_created_after(cutoff);

        for attempt in 1..=self.policy.max_attempts {
            if self.deadline_passed(request.deadline) {
                // Cancellation leaves no record: the key stays free for a
                // later dispatch.
                return Err(DispatchError::Cancelled { key });
            }

            match self
                .workflow
                .list_runs(&request.repo, &request.workflow_id, &filter)
                .await
            {
                Ok(runs) => {
                    if let Some(run) = locate_own_run(&runs, request.correlation_key.as_str()) {
                        tracing::debug!(run_id = %run.id, attempt, "located dispatched run");
                        let record = RunRecord::dispatched(
                            DispatchedRun {
                                key: key.clone(),
                                repo: request.repo.clone(),
                                git_ref: request.git_ref.clone(),
                                external_run_id: run.id,
                                run_url: Some(run.url.clone()),
                            },
                            &*self.clock,
                        );
                        return self.persist_located(record, predecessor).await;
                    }
                }
                Err(err) if err.is_transient() => {
                    tracing::debug!(attempt, error = %err, "transient listing failure");
                }
                Err(err) => {
                    if let Some(receipt) = self.settle_failure(&key, &request, predecessor).await? {
                        return Ok(receipt);
                    }
                    return Err(err.into());
                }
            }

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        if let Some(receipt) = self.settle_failure(&key, &request, predecessor).await? {
            return Ok(receipt);
        }
        Err(DispatchError::RunNotVisible {
            key,
            attempts: self.policy.max_attempts,
        })
    }

    /// Polls a dispatched run and applies the observation to the ledger.
    ///
    /// A record that is already terminal is returned without any provider
    /// call. The observation timestamp is captured before the fetch, so
    /// concurrent polls settle by when they observed, not by when their
    /// writes land.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::UnknownRun`] when no ledger record tracks the
    /// run, and the underlying [`PollError::Workflow`] or
    /// [`PollError::Ledger`] failure otherwise.
    #[tracing::instrument(skip(self), fields(repo = %repo, run_id = %run_id))]
    pub async fn poll(
        &self,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> Result<PollSnapshot, PollError> {
        let record = self
            .ledger
            .find_by_external_run_id(repo, run_id)
            .await?
            .ok_or_else(|| PollError::UnknownRun {
                repo: repo.clone(),
                run_id,
            })?;

        if record.status().is_terminal() {
            tracing::debug!(status = %record.status(), "run already terminal; skipping fetch");
            return Ok(PollSnapshot::from(&record));
        }

        let observed_at = self.clock.utc();
        let run = with_transient_retry(&self.policy, || self.workflow.get_run(repo, run_id)).await?;
        let observation = PollObservation::new(observed_at, run.raw.clone(), Some(run.url.clone()));

        let stored = match self.ledger.record_poll(record.id(), &observation).await? {
            PollApplied::Applied(stored) => {
                tracing::debug!(status = %stored.status(), "poll applied");
                stored
            }
            PollApplied::Stale(stored) => {
                tracing::debug!(status = %stored.status(), "poll superseded by newer observation");
                stored
            }
        };
        Ok(PollSnapshot::from(&stored))
    }

    /// Ingests the result payload of a terminal run exactly once.
    ///
    /// A record that already carries a payload is returned without any
    /// provider call; a lost store race returns the payload the winning
    /// ingester attached.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::UnknownRun`] when no ledger record tracks
    /// the run, [`IngestError::RunNotTerminal`] when the ledger has not
    /// yet observed a terminal status, and the underlying
    /// [`IngestError::Workflow`] or [`IngestError::Ledger`] failure
    /// otherwise.
    #[tracing::instrument(skip(self), fields(repo = %repo, run_id = %run_id))]
    pub async fn ingest(
        &self,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> Result<IngestedResult, IngestError> {
        let record = self
            .ledger
            .find_by_external_run_id(repo, run_id)
            .await?
            .ok_or_else(|| IngestError::UnknownRun {
                repo: repo.clone(),
                run_id,
            })?;

        if let Some(existing) = record.ingested() {
            tracing::debug!("result already ingested; returning stored payload");
            return Ok(existing.clone());
        }
        if !record.status().is_terminal() {
            return Err(IngestError::RunNotTerminal {
                run_id,
                status: record.status(),
            });
        }

        let run = with_transient_retry(&self.policy, || self.workflow.get_run(repo, run_id)).await?;
        let jobs =
            with_transient_retry(&self.policy, || self.workflow.list_jobs(repo, run_id)).await?;
        let artifacts =
            with_transient_retry(&self.policy, || self.workflow.list_artifacts(repo, run_id))
                .await?;

        let summary = RunSummary {
            status: RunStatus::from_raw(&run.raw),
            conclusion: run.raw.conclusion.clone(),
            started_at: run.started_at,
            completed_at: run.completed_at,
        };
        let result = IngestedResult::assemble(
            summary,
            jobs.into_iter().map(to_job_result).collect(),
            artifacts.into_iter().map(to_artifact_meta).collect(),
            run.logs_url.clone(),
        )?;

        match self
            .ledger
            .store_ingested(record.id(), &result, self.clock.utc())
            .await?
        {
            IngestStored::Stored(_) => {
                tracing::debug!(digest = %result.digest, "result ingested");
                Ok(result)
            }
            IngestStored::AlreadyIngested(existing) => {
                tracing::debug!("concurrent ingest won; returning stored payload");
                Ok(existing)
            }
        }
    }

    fn deadline_passed(&self, deadline: Option<DateTime<Utc>>) -> bool {
        deadline.is_some_and(|deadline| self.clock.utc() >= deadline)
    }

    async fn persist_located(
        &self,
        record: RunRecord,
        predecessor: Option<RunRecordId>,
    ) -> Result<DispatchReceipt, DispatchError> {
        let outcome = match predecessor {
            Some(predecessor) => {
                self.ledger
                    .supersede_failed_start(predecessor, &record)
                    .await?
            }
            None => self.ledger.insert_if_absent(&record).await?,
        };
        Ok(match outcome {
            InsertOutcome::Inserted => DispatchReceipt {
                record,
                is_existing: false,
            },
            InsertOutcome::Existing(current) => {
                tracing::debug!(record_id = %current.id(), "concurrent dispatch won the key");
                DispatchReceipt {
                    record: current,
                    is_existing: true,
                }
            }
        })
    }

    /// Records a dispatch that never became visible, unless somebody got
    /// there first.
    ///
    /// Returns a receipt when a healthy concurrent record owns the key,
    /// in which case the dispatch succeeded from the caller's point of
    /// view.
    async fn settle_failure(
        &self,
        key: &RunKey,
        request: &DispatchRequest,
        predecessor: Option<RunRecordId>,
    ) -> Result<Option<DispatchReceipt>, DispatchError> {
        if predecessor.is_some() {
            // The earlier failed-start record already documents this key.
            return Ok(None);
        }
        let record = RunRecord::failed_start(
            key.clone(),
            request.repo.clone(),
            request.git_ref.clone(),
            &*self.clock,
        );
        match self.ledger.insert_if_absent(&record).await? {
            InsertOutcome::Inserted => {
                tracing::debug!("recorded failed start");
                Ok(None)
            }
            InsertOutcome::Existing(current) if current.is_failed_start() => Ok(None),
            InsertOutcome::Existing(current) => Ok(Some(DispatchReceipt {
                record: current,
                is_existing: true,
            })),
        }
    }
}

/// Picks this dispatch's run out of a candidate listing.
///
/// A run echoing the correlation token wins outright. For providers that
/// do not echo trigger inputs, a sole candidate without any token is
/// accepted; runs echoing a different token belong to other dispatches
/// and never match. Anything ambiguous yields nothing so the caller
/// retries.
fn locate_own_run<'a>(runs: &'a [WorkflowRun], token: &str) -> Option<&'a WorkflowRun> {
    if let Some(run) = runs
        .iter()
        .find(|run| run.correlation_token.as_deref() == Some(token))
    {
        return Some(run);
    }
    let mut anonymous = runs.iter().filter(|run| run.correlation_token.is_none());
    match (anonymous.next(), anonymous.next()) {
        (Some(run), None) => Some(run),
        _ => None,
    }
}

fn to_job_result(job: WorkflowJob) -> JobResult {
    let duration_secs = match (job.started_at, job.completed_at) {
        (Some(started), Some(completed)) => {
            u64::try_from((completed - started).num_seconds()).ok()
        }
        _ => None,
    };
    JobResult {
        name: job.name,
        status: job.status,
        conclusion: job.conclusion,
        duration_secs,
    }
}

fn to_artifact_meta(artifact: WorkflowArtifact) -> ArtifactMeta {
    ArtifactMeta {
        name: artifact.name,
        size_bytes: artifact.size_bytes,
        download_ref: artifact.download_ref,
    }
}

async fn with_transient_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> WorkflowResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = WorkflowResult<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                tracing::debug!(attempt, error = %err, "transient workflow failure; retrying");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
