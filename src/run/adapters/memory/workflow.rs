//! Scriptable in-memory workflow client.

use crate::issue::domain::RepoCoords;
use crate::run::domain::{ExternalRunId, WorkflowId};
use crate::run::ports::{
    RunFilter, WorkflowArtifact, WorkflowClient, WorkflowError, WorkflowInputs, WorkflowJob,
    WorkflowResult, WorkflowRun,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// A workflow run scripted into the in-memory client.
///
/// `visible_after` models provider listing lag: the run is omitted from
/// [`WorkflowClient::list_runs`] until that many list calls have already
/// completed. Zero makes the run visible immediately.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    run: WorkflowRun,
    git_ref: String,
    visible_after: usize,
}

impl ScriptedRun {
    /// Scripts a run against a git reference, visible immediately.
    #[must_use]
    pub fn new(run: WorkflowRun, git_ref: impl Into<String>) -> Self {
        Self {
            run,
            git_ref: git_ref.into(),
            visible_after: 0,
        }
    }

    /// Delays listing visibility until `calls` list calls have completed.
    #[must_use]
    pub const fn with_visible_after(mut self, calls: usize) -> Self {
        self.visible_after = calls;
        self
    }
}

/// A recorded trigger invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredWorkflow {
    /// Repository the trigger targeted.
    pub repo: RepoCoords,
    /// Workflow that was triggered.
    pub workflow_id: WorkflowId,
    /// Git reference the trigger targeted.
    pub git_ref: String,
    /// Inputs passed with the trigger.
    pub inputs: WorkflowInputs,
}

#[derive(Default)]
struct WorkflowState {
    runs: HashMap<(RepoCoords, WorkflowId), Vec<ScriptedRun>>,
    jobs: HashMap<ExternalRunId, Vec<WorkflowJob>>,
    artifacts: HashMap<ExternalRunId, Vec<WorkflowArtifact>>,
    triggers: Vec<TriggeredWorkflow>,
    trigger_errors: VecDeque<WorkflowError>,
    list_errors: VecDeque<WorkflowError>,
    get_errors: VecDeque<WorkflowError>,
    job_errors: VecDeque<WorkflowError>,
    artifact_errors: VecDeque<WorkflowError>,
}

/// In-memory [`WorkflowClient`] for unit testing.
///
/// Tests seed runs, jobs, and artifacts, queue one-shot errors per
/// method, and observe call counts to assert retry and idempotency
/// behaviour.
#[derive(Clone, Default)]
pub struct InMemoryWorkflowClient {
    state: Arc<RwLock<WorkflowState>>,
    trigger_calls: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
    get_calls: Arc<AtomicUsize>,
    job_calls: Arc<AtomicUsize>,
    artifact_calls: Arc<AtomicUsize>,
}

fn lock_poisoned(err: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::Malformed {
        detail: format!("workflow state lock poisoned: {err}"),
    }
}

impl InMemoryWorkflowClient {
    /// Creates an empty in-memory client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a run into a workflow's listing.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the state lock is poisoned.
    pub fn seed_run(
        &self,
        repo: &RepoCoords,
        workflow_id: &WorkflowId,
        scripted: ScriptedRun,
    ) -> WorkflowResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state
            .runs
            .entry((repo.clone(), workflow_id.clone()))
            .or_default()
            .push(scripted);
        Ok(())
    }

    /// Replaces a scripted run in place, keyed by its provider id.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::RunNotFound`] when no scripted run
    /// carries the identifier.
    pub fn update_run(&self, repo: &RepoCoords, run: WorkflowRun) -> WorkflowResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let slot = state
            .runs
            .iter_mut()
            .filter(|((scripted_repo, _), _)| scripted_repo == repo)
            .flat_map(|(_, entries)| entries.iter_mut())
            .find(|entry| entry.run.id == run.id);
        match slot {
            Some(entry) => {
                entry.run = run;
                Ok(())
            }
            None => Err(WorkflowError::RunNotFound {
                repo: repo.clone(),
                run_id: run.id,
            }),
        }
    }

    /// Seeds the job listing of a run.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the state lock is poisoned.
    pub fn seed_jobs(&self, run_id: ExternalRunId, jobs: Vec<WorkflowJob>) -> WorkflowResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.jobs.insert(run_id, jobs);
        Ok(())
    }

    /// Seeds the artifact listing of a run.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the state lock is poisoned.
    pub fn seed_artifacts(
        &self,
        run_id: ExternalRunId,
        artifacts: Vec<WorkflowArtifact>,
    ) -> WorkflowResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.artifacts.insert(run_id, artifacts);
        Ok(())
    }

    /// Queues an error for the next trigger call.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the state lock is poisoned.
    pub fn queue_trigger_error(&self, error: WorkflowError) -> WorkflowResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.trigger_errors.push_back(error);
        Ok(())
    }

    /// Queues an error for the next list call.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the state lock is poisoned.
    pub fn queue_list_error(&self, error: WorkflowError) -> WorkflowResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.list_errors.push_back(error);
        Ok(())
    }

    /// Queues an error for the next run fetch.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the state lock is poisoned.
    pub fn queue_get_error(&self, error: WorkflowError) -> WorkflowResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.get_errors.push_back(error);
        Ok(())
    }

    /// Queues an error for the next job listing.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the state lock is poisoned.
    pub fn queue_job_error(&self, error: WorkflowError) -> WorkflowResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.job_errors.push_back(error);
        Ok(())
    }

    /// Queues an error for the next artifact listing.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the state lock is poisoned.
    pub fn queue_artifact_error(&self, error: WorkflowError) -> WorkflowResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.artifact_errors.push_back(error);
        Ok(())
    }

    /// Returns the triggers recorded so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the state lock is poisoned.
    pub fn triggers(&self) -> WorkflowResult<Vec<TriggeredWorkflow>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.triggers.clone())
    }

    /// Number of trigger calls observed.
    #[must_use]
    pub fn trigger_call_count(&self) -> usize {
        self.trigger_calls.load(Ordering::SeqCst)
    }

    /// Number of list calls observed.
    #[must_use]
    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of run fetches observed.
    #[must_use]
    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of job listings observed.
    #[must_use]
    pub fn job_call_count(&self) -> usize {
        self.job_calls.load(Ordering::SeqCst)
    }

    /// Number of artifact listings observed.
    #[must_use]
    pub fn artifact_call_count(&self) -> usize {
        self.artifact_calls.load(Ordering::SeqCst)
    }

    fn find_run(&self, repo: &RepoCoords, run_id: ExternalRunId) -> WorkflowResult<WorkflowRun> {
        let state = self.state.read().map_err(lock_poisoned)?;
        state
            .runs
            .iter()
            .filter(|((scripted_repo, _), _)| scripted_repo == repo)
            .flat_map(|(_, entries)| entries.iter())
            .find(|entry| entry.run.id == run_id)
            .map(|entry| entry.run.clone())
            .ok_or(WorkflowError::RunNotFound {
                repo: repo.clone(),
                run_id,
            })
    }
}

fn matches_filter(scripted: &ScriptedRun, filter: &RunFilter, list_ordinal: usize) -> bool {
    if scripted.visible_after >= list_ordinal {
        return false;
    }
    if filter
        .git_ref
        .as_ref()
        .is_some_and(|git_ref| *git_ref != scripted.git_ref)
    {
        return false;
    }
    !filter
        .created_after
        .is_some_and(|cutoff| scripted.run.created_at < cutoff)
}

#[async_trait]
impl WorkflowClient for InMemoryWorkflowClient {
    async fn trigger_workflow(
        &self,
        repo: &RepoCoords,
        workflow_id: &WorkflowId,
        git_ref: &str,
        inputs: &WorkflowInputs,
    ) -> WorkflowResult<()> {
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if let Some(error) = state.trigger_errors.pop_front() {
            return Err(error);
        }
        state.triggers.push(TriggeredWorkflow {
            repo: repo.clone(),
            workflow_id: workflow_id.clone(),
            git_ref: git_ref.to_owned(),
            inputs: inputs.clone(),
        });
        Ok(())
    }

    async fn list_runs(
        &self,
        repo: &RepoCoords,
        workflow_id: &WorkflowId,
        filter: &RunFilter,
    ) -> WorkflowResult<Vec<WorkflowRun>> {
        let list_ordinal = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if let Some(error) = state.list_errors.pop_front() {
            return Err(error);
        }
        Ok(state
            .runs
            .get(&(repo.clone(), workflow_id.clone()))
            .map_or_else(Vec::new, |entries| {
                entries
                    .iter()
                    .filter(|entry| matches_filter(entry, filter, list_ordinal))
                    .map(|entry| entry.run.clone())
                    .collect()
            }))
    }

    async fn get_run(
        &self,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> WorkflowResult<WorkflowRun> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.write().map_err(lock_poisoned)?;
            if let Some(error) = state.get_errors.pop_front() {
                return Err(error);
            }
        }
        self.find_run(repo, run_id)
    }

    async fn list_jobs(
        &self,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> WorkflowResult<Vec<WorkflowJob>> {
        self.job_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.write().map_err(lock_poisoned)?;
            if let Some(error) = state.job_errors.pop_front() {
                return Err(error);
            }
        }
        self.find_run(repo, run_id)?;
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.jobs.get(&run_id).cloned().unwrap_or_default())
    }

    async fn list_artifacts(
        &self,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> WorkflowResult<Vec<WorkflowArtifact>> {
        self.artifact_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.write().map_err(lock_poisoned)?;
            if let Some(error) = state.artifact_errors.pop_front() {
                return Err(error);
            }
        }
        self.find_run(repo, run_id)?;
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.artifacts.get(&run_id).cloned().unwrap_or_default())
    }
}
