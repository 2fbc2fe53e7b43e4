//! CI workflow client port for dispatch, poll, and ingest.

use crate::issue::domain::RepoCoords;
use crate::run::domain::{ExternalRunId, RawRunSnapshot, WorkflowId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Reserved trigger input carrying the dispatch correlation key.
///
/// Providers that surface trigger inputs on their run objects echo this
/// value back as [`WorkflowRun::correlation_token`], letting the locate
/// loop identify its own run unambiguously.
pub const CORRELATION_TOKEN_INPUT: &str = "correlation-token";

/// Result type for workflow client operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Key-value inputs passed to a workflow trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowInputs {
    values: BTreeMap<String, String>,
}

impl WorkflowInputs {
    /// Creates an empty input set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Sets an input value, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`WorkflowInputs::insert`].
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Iterates inputs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Filter for listing workflow runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    /// Restrict to runs against this git reference.
    pub git_ref: Option<String>,
    /// Restrict to runs created at or after this instant.
    pub created_after: Option<DateTime<Utc>>,
}

impl RunFilter {
    /// Creates an unrestricted filter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            git_ref: None,
            created_after: None,
        }
    }

    /// Restricts the filter to a git reference.
    #[must_use]
    pub fn with_git_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    /// Restricts the filter to runs created at or after an instant.
    #[must_use]
    pub const fn with_created_after(mut self, created_after: DateTime<Utc>) -> Self {
        self.created_after = Some(created_after);
        self
    }
}

/// A workflow run as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    /// Provider-assigned run identifier.
    pub id: ExternalRunId,
    /// Run browse URL.
    pub url: String,
    /// Raw status snapshot.
    pub raw: RawRunSnapshot,
    /// Echoed dispatch correlation token, where the provider exposes
    /// trigger inputs.
    pub correlation_token: Option<String>,
    /// When the provider created the run.
    pub created_at: DateTime<Utc>,
    /// When the run started executing.
    pub started_at: Option<DateTime<Utc>>,
    /// When the run completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Reference to the run's log archive.
    pub logs_url: Option<String>,
}

/// A job within a workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowJob {
    /// Job name.
    pub name: String,
    /// Provider-reported job status.
    pub status: String,
    /// Provider-reported job conclusion.
    pub conclusion: Option<String>,
    /// When the job started executing.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job completed.
    pub completed_at: Option<DateTime<Utc>>,
}

/// An artifact uploaded by a workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowArtifact {
    /// Artifact name.
    pub name: String,
    /// Artifact size in bytes.
    pub size_bytes: u64,
    /// Reference for downloading the artifact content.
    pub download_ref: String,
}

/// Authenticated external-CI contract consumed by the dispatcher.
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    /// Triggers a workflow. Fire-and-forget: the provider returns no run
    /// handle, and implementations must not retry an accepted trigger.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::AccessDenied`] when the repository is not
    /// authorized, [`WorkflowError::WorkflowNotFound`] when the workflow
    /// does not exist, or a transport-level [`WorkflowError`] otherwise.
    async fn trigger_workflow(
        &self,
        repo: &RepoCoords,
        workflow_id: &WorkflowId,
        git_ref: &str,
        inputs: &WorkflowInputs,
    ) -> WorkflowResult<()>;

    /// Lists runs of a workflow matching the filter, newest first in the
    /// provider's stable order.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when the provider refuses or fails the
    /// listing.
    async fn list_runs(
        &self,
        repo: &RepoCoords,
        workflow_id: &WorkflowId,
        filter: &RunFilter,
    ) -> WorkflowResult<Vec<WorkflowRun>>;

    /// Fetches a single run.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::RunNotFound`] when no run carries the
    /// identifier.
    async fn get_run(
        &self,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> WorkflowResult<WorkflowRun>;

    /// Lists the jobs of a run in provider order.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::RunNotFound`] when no run carries the
    /// identifier.
    async fn list_jobs(
        &self,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> WorkflowResult<Vec<WorkflowJob>>;

    /// Lists the artifacts of a run in provider order.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::RunNotFound`] when no run carries the
    /// identifier.
    async fn list_artifacts(
        &self,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> WorkflowResult<Vec<WorkflowArtifact>>;
}

/// Errors returned by workflow client implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// The repository is not authorized for this client.
    #[error("workflow access denied for {repo}")]
    AccessDenied {
        /// Repository that was refused.
        repo: RepoCoords,
    },

    /// The workflow definition does not exist.
    #[error("workflow {workflow_id} not found in {repo}")]
    WorkflowNotFound {
        /// Repository that was queried.
        repo: RepoCoords,
        /// Workflow that was requested.
        workflow_id: WorkflowId,
    },

    /// The run does not exist.
    #[error("run {run_id} not found in {repo}")]
    RunNotFound {
        /// Repository that was queried.
        repo: RepoCoords,
        /// Run that was requested.
        run_id: ExternalRunId,
    },

    /// A retryable transport or availability failure.
    #[error("transient workflow failure (status {status:?}): {detail}")]
    Transient {
        /// Failure detail for diagnostics.
        detail: String,
        /// HTTP-level status where applicable.
        status: Option<u16>,
    },

    /// The provider returned a response this client cannot interpret.
    #[error("malformed workflow response: {detail}")]
    Malformed {
        /// Failure detail for diagnostics.
        detail: String,
    },
}

impl WorkflowError {
    /// Returns whether a bounded retry may reasonably succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
