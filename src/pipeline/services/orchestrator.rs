//! End-to-end orchestration of issues, mirrors, and fabrication runs.

use crate::issue::{
    domain::{CanonicalId, Issue, IssueId, IssueState, MirrorRef, RepoCoords},
    ports::IssueRepository,
    services::{IssueLifecycleError, IssueLifecycleService},
};
use crate::mirror::{
    domain::{MirrorContext, MirrorDocument, MirrorDomainError, Resolution},
    ports::{TrackerClient, TrackerError},
    services::{MirrorResolver, ResolveError},
};
use crate::pipeline::{
    domain::{CompletionPolicy, FabricationTarget, FailureDisposition},
    ports::{MirrorProvisioner, ProvisionError},
};
use crate::run::{
    domain::{CorrelationKey, ExternalRunId, RunDomainError, RunStatus},
    ports::{RunLedger, WorkflowClient, WorkflowInputs},
    services::{DispatchError, DispatchReceipt, DispatchRequest, PollError, RunDispatchService},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Trigger input carrying the canonical identifier the workflow
/// fabricates for.
pub const CANONICAL_ID_INPUT: &str = "canonical-id";

/// Errors returned by pipeline orchestration.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Issue lifecycle operation failed.
    #[error(transparent)]
    Lifecycle(#[from] IssueLifecycleError),
    /// Mirror resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Mirror provisioning failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    /// Mirror document rendering failed.
    #[error(transparent)]
    Template(#[from] MirrorDomainError),
    /// Run dispatch failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Run poll failed.
    #[error(transparent)]
    Poll(#[from] PollError),
    /// Dispatch identifiers could not be derived from the issue.
    #[error(transparent)]
    RunIdentity(#[from] RunDomainError),
    /// A bound mirror reference no longer names a live artifact.
    #[error("mirror {mirror} bound to {canonical_id} no longer resolves")]
    StaleMirror {
        /// Canonical identifier whose binding went stale.
        canonical_id: CanonicalId,
        /// The dangling mirror reference.
        mirror: MirrorRef,
    },
}

/// Parameter object for one pipeline advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceRequest {
    /// Issue to advance.
    pub issue_id: IssueId,
    /// Target lifecycle state.
    pub to: IssueState,
    /// Content for a provisioned mirror document. A skeleton carrying
    /// only the canonical identifier is rendered when omitted.
    pub mirror_context: Option<MirrorContext>,
    /// Deadline forwarded to the dispatch, when one applies.
    pub deadline: Option<DateTime<Utc>>,
}

impl AdvanceRequest {
    /// Creates an advance request with no mirror content and no deadline.
    #[must_use]
    pub const fn new(issue_id: IssueId, to: IssueState) -> Self {
        Self {
            issue_id,
            to,
            mirror_context: None,
            deadline: None,
        }
    }

    /// Attaches content for a provisioned mirror document.
    #[must_use]
    pub fn with_mirror_context(mut self, context: MirrorContext) -> Self {
        self.mirror_context = Some(context);
        self
    }

    /// Attaches a dispatch deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Mirror side effect of an advance into [`IssueState::Implementing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// The issue already carried a binding to a live artifact.
    AlreadyBound(MirrorRef),
    /// An existing artifact was resolved and bound.
    Resolved(MirrorRef),
    /// No artifact carried the identifier; one was provisioned and bound.
    Provisioned(MirrorRef),
}

impl MirrorOutcome {
    /// Returns the mirror reference the outcome settled on.
    #[must_use]
    pub const fn mirror(&self) -> &MirrorRef {
        match self {
            Self::AlreadyBound(mirror) | Self::Resolved(mirror) | Self::Provisioned(mirror) => {
                mirror
            }
        }
    }
}

/// Outcome of one advance request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceOutcome {
    /// The issue after the transition and any mirror binding.
    pub issue: Issue,
    /// Mirror side effect, present when the advance entered
    /// [`IssueState::Implementing`].
    pub mirror_outcome: Option<MirrorOutcome>,
    /// Dispatch side effect, present when the advance entered
    /// [`IssueState::Implementing`] and the dispatch gate stayed open.
    pub dispatch: Option<DispatchReceipt>,
}

/// Outcome of absorbing a run's status into the issue lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsorbOutcome {
    /// The run has not reached a terminal status; nothing to apply.
    StillRunning(RunStatus),
    /// The terminal status produced a validated transition.
    Transitioned {
        /// The issue after the transition.
        issue: Issue,
        /// Terminal status that drove the transition.
        status: RunStatus,
    },
    /// Policy keeps the issue in place for this terminal status.
    Unchanged {
        /// The issue, unmodified.
        issue: Issue,
        /// Terminal status the policy absorbed.
        status: RunStatus,
    },
}

/// Orchestrator composing the issue lifecycle, the mirror resolver, and
/// the run dispatcher.
///
/// Every proposed state change flows through the issue state machine and
/// every dispatch through the run ledger; the orchestrator adds no
/// idempotency machinery of its own and holds no state locked across
/// external calls.
#[derive(Clone)]
pub struct PipelineService<R, T, P, W, L, C>
where
    R: IssueRepository,
    T: TrackerClient,
    P: MirrorProvisioner,
    W: WorkflowClient,
    L: RunLedger,
    C: Clock + Send + Sync,
{
    lifecycle: IssueLifecycleService<R, C>,
    resolver: MirrorResolver<T>,
    provisioner: Arc<P>,
    runs: RunDispatchService<W, L, C>,
    target: FabricationTarget,
    policy: CompletionPolicy,
}

impl<R, T, P, W, L, C> PipelineService<R, T, P, W, L, C>
where
    R: IssueRepository,
    T: TrackerClient,
    P: MirrorProvisioner,
    W: WorkflowClient,
    L: RunLedger,
    C: Clock + Send + Sync,
{
    /// Creates a pipeline service with the default completion policy.
    #[must_use]
    pub fn new(
        lifecycle: IssueLifecycleService<R, C>,
        resolver: MirrorResolver<T>,
        provisioner: Arc<P>,
        runs: RunDispatchService<W, L, C>,
        target: FabricationTarget,
    ) -> Self {
        Self {
            lifecycle,
            resolver,
            provisioner,
            runs,
            target,
            policy: CompletionPolicy::default(),
        }
    }

    /// Replaces the completion policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Advances an issue through a validated transition.
    ///
    /// A transition into [`IssueState::Implementing`] additionally
    /// resolves or provisions the mirror artifact, binds it, and
    /// dispatches the fabrication workflow keyed by the issue's canonical
    /// identifier. Any other target state performs the bare transition.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Lifecycle`] when the state machine or the
    /// repository rejects the transition, [`PipelineError::StaleMirror`]
    /// when a bound mirror no longer names a live artifact, and the
    /// corresponding resolve, provision, or dispatch failure otherwise.
    #[tracing::instrument(skip(self, request), fields(issue_id = %request.issue_id, to = %request.to))]
    pub async fn advance(&self, request: AdvanceRequest) -> Result<AdvanceOutcome, PipelineError> {
        let issue = self.lifecycle.transition(request.issue_id, request.to).await?;
        if request.to != IssueState::Implementing {
            return Ok(AdvanceOutcome {
                issue,
                mirror_outcome: None,
                dispatch: None,
            });
        }

        let (mirror_outcome, bound) = self.ensure_mirror(issue, request.mirror_context).await?;
        if !bound.state().is_active() {
            // A concurrent transition parked or killed the issue while the
            // mirror settled.
            tracing::debug!(state = %bound.state(), "dispatch gate closed after mirror binding");
            return Ok(AdvanceOutcome {
                issue: bound,
                mirror_outcome: Some(mirror_outcome),
                dispatch: None,
            });
        }

        let receipt = self.dispatch_fabrication(&bound, request.deadline).await?;
        Ok(AdvanceOutcome {
            issue: bound,
            mirror_outcome: Some(mirror_outcome),
            dispatch: Some(receipt),
        })
    }

    /// Feeds a run's polled status back into the issue lifecycle.
    ///
    /// A non-terminal status applies nothing. A terminal status proposes
    /// the transition the completion policy calls for, validated through
    /// the state machine like any other transition.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Lifecycle`] when the issue is missing or
    /// the proposed transition is illegal, and [`PipelineError::Poll`]
    /// when the run cannot be polled.
    #[tracing::instrument(skip(self), fields(issue_id = %issue_id, repo = %repo, run_id = %run_id))]
    pub async fn absorb_run_completion(
        &self,
        issue_id: IssueId,
        repo: &RepoCoords,
        run_id: ExternalRunId,
    ) -> Result<AbsorbOutcome, PipelineError> {
        let issue = self
            .lifecycle
            .get(issue_id)
            .await?
            .ok_or(IssueLifecycleError::NotFound(issue_id))?;

        let snapshot = self.runs.poll(repo, run_id).await?;
        let status = snapshot.status;
        let proposal = match status {
            RunStatus::Queued | RunStatus::Running => {
                return Ok(AbsorbOutcome::StillRunning(status));
            }
            RunStatus::Succeeded => Some(IssueState::Verified),
            RunStatus::Failed => disposition_target(self.policy.on_failure),
            RunStatus::Cancelled => disposition_target(self.policy.on_cancelled),
        };
        let Some(to) = proposal else {
            tracing::debug!(status = %status, "policy leaves the issue in place");
            return Ok(AbsorbOutcome::Unchanged { issue, status });
        };

        let transitioned = self.lifecycle.transition(issue_id, to).await?;
        tracing::debug!(status = %status, to = %to, "run completion absorbed");
        Ok(AbsorbOutcome::Transitioned {
            issue: transitioned,
            status,
        })
    }

    /// Resolves or provisions the mirror artifact and binds it.
    ///
    /// Resolution runs fresh on every call rather than trusting the
    /// stored binding: the binding is a weak reference, and the artifact
    /// may have been edited or deleted since it was taken.
    async fn ensure_mirror(
        &self,
        issue: Issue,
        content: Option<MirrorContext>,
    ) -> Result<(MirrorOutcome, Issue), PipelineError> {
        let repo = &self.target.repo;
        let canonical_id = issue.canonical_id().clone();

        if let Resolution::Found(found) = self.resolver.resolve(repo, canonical_id.as_str()).await?
        {
            let mirror = MirrorRef::new(repo.clone(), found.artifact_id, found.url);
            if is_bound_to(&issue, &mirror) {
                return Ok((MirrorOutcome::AlreadyBound(mirror), issue));
            }
            let bound = self.lifecycle.bind_mirror(issue.id(), mirror.clone()).await?;
            return Ok((MirrorOutcome::Resolved(mirror), bound));
        }

        if let Some(existing) = issue.mirror().cloned() {
            // No marker matched, but the binding may still name a live
            // artifact whose title and body were edited. Verify before
            // declaring the binding stale.
            return match self
                .resolver
                .lookup_artifact(existing.repo(), existing.artifact_id())
                .await
            {
                Ok(_) => Ok((MirrorOutcome::AlreadyBound(existing), issue)),
                Err(ResolveError::Tracker(TrackerError::NotFound { .. })) => {
                    Err(PipelineError::StaleMirror {
                        canonical_id,
                        mirror: existing,
                    })
                }
                Err(error) => Err(error.into()),
            };
        }

        let document = render_document(&self.target, &canonical_id, content)?;
        let mirror = self.provisioner.provision(repo, &canonical_id, &document).await?;
        let bound = self.lifecycle.bind_mirror(issue.id(), mirror.clone()).await?;
        Ok((MirrorOutcome::Provisioned(mirror), bound))
    }

    async fn dispatch_fabrication(
        &self,
        issue: &Issue,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<DispatchReceipt, PipelineError> {
        let canonical_id = issue.canonical_id();
        let correlation_key = CorrelationKey::new(canonical_id.as_str())?;
        let inputs = WorkflowInputs::new().with_input(CANONICAL_ID_INPUT, canonical_id.as_str());

        let receipt = self
            .runs
            .dispatch(DispatchRequest {
                repo: self.target.repo.clone(),
                workflow_id: self.target.workflow_id.clone(),
                git_ref: self.target.git_ref.clone(),
                correlation_key,
                inputs,
                deadline,
            })
            .await?;
        tracing::debug!(
            record_id = %receipt.record.id(),
            is_existing = receipt.is_existing,
            "fabrication dispatched"
        );
        Ok(receipt)
    }
}

fn is_bound_to(issue: &Issue, mirror: &MirrorRef) -> bool {
    issue.mirror().is_some_and(|bound| {
        bound.repo() == mirror.repo() && bound.artifact_id() == mirror.artifact_id()
    })
}

fn render_document(
    target: &FabricationTarget,
    canonical_id: &CanonicalId,
    content: Option<MirrorContext>,
) -> Result<MirrorDocument, MirrorDomainError> {
    let context = content
        .unwrap_or_else(|| MirrorContext::new(canonical_id, canonical_id.as_str(), ""));
    target.template.render(canonical_id, &context)
}

const fn disposition_target(disposition: FailureDisposition) -> Option<IssueState> {
    match disposition {
        FailureDisposition::StayImplementing => None,
        FailureDisposition::MoveToHold => Some(IssueState::Hold),
    }
}
