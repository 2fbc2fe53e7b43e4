//! Service layer for issue creation, retrieval, and validated mutation.

use crate::issue::{
    domain::{CanonicalId, Issue, IssueDomainError, IssueId, IssueState, MirrorRef},
    ports::{IssueRepository, IssueRepositoryError, UpdateOutcome},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Upper bound on optimistic-concurrency retries for a single mutation.
const MAX_UPDATE_ATTEMPTS: u32 = 3;

/// Service-level errors for issue lifecycle operations.
#[derive(Debug, Error)]
pub enum IssueLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] IssueDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] IssueRepositoryError),
    /// No issue exists with the requested identifier.
    #[error("issue {0} not found")]
    NotFound(IssueId),
    /// Concurrent writers kept invalidating the update.
    #[error("issue {0} was concurrently modified; retries exhausted")]
    Conflict(IssueId),
}

/// Result type for issue lifecycle service operations.
pub type IssueLifecycleResult<T> = Result<T, IssueLifecycleError>;

/// Issue lifecycle orchestration service.
///
/// Mutations reload the aggregate and revalidate the domain rule on every
/// optimistic-concurrency conflict, so a transition that raced another
/// writer is re-checked against the state the other writer produced.
#[derive(Clone)]
pub struct IssueLifecycleService<R, C>
where
    R: IssueRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> IssueLifecycleService<R, C>
where
    R: IssueRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new issue lifecycle service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates and persists a new issue in the `Created` state.
    ///
    /// # Errors
    ///
    /// Returns [`IssueLifecycleError::Repository`] when another issue
    /// already carries the canonical identifier or persistence fails.
    #[tracing::instrument(skip(self), fields(canonical_id = %canonical_id))]
    pub async fn create(&self, canonical_id: CanonicalId) -> IssueLifecycleResult<Issue> {
        let issue = Issue::new(canonical_id, &*self.clock);
        self.repository.store(&issue).await?;
        tracing::debug!(issue_id = %issue.id(), "issue created");
        Ok(issue)
    }

    /// Retrieves an issue by identifier.
    ///
    /// Returns `Ok(None)` when no issue exists with the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IssueLifecycleError::Repository`] when the lookup fails.
    pub async fn get(&self, id: IssueId) -> IssueLifecycleResult<Option<Issue>> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Retrieves an issue by its canonical identifier.
    ///
    /// Returns `Ok(None)` when no issue carries the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IssueLifecycleError::Repository`] when the lookup fails.
    pub async fn find_by_canonical_id(
        &self,
        canonical_id: &CanonicalId,
    ) -> IssueLifecycleResult<Option<Issue>> {
        Ok(self.repository.find_by_canonical_id(canonical_id).await?)
    }

    /// Transitions an issue to a new state.
    ///
    /// The transition is validated against the domain state machine before
    /// every persistence attempt, including re-reads after a concurrency
    /// conflict.
    ///
    /// # Errors
    ///
    /// Returns [`IssueLifecycleError::Domain`] when the state machine
    /// rejects the transition, [`IssueLifecycleError::NotFound`] when the
    /// issue does not exist, and [`IssueLifecycleError::Conflict`] when
    /// concurrent writers exhaust the retry budget.
    #[tracing::instrument(skip(self), fields(issue_id = %id, to = %to))]
    pub async fn transition(&self, id: IssueId, to: IssueState) -> IssueLifecycleResult<Issue> {
        self.mutate(id, move |issue, clock| issue.transition_to(to, clock))
            .await
    }

    /// Binds a tracker mirror reference to an issue.
    ///
    /// Rebinding the same artifact is idempotent; binding a different
    /// artifact is rejected by the domain.
    ///
    /// # Errors
    ///
    /// Returns [`IssueLifecycleError::Domain`] when the issue is killed or
    /// already bound elsewhere, [`IssueLifecycleError::NotFound`] when the
    /// issue does not exist, and [`IssueLifecycleError::Conflict`] when
    /// concurrent writers exhaust the retry budget.
    #[tracing::instrument(skip(self, mirror), fields(issue_id = %id, mirror = %mirror))]
    pub async fn bind_mirror(&self, id: IssueId, mirror: MirrorRef) -> IssueLifecycleResult<Issue> {
        self.mutate(id, move |issue, clock| {
            issue.bind_mirror(mirror.clone(), clock)
        })
        .await
    }

    async fn mutate<F>(&self, id: IssueId, apply: F) -> IssueLifecycleResult<Issue>
    where
        F: Fn(&mut Issue, &C) -> Result<(), IssueDomainError>,
    {
        let mut issue = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(IssueLifecycleError::NotFound(id))?;

        for _ in 0..MAX_UPDATE_ATTEMPTS {
            apply(&mut issue, &*self.clock)?;
            match self.repository.update(&issue).await? {
                UpdateOutcome::Updated(stored) => {
                    tracing::debug!(state = %stored.state(), version = stored.version(), "issue updated");
                    return Ok(stored);
                }
                UpdateOutcome::Conflict(current) => {
                    tracing::debug!(version = current.version(), "concurrent update detected; revalidating");
                    issue = current;
                }
            }
        }

        Err(IssueLifecycleError::Conflict(id))
    }
}
