//! In-memory issue repository for lifecycle tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::issue::{
    domain::{CanonicalId, Issue, IssueId, PersistedIssueData},
    ports::{IssueRepository, IssueRepositoryError, IssueRepositoryResult, UpdateOutcome},
};

/// Thread-safe in-memory issue repository.
///
/// The compare-and-set guard is enforced under the write lock, matching the
/// atomicity the `PostgreSQL` adapter gets from its guarded UPDATE.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIssueRepository {
    state: Arc<RwLock<InMemoryIssueState>>,
}

#[derive(Debug, Default)]
struct InMemoryIssueState {
    issues: HashMap<IssueId, Issue>,
    canonical_index: HashMap<CanonicalId, IssueId>,
}

impl InMemoryIssueRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned(err: impl std::fmt::Display) -> IssueRepositoryError {
    IssueRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

/// Rebuilds a stored aggregate with the given concurrency version.
fn with_version(issue: &Issue, version: u64) -> Issue {
    Issue::from_persisted(PersistedIssueData {
        id: issue.id(),
        canonical_id: issue.canonical_id().clone(),
        state: issue.state(),
        mirror: issue.mirror().cloned(),
        version,
        created_at: issue.created_at(),
        updated_at: issue.updated_at(),
    })
}

#[async_trait]
impl IssueRepository for InMemoryIssueRepository {
    async fn store(&self, issue: &Issue) -> IssueRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if state.issues.contains_key(&issue.id()) {
            return Err(IssueRepositoryError::DuplicateIssue(issue.id()));
        }
        if state.canonical_index.contains_key(issue.canonical_id()) {
            return Err(IssueRepositoryError::DuplicateCanonicalId(
                issue.canonical_id().clone(),
            ));
        }

        state
            .canonical_index
            .insert(issue.canonical_id().clone(), issue.id());
        state.issues.insert(issue.id(), issue.clone());
        Ok(())
    }

    async fn update(&self, issue: &Issue) -> IssueRepositoryResult<UpdateOutcome> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let stored = state
            .issues
            .get(&issue.id())
            .ok_or(IssueRepositoryError::NotFound(issue.id()))?;

        if stored.version() != issue.version() {
            return Ok(UpdateOutcome::Conflict(stored.clone()));
        }

        let updated = with_version(issue, issue.version() + 1);
        state.issues.insert(issue.id(), updated.clone());
        Ok(UpdateOutcome::Updated(updated))
    }

    async fn find_by_id(&self, id: IssueId) -> IssueRepositoryResult<Option<Issue>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.issues.get(&id).cloned())
    }

    async fn find_by_canonical_id(
        &self,
        canonical_id: &CanonicalId,
    ) -> IssueRepositoryResult<Option<Issue>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        let issue = state
            .canonical_index
            .get(canonical_id)
            .and_then(|issue_id| state.issues.get(issue_id))
            .cloned();
        Ok(issue)
    }
}
