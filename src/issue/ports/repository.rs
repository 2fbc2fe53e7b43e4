//! Repository port for issue persistence with optimistic concurrency.

use crate::issue::domain::{CanonicalId, Issue, IssueId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for issue repository operations.
pub type IssueRepositoryResult<T> = Result<T, IssueRepositoryError>;

/// Outcome of a compare-and-set update attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The update was applied; carries the stored aggregate with its bumped
    /// version.
    Updated(Issue),
    /// Another writer updated the issue first; carries the current stored
    /// aggregate for re-read.
    Conflict(Issue),
}

/// Issue persistence contract.
///
/// The current-state field is guarded by compare-and-set on the aggregate
/// version so concurrent transition attempts cannot lose updates.
#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// Stores a new issue.
    ///
    /// # Errors
    ///
    /// Returns [`IssueRepositoryError::DuplicateIssue`] when the issue ID
    /// already exists or [`IssueRepositoryError::DuplicateCanonicalId`] when
    /// the canonical identifier already maps to an issue.
    async fn store(&self, issue: &Issue) -> IssueRepositoryResult<()>;

    /// Persists changes to an existing issue under the version guard.
    ///
    /// The stored row must still carry the version the aggregate was loaded
    /// with; on success the stored version is bumped by one.
    ///
    /// # Errors
    ///
    /// Returns [`IssueRepositoryError::NotFound`] when the issue does not
    /// exist.
    async fn update(&self, issue: &Issue) -> IssueRepositoryResult<UpdateOutcome>;

    /// Finds an issue by internal identifier.
    ///
    /// Returns `None` when the issue does not exist.
    async fn find_by_id(&self, id: IssueId) -> IssueRepositoryResult<Option<Issue>>;

    /// Finds an issue by canonical identifier.
    ///
    /// Returns `None` when no issue carries the canonical identifier.
    async fn find_by_canonical_id(
        &self,
        canonical_id: &CanonicalId,
    ) -> IssueRepositoryResult<Option<Issue>>;
}

/// Errors returned by issue repository implementations.
#[derive(Debug, Clone, Error)]
pub enum IssueRepositoryError {
    /// An issue with the same identifier already exists.
    #[error("duplicate issue identifier: {0}")]
    DuplicateIssue(IssueId),

    /// An issue with the same canonical identifier already exists.
    #[error("duplicate canonical identifier: {0}")]
    DuplicateCanonicalId(CanonicalId),

    /// The issue was not found.
    #[error("issue not found: {0}")]
    NotFound(IssueId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl IssueRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
