//! Tracker client port for read-only mirror resolution.

use crate::issue::domain::{ArtifactId, RepoCoords};
use crate::mirror::domain::TrackerArtifact;
use async_trait::async_trait;
use thiserror::Error;

/// Result type for tracker client operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Authenticated external-tracker contract consumed by the resolver.
///
/// Implementations own authentication, rate limiting, and transport; the
/// resolver treats every call as read-only and never retries internally.
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Searches artifacts in a repository containing the query as a
    /// literal substring, in the tracker's stable result order.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::AccessDenied`] when the repository is not
    /// authorized, or a transport-level [`TrackerError`] otherwise.
    async fn search(&self, repo: &RepoCoords, query: &str) -> TrackerResult<Vec<TrackerArtifact>>;

    /// Fetches a single artifact by its tracker-assigned number.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] when no artifact carries the
    /// number, or [`TrackerError::AccessDenied`] when the repository is
    /// not authorized.
    async fn get_artifact(
        &self,
        repo: &RepoCoords,
        artifact_id: ArtifactId,
    ) -> TrackerResult<TrackerArtifact>;
}

/// Errors returned by tracker client implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// The repository is not authorized for this client.
    #[error("tracker access denied for {repo}")]
    AccessDenied {
        /// Repository that was refused.
        repo: RepoCoords,
    },

    /// The artifact does not exist.
    #[error("artifact {repo}#{artifact_id} not found")]
    NotFound {
        /// Repository that was queried.
        repo: RepoCoords,
        /// Artifact number that was queried.
        artifact_id: ArtifactId,
    },

    /// A retryable transport or availability failure.
    #[error("transient tracker failure (status {status:?}): {detail}")]
    Transient {
        /// Failure detail for diagnostics.
        detail: String,
        /// HTTP-level status where applicable.
        status: Option<u16>,
    },

    /// The tracker returned a response this client cannot interpret.
    #[error("malformed tracker response: {detail}")]
    Malformed {
        /// Failure detail for diagnostics.
        detail: String,
    },
}

impl TrackerError {
    /// Returns whether a caller-owned retry may reasonably succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
