//! Error types for issue domain validation and state transitions.

use super::{IssueId, IssueState, MirrorRef};
use thiserror::Error;

/// Errors returned while constructing or mutating domain issue values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IssueDomainError {
    /// The canonical identifier is empty after trimming.
    #[error("canonical identifier must not be empty")]
    EmptyCanonicalId,

    /// The canonical identifier contains whitespace or is too long.
    #[error("invalid canonical identifier '{0}'")]
    InvalidCanonicalId(String),

    /// The repository coordinates are not a valid `owner`/`name` pair.
    #[error("invalid repository coordinates '{0}', expected owner/name")]
    InvalidRepo(String),

    /// The artifact number is invalid.
    #[error("invalid artifact number {0}, expected a positive integer")]
    InvalidArtifactId(u64),

    /// The requested state change is not in the transition table.
    #[error("invalid transition for issue {issue_id}: {} -> {}", from.as_str(), to.as_str())]
    InvalidTransition {
        /// Issue whose transition was rejected.
        issue_id: IssueId,
        /// State the issue was in.
        from: IssueState,
        /// State the caller requested.
        to: IssueState,
    },

    /// A different mirror artifact is already bound to the issue.
    #[error("issue {issue_id} is already mirrored to {}#{}", existing.repo(), existing.artifact_id())]
    MirrorAlreadyBound {
        /// Issue carrying the existing binding.
        issue_id: IssueId,
        /// The mirror reference already in place.
        existing: MirrorRef,
    },

    /// The issue is killed; no further operations may act on it.
    #[error("issue {0} is killed and rejects all further operations")]
    IssueKilled(IssueId),
}

/// Error returned while parsing issue states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown issue state: {0}")]
pub struct ParseIssueStateError(pub String);
