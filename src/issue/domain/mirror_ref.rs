//! Weak reference to the external mirror artifact of an issue.

use super::{ArtifactId, RepoCoords};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to the external tracker artifact mirroring an issue.
///
/// The reference is a relation plus lookup key, never ownership: the
/// external system knows nothing of canonical identifiers, so callers
/// re-resolve through the mirror resolver on significant operations rather
/// than trusting a cached reference indefinitely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MirrorRef {
    repo: RepoCoords,
    artifact_id: ArtifactId,
    url: String,
}

impl MirrorRef {
    /// Creates a mirror reference from validated components.
    #[must_use]
    pub fn new(repo: RepoCoords, artifact_id: ArtifactId, url: impl Into<String>) -> Self {
        Self {
            repo,
            artifact_id,
            url: url.into(),
        }
    }

    /// Returns the repository the artifact lives in.
    #[must_use]
    pub const fn repo(&self) -> &RepoCoords {
        &self.repo
    }

    /// Returns the external artifact number.
    #[must_use]
    pub const fn artifact_id(&self) -> ArtifactId {
        self.artifact_id
    }

    /// Returns the artifact URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for MirrorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.artifact_id)
    }
}
