//! Tracker artifact snapshots and resolution outcomes.

use crate::issue::domain::ArtifactId;
use serde::{Deserialize, Serialize};

/// Kind of artifact an external tracker search can return.
///
/// Combined search indexes return issues and pull requests together; the
/// resolver only ever matches issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A tracker issue, eligible as a mirror.
    Issue,
    /// A pull request, never a mirror.
    PullRequest,
}

/// Snapshot of an external tracker artifact as returned by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerArtifact {
    /// Artifact number assigned by the tracker.
    pub id: ArtifactId,
    /// Canonical browse URL for the artifact.
    pub url: String,
    /// Artifact title as stored by the tracker.
    pub title: String,
    /// Artifact body as stored by the tracker.
    pub body: String,
    /// Whether the artifact is an issue or a pull request.
    pub kind: ArtifactKind,
}

impl TrackerArtifact {
    /// Creates an artifact snapshot.
    #[must_use]
    pub fn new(
        id: ArtifactId,
        url: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        kind: ArtifactKind,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            title: title.into(),
            body: body.into(),
            kind,
        }
    }
}

/// Which marker produced a resolver match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    /// The body marker line matched. Takes precedence.
    BodyMarker,
    /// The title marker matched.
    TitleMarker,
}

/// A resolved mirror artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorMatch {
    /// Matched artifact number.
    pub artifact_id: ArtifactId,
    /// Matched artifact browse URL.
    pub url: String,
    /// Which marker produced the match.
    pub matched_by: MatchedBy,
}

/// Outcome of a canonical identifier resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Exactly one artifact was selected as the mirror.
    Found(MirrorMatch),
    /// No artifact carries the canonical identifier.
    NotFound,
}
