//! Canonical identifier resolution against the external tracker.

use crate::issue::domain::{ArtifactId, CanonicalId, IssueDomainError, RepoCoords};
use crate::mirror::domain::{
    ArtifactKind, MatchedBy, MirrorMatch, Resolution, TrackerArtifact,
    marker::{parse_body_marker, parse_title_marker},
};
use crate::mirror::ports::{TrackerClient, TrackerError};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by mirror resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The canonical identifier failed validation before any external call.
    #[error(transparent)]
    Validation(#[from] IssueDomainError),
    /// The tracker refused or failed the lookup.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Result type for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Read-only resolver mapping a canonical identifier to its mirror
/// artifact.
///
/// Resolution is idempotent and deterministic given unchanged tracker
/// state: no randomness, no wall-clock branching, and no internal retry.
/// Retry policy for transient tracker failures belongs to the caller.
#[derive(Clone)]
pub struct MirrorResolver<T>
where
    T: TrackerClient,
{
    tracker: Arc<T>,
}

impl<T> MirrorResolver<T>
where
    T: TrackerClient,
{
    /// Creates a resolver over a tracker client.
    #[must_use]
    pub const fn new(tracker: Arc<T>) -> Self {
        Self { tracker }
    }

    /// Resolves a canonical identifier to an existing mirror artifact.
    ///
    /// The raw identifier is validated before any external call; a blank
    /// identifier never reaches the tracker. Candidates are searched
    /// repo-scoped with the identifier as a literal substring, pull
    /// requests are filtered out, and markers are extracted with
    /// exact-format parsing. A body-marker match takes precedence over a
    /// title-marker match, and an artifact whose body names some other
    /// identifier never matches by title; ties resolve to the first
    /// candidate in the tracker's stable result order.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Validation`] for a blank or malformed
    /// identifier, and [`ResolveError::Tracker`] when the tracker refuses
    /// or fails the search.
    #[tracing::instrument(skip(self), fields(repo = %repo, canonical_id = raw_id))]
    pub async fn resolve(&self, repo: &RepoCoords, raw_id: &str) -> ResolveResult<Resolution> {
        let canonical_id = CanonicalId::new(raw_id)?;
        let artifacts = self.tracker.search(repo, canonical_id.as_str()).await?;

        let mut title_match: Option<MirrorMatch> = None;
        for artifact in &artifacts {
            if artifact.kind != ArtifactKind::Issue {
                continue;
            }
            match parse_body_marker(&artifact.body) {
                Some(id) if id == canonical_id.as_str() => {
                    tracing::debug!(artifact_id = %artifact.id, "resolved by body marker");
                    return Ok(Resolution::Found(matched(artifact, MatchedBy::BodyMarker)));
                }
                // A present body marker is the artifact's identity; the
                // title is consulted only when the body carries none.
                Some(_) => continue,
                None => {
                    if title_match.is_none()
                        && parse_title_marker(&artifact.title) == Some(canonical_id.as_str())
                    {
                        title_match = Some(matched(artifact, MatchedBy::TitleMarker));
                    }
                }
            }
        }

        Ok(title_match.map_or(Resolution::NotFound, Resolution::Found))
    }

    /// Fetches a single artifact, verifying a previously bound mirror
    /// reference still names a live issue.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Tracker`] when the artifact is missing or
    /// the tracker refuses the lookup.
    pub async fn lookup_artifact(
        &self,
        repo: &RepoCoords,
        artifact_id: ArtifactId,
    ) -> ResolveResult<TrackerArtifact> {
        Ok(self.tracker.get_artifact(repo, artifact_id).await?)
    }
}

fn matched(artifact: &TrackerArtifact, matched_by: MatchedBy) -> MirrorMatch {
    MirrorMatch {
        artifact_id: artifact.id,
        url: artifact.url.clone(),
        matched_by,
    }
}
