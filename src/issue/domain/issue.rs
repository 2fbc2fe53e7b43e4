//! Issue aggregate root and lifecycle mutation rules.

use super::{CanonicalId, IssueDomainError, IssueId, IssueState, MirrorRef};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Issue aggregate root.
///
/// Issues are created in [`IssueState::Created`], mutated only through
/// validated transitions, and never deleted: `Done` and `Killed` records are
/// retained for audit. The `version` field is the optimistic-concurrency
/// guard checked by the repository on every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    id: IssueId,
    canonical_id: CanonicalId,
    state: IssueState,
    mirror: Option<MirrorRef>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted issue aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedIssueData {
    /// Persisted issue identifier.
    pub id: IssueId,
    /// Persisted canonical identifier.
    pub canonical_id: CanonicalId,
    /// Persisted lifecycle state.
    pub state: IssueState,
    /// Persisted mirror reference, if any.
    pub mirror: Option<MirrorRef>,
    /// Persisted concurrency version.
    pub version: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest lifecycle timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Creates a new issue in [`IssueState::Created`].
    #[must_use]
    pub fn new(canonical_id: CanonicalId, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: IssueId::new(),
            canonical_id,
            state: IssueState::Created,
            mirror: None,
            version: 0,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs an issue from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedIssueData) -> Self {
        Self {
            id: data.id,
            canonical_id: data.canonical_id,
            state: data.state,
            mirror: data.mirror,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the issue identifier.
    #[must_use]
    pub const fn id(&self) -> IssueId {
        self.id
    }

    /// Returns the canonical identifier. Immutable once assigned.
    #[must_use]
    pub const fn canonical_id(&self) -> &CanonicalId {
        &self.canonical_id
    }

    /// Returns the issue lifecycle state.
    #[must_use]
    pub const fn state(&self) -> IssueState {
        self.state
    }

    /// Returns the bound mirror reference, if any.
    #[must_use]
    pub const fn mirror(&self) -> Option<&MirrorRef> {
        self.mirror.as_ref()
    }

    /// Returns the optimistic-concurrency version this aggregate was loaded
    /// with.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a validated lifecycle transition.
    ///
    /// A rejected transition never mutates the aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`IssueDomainError::InvalidTransition`] when `to` is not in the
    /// transition table for the current state. Terminal states reject every
    /// target.
    pub fn transition_to(
        &mut self,
        to: IssueState,
        clock: &impl Clock,
    ) -> Result<(), IssueDomainError> {
        if !self.state.can_transition_to(to) {
            return Err(IssueDomainError::InvalidTransition {
                issue_id: self.id,
                from: self.state,
                to,
            });
        }
        self.state = to;
        self.touch(clock);
        Ok(())
    }

    /// Binds the external mirror artifact to this issue.
    ///
    /// Rebinding the same artifact is an idempotent no-op. The binding is
    /// permanent: the reference refers to exactly one external artifact for
    /// the lifetime of the issue.
    ///
    /// # Errors
    ///
    /// Returns [`IssueDomainError::IssueKilled`] when the issue is killed,
    /// or [`IssueDomainError::MirrorAlreadyBound`] when a different artifact
    /// is already bound.
    pub fn bind_mirror(
        &mut self,
        mirror: MirrorRef,
        clock: &impl Clock,
    ) -> Result<(), IssueDomainError> {
        if self.state == IssueState::Killed {
            return Err(IssueDomainError::IssueKilled(self.id));
        }
        if let Some(existing) = &self.mirror {
            if existing.repo() == mirror.repo() && existing.artifact_id() == mirror.artifact_id() {
                return Ok(());
            }
            return Err(IssueDomainError::MirrorAlreadyBound {
                issue_id: self.id,
                existing: existing.clone(),
            });
        }
        self.mirror = Some(mirror);
        self.touch(clock);
        Ok(())
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
