//! Canonical issue lifecycle states and the validated transition table.

use super::ParseIssueStateError;
use serde::{Deserialize, Serialize};

/// Canonical issue lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    /// Issue record exists but no specification has been produced.
    Created,
    /// Specification is ready; implementation has not started.
    SpecReady,
    /// Implementation work is in flight.
    Implementing,
    /// Implementation has passed verification.
    Verified,
    /// Verified work is staged for merge.
    MergeReady,
    /// Work is merged and the issue is closed. Terminal.
    Done,
    /// Work is parked; the issue resumes from where it left off.
    Hold,
    /// The issue is abandoned. Terminal; nothing may act on it again.
    Killed,
}

impl IssueState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::SpecReady => "spec_ready",
            Self::Implementing => "implementing",
            Self::Verified => "verified",
            Self::MergeReady => "merge_ready",
            Self::Done => "done",
            Self::Hold => "hold",
            Self::Killed => "killed",
        }
    }

    /// Returns the states this state may legally transition to.
    ///
    /// Terminal states return an empty slice.
    #[must_use]
    pub const fn transitions_from(self) -> &'static [Self] {
        match self {
            Self::Created => &[Self::SpecReady, Self::Hold, Self::Killed],
            Self::SpecReady => &[Self::Implementing, Self::Hold, Self::Killed],
            Self::Implementing => &[Self::Verified, Self::SpecReady, Self::Hold, Self::Killed],
            Self::Verified => &[Self::MergeReady, Self::Implementing, Self::Hold, Self::Killed],
            Self::MergeReady => &[Self::Done, Self::Verified, Self::Hold, Self::Killed],
            Self::Hold => &[
                Self::Created,
                Self::SpecReady,
                Self::Implementing,
                Self::Verified,
                Self::MergeReady,
                Self::Killed,
            ],
            Self::Done | Self::Killed => &[],
        }
    }

    /// Returns whether the transition `self -> to` is in the table.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.transitions_from().contains(&to)
    }

    /// Returns whether this state has no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Killed)
    }

    /// Returns whether the state is eligible for dispatch and external
    /// writes: every non-terminal state except [`IssueState::Hold`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Hold | Self::Done | Self::Killed)
    }
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for IssueState {
    type Error = ParseIssueStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "created" => Ok(Self::Created),
            "spec_ready" => Ok(Self::SpecReady),
            "implementing" => Ok(Self::Implementing),
            "verified" => Ok(Self::Verified),
            "merge_ready" => Ok(Self::MergeReady),
            "done" => Ok(Self::Done),
            "hold" => Ok(Self::Hold),
            "killed" => Ok(Self::Killed),
            _ => Err(ParseIssueStateError(value.to_owned())),
        }
    }
}
