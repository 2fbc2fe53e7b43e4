//! Domain model for canonical issue lifecycle management.
//!
//! The issue domain models canonical-ID assignment, the validated state
//! machine, and the weak mirror-artifact reference while keeping all
//! infrastructure concerns outside of the domain boundary.

mod error;
mod ids;
mod issue;
mod mirror_ref;
mod state;

pub use error::{IssueDomainError, ParseIssueStateError};
pub use ids::{ArtifactId, CanonicalId, IssueId, RepoCoords};
pub use issue::{Issue, PersistedIssueData};
pub use mirror_ref::MirrorRef;
pub use state::IssueState;
