//! Domain types for mirror resolution and document rendering.

mod artifact;
mod error;
pub mod marker;
mod template;

pub use artifact::{ArtifactKind, MatchedBy, MirrorMatch, Resolution, TrackerArtifact};
pub use error::MirrorDomainError;
pub use template::{MirrorContext, MirrorDocument, MirrorTemplate};
