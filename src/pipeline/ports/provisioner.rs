//! Provisioner port for creating mirror artifacts.

use crate::issue::domain::{CanonicalId, MirrorRef, RepoCoords};
use crate::mirror::domain::MirrorDocument;
use async_trait::async_trait;
use thiserror::Error;

/// Result type for provisioner operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Creates mirror artifacts in the external tracker.
///
/// The pipeline resolves first and provisions only when no artifact
/// carries the canonical identifier. Implementations must store the
/// document verbatim so both markers stay parseable on the next
/// resolution.
#[async_trait]
pub trait MirrorProvisioner: Send + Sync {
    /// Creates a mirror artifact for the document and returns its
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::AccessDenied`] when the repository is
    /// not authorized, or a transport-level [`ProvisionError`] otherwise.
    async fn provision(
        &self,
        repo: &RepoCoords,
        canonical_id: &CanonicalId,
        document: &MirrorDocument,
    ) -> ProvisionResult<MirrorRef>;
}

/// Errors returned by provisioner implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProvisionError {
    /// The repository is not authorized for this provisioner.
    #[error("mirror provisioning denied for {repo}")]
    AccessDenied {
        /// Repository that was refused.
        repo: RepoCoords,
    },

    /// A retryable transport or availability failure.
    #[error("transient provisioning failure (status {status:?}): {detail}")]
    Transient {
        /// Failure detail for diagnostics.
        detail: String,
        /// HTTP-level status where applicable.
        status: Option<u16>,
    },

    /// A failure retrying cannot fix.
    #[error("mirror provisioning failed: {detail}")]
    Permanent {
        /// Failure detail for diagnostics.
        detail: String,
    },
}

impl ProvisionError {
    /// Returns whether a caller-owned retry may reasonably succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
