//! In-memory mirror provisioner backed by the in-memory tracker.

use crate::issue::domain::{ArtifactId, CanonicalId, MirrorRef, RepoCoords};
use crate::mirror::adapters::memory::InMemoryTrackerClient;
use crate::mirror::domain::{ArtifactKind, MirrorDocument, TrackerArtifact};
use crate::pipeline::ports::{MirrorProvisioner, ProvisionError, ProvisionResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mirror provisioner that creates artifacts in an in-memory tracker.
///
/// Each provisioned document lands in the shared tracker's search index,
/// so a subsequent resolution finds the artifact it created. Artifact
/// numbers are assigned sequentially and calls are counted so tests can
/// assert exactly how many creations occurred.
#[derive(Clone)]
pub struct InMemoryMirrorProvisioner {
    tracker: Arc<InMemoryTrackerClient>,
    next_artifact: Arc<AtomicU64>,
    errors: Arc<Mutex<VecDeque<ProvisionError>>>,
    calls: Arc<AtomicUsize>,
}

fn internal_failure(detail: impl std::fmt::Display) -> ProvisionError {
    ProvisionError::Permanent {
        detail: detail.to_string(),
    }
}

impl InMemoryMirrorProvisioner {
    /// Creates a provisioner writing into the given tracker.
    #[must_use]
    pub fn new(tracker: Arc<InMemoryTrackerClient>) -> Self {
        Self {
            tracker,
            next_artifact: Arc::new(AtomicU64::new(1)),
            errors: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Starts artifact numbering at the given value.
    ///
    /// Useful when a test pre-seeds the tracker and needs provisioned
    /// numbers to stay clear of the seeded ones.
    #[must_use]
    pub fn with_next_artifact(self, value: u64) -> Self {
        self.next_artifact.store(value, Ordering::SeqCst);
        self
    }

    /// Queues an error returned by the next `provision` call.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Permanent`] when the error queue lock is
    /// poisoned.
    pub fn queue_error(&self, error: ProvisionError) -> ProvisionResult<()> {
        let mut errors = self.errors.lock().map_err(internal_failure)?;
        errors.push_back(error);
        Ok(())
    }

    /// Returns how many `provision` calls this adapter has served.
    #[must_use]
    pub fn provision_call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MirrorProvisioner for InMemoryMirrorProvisioner {
    async fn provision(
        &self,
        repo: &RepoCoords,
        canonical_id: &CanonicalId,
        document: &MirrorDocument,
    ) -> ProvisionResult<MirrorRef> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self
            .errors
            .lock()
            .map_err(internal_failure)?
            .pop_front()
        {
            return Err(error);
        }

        let number = self.next_artifact.fetch_add(1, Ordering::SeqCst);
        let artifact_id = ArtifactId::new(number).map_err(internal_failure)?;
        let url = format!("https://tracker.example/{repo}/issues/{number}");
        let artifact = TrackerArtifact::new(
            artifact_id,
            &url,
            document.title(),
            document.body(),
            ArtifactKind::Issue,
        );
        self.tracker
            .seed_artifact(repo, artifact)
            .map_err(internal_failure)?;
        tracing::debug!(repo = %repo, canonical_id = %canonical_id, artifact_id = %artifact_id, "mirror artifact provisioned");

        Ok(MirrorRef::new(repo.clone(), artifact_id, url))
    }
}
