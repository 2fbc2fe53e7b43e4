//! In-memory tracker client for deterministic resolver tests.

use crate::issue::domain::{ArtifactId, RepoCoords};
use crate::mirror::domain::TrackerArtifact;
use crate::mirror::ports::{TrackerClient, TrackerError, TrackerResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct TrackerState {
    artifacts: HashMap<RepoCoords, Vec<TrackerArtifact>>,
    search_errors: VecDeque<TrackerError>,
    get_errors: VecDeque<TrackerError>,
}

/// Thread-safe in-memory tracker client.
///
/// Serves seeded artifacts in insertion order and counts calls so tests
/// can assert exactly how many external interactions occurred. Scripted
/// errors are consumed once each, in queue order, before any lookup.
#[derive(Clone, Default)]
pub struct InMemoryTrackerClient {
    state: Arc<RwLock<TrackerState>>,
    search_calls: Arc<AtomicUsize>,
    get_calls: Arc<AtomicUsize>,
}

fn lock_poisoned(err: impl std::fmt::Display) -> TrackerError {
    TrackerError::Malformed {
        detail: format!("tracker state lock poisoned: {err}"),
    }
}

impl InMemoryTrackerClient {
    /// Creates an empty in-memory tracker client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an artifact into a repository's search index.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Malformed`] when the state lock is poisoned.
    pub fn seed_artifact(
        &self,
        repo: &RepoCoords,
        artifact: TrackerArtifact,
    ) -> TrackerResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.artifacts.entry(repo.clone()).or_default().push(artifact);
        Ok(())
    }

    /// Queues an error returned by the next `search` call.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Malformed`] when the state lock is poisoned.
    pub fn queue_search_error(&self, error: TrackerError) -> TrackerResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.search_errors.push_back(error);
        Ok(())
    }

    /// Queues an error returned by the next `get_artifact` call.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Malformed`] when the state lock is poisoned.
    pub fn queue_get_error(&self, error: TrackerError) -> TrackerResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.get_errors.push_back(error);
        Ok(())
    }

    /// Returns how many `search` calls this client has served.
    #[must_use]
    pub fn search_call_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Returns how many `get_artifact` calls this client has served.
    #[must_use]
    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackerClient for InMemoryTrackerClient {
    async fn search(&self, repo: &RepoCoords, query: &str) -> TrackerResult<Vec<TrackerArtifact>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if let Some(error) = state.search_errors.pop_front() {
            return Err(error);
        }

        Ok(state.artifacts.get(repo).map_or_else(Vec::new, |artifacts| {
            artifacts
                .iter()
                .filter(|artifact| {
                    artifact.title.contains(query) || artifact.body.contains(query)
                })
                .cloned()
                .collect()
        }))
    }

    async fn get_artifact(
        &self,
        repo: &RepoCoords,
        artifact_id: ArtifactId,
    ) -> TrackerResult<TrackerArtifact> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if let Some(error) = state.get_errors.pop_front() {
            return Err(error);
        }

        state
            .artifacts
            .get(repo)
            .and_then(|artifacts| artifacts.iter().find(|artifact| artifact.id == artifact_id))
            .cloned()
            .ok_or_else(|| TrackerError::NotFound {
                repo: repo.clone(),
                artifact_id,
            })
    }
}
