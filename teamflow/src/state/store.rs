//! Single-writer project store with snapshot reads.

use super::ProjectState;
use crate::core::{ProjectRequest, RunStatus, StageId, StageResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// Process-wide holder of the active [`ProjectState`].
///
/// Readers clone an `Arc` snapshot and never block on a run. Writers
/// copy-on-write, so snapshots already handed out stay unchanged. Only the
/// orchestrator writes; it serializes writes under its run lock.
#[derive(Debug, Default)]
pub struct ProjectStore {
    state: RwLock<Arc<ProjectState>>,
}

impl ProjectStore {
    /// Creates an idle store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ProjectState> {
        Arc::clone(&self.state.read())
    }

    fn update<R>(&self, f: impl FnOnce(&mut ProjectState) -> R) -> R {
        let mut guard = self.state.write();
        f(Arc::make_mut(&mut guard))
    }

    /// Replaces the state with a fresh running project.
    pub fn begin(&self, request: ProjectRequest, resolved: Vec<StageId>) -> Arc<ProjectState> {
        let fresh = Arc::new(ProjectState::running(request, resolved));
        *self.state.write() = Arc::clone(&fresh);
        fresh
    }

    /// Ensures a project exists for single-stage work, creating an ad-hoc
    /// one from `description` when idle, and marks it running.
    pub fn ensure_project(&self, description: &str) -> Arc<ProjectState> {
        let mut guard = self.state.write();
        if guard.is_idle() {
            let mut state = ProjectState::idle();
            state.request = Some(ProjectRequest::ad_hoc(description));
            *guard = Arc::new(state);
        }
        let state = Arc::make_mut(&mut guard);
        state.status = RunStatus::Running;
        state.updated_at = chrono::Utc::now();
        Arc::clone(&guard)
    }

    /// Writes one stage result.
    pub fn record(&self, result: StageResult) {
        self.update(|state| state.upsert(result));
    }

    /// Sets the overall status.
    pub fn set_status(&self, status: RunStatus) {
        self.update(|state| {
            state.status = status;
            state.updated_at = chrono::Utc::now();
        });
    }

    /// Clears the store back to idle.
    pub fn reset(&self) {
        *self.state.write() = Arc::new(ProjectState::idle());
    }
}
