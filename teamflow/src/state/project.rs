//! The accumulated project state and read-only views of it.

use crate::core::{
    Artifact, ExecutionMode, ProjectRequest, RunStatus, StageId, StageResult, StageStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// Everything the team has produced for the active project.
///
/// Results keep insertion order, which is execution order. Re-running a
/// stage replaces its entry in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    /// The active request, or `None` when idle.
    pub request: Option<ProjectRequest>,
    /// Stages resolved for the current run (empty for ad-hoc work).
    pub resolved: Vec<StageId>,
    /// Stage results in execution order.
    pub results: Vec<StageResult>,
    /// Overall status.
    pub status: RunStatus,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::idle()
    }
}

impl ProjectState {
    /// An empty, idle state.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            request: None,
            resolved: Vec::new(),
            results: Vec::new(),
            status: RunStatus::Idle,
            updated_at: Utc::now(),
        }
    }

    /// A fresh running state for `request` over `resolved`.
    #[must_use]
    pub fn running(request: ProjectRequest, resolved: Vec<StageId>) -> Self {
        Self {
            request: Some(request),
            resolved,
            results: Vec::new(),
            status: RunStatus::Running,
            updated_at: Utc::now(),
        }
    }

    /// Returns true if there is no active project.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.request.is_none()
    }

    /// The request description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.description.as_str())
    }

    /// Returns the result recorded for `stage`.
    #[must_use]
    pub fn result(&self, stage: StageId) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage == stage)
    }

    /// Returns the artifact of `stage` if it succeeded.
    #[must_use]
    pub fn artifact(&self, stage: StageId) -> Option<&Artifact> {
        self.result(stage)
            .filter(|r| r.is_success())
            .and_then(|r| r.artifact.as_ref())
    }

    /// Returns true if `stage` has a succeeded result.
    #[must_use]
    pub fn has_succeeded(&self, stage: StageId) -> bool {
        self.result(stage).is_some_and(StageResult::is_success)
    }

    /// Inserts `result`, replacing any earlier result for the same stage
    /// in place.
    ///
    /// For stages that accumulate files, a succeeded rerun keeps the files
    /// of the earlier succeeded result it does not overwrite.
    pub fn upsert(&mut self, mut result: StageResult) {
        match self.results.iter_mut().find(|r| r.stage == result.stage) {
            Some(existing) => {
                if result.stage.accumulates_files() && existing.is_success() && result.is_success() {
                    if let (Some(next), Some(earlier)) = (result.artifact.as_mut(), existing.artifact.as_ref()) {
                        next.absorb(earlier);
                    }
                }
                *existing = result;
            }
            None => self.results.push(result),
        }
        self.updated_at = Utc::now();
    }

    /// Read-only status view.
    #[must_use]
    pub fn status_summary(&self) -> StatusSummary {
        let stages = StageId::ALL
            .into_iter()
            .map(|stage| {
                let result = self.result(stage);
                let progress = match result.map(|r| r.status) {
                    Some(StageStatus::Succeeded) => StageProgress::Succeeded,
                    Some(StageStatus::Failed) => StageProgress::Failed,
                    Some(StageStatus::Skipped) => StageProgress::Skipped,
                    None if self.resolved.contains(&stage) => StageProgress::Pending,
                    None => StageProgress::NotScheduled,
                };
                StageStatusEntry {
                    stage,
                    agent: stage.agent_name().to_string(),
                    progress,
                    attempts: result.map_or(0, |r| r.attempts),
                    reason: result.and_then(StageResult::reason),
                }
            })
            .collect();

        StatusSummary {
            run_id: self.request.as_ref().map(|r| r.run_id),
            request: self.description().map(ToString::to_string),
            mode: self.request.as_ref().and_then(|r| r.mode),
            status: self.status,
            stages,
            updated_at: self.updated_at,
        }
    }
}

/// Progress of one stage as seen by a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageProgress {
    /// Resolved for the current run but not finished.
    Pending,
    /// Finished with an artifact.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Skipped by failure propagation or cancellation.
    Skipped,
    /// Not part of the current run.
    NotScheduled,
}

impl StageProgress {
    const fn marker(self) -> &'static str {
        match self {
            Self::Succeeded => "[x]",
            Self::Failed => "[!]",
            Self::Skipped => "[-]",
            Self::Pending => "[ ]",
            Self::NotScheduled => "   ",
        }
    }
}

/// One stage row in a [`StatusSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStatusEntry {
    /// Stage id.
    pub stage: StageId,
    /// Agent (tool) name.
    pub agent: String,
    /// Progress.
    pub progress: StageProgress,
    /// Attempts made so far.
    pub attempts: u32,
    /// Reason for failed or skipped stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Status of the active project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    /// Run that created the project.
    pub run_id: Option<Uuid>,
    /// Request description.
    pub request: Option<String>,
    /// Requested mode.
    pub mode: Option<ExecutionMode>,
    /// Overall status.
    pub status: RunStatus,
    /// Every stage in declaration order.
    pub stages: Vec<StageStatusEntry>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl StatusSummary {
    /// Human-readable summary of the project.
    #[must_use]
    pub fn render_text(&self) -> String {
        let Some(request) = &self.request else {
            return "No active project. Start one with the orchestrator tool.".to_string();
        };

        let mut out = String::new();
        let _ = writeln!(out, "Project: {request}");
        if let Some(mode) = self.mode {
            let _ = writeln!(out, "Mode: {mode}");
        }
        let _ = writeln!(out, "Status: {}", self.status);
        out.push('\n');

        for entry in self.stages.iter().filter(|e| e.progress != StageProgress::NotScheduled) {
            let _ = write!(out, "{} {:<14} ({})", entry.progress.marker(), entry.stage.as_str(), entry.agent);
            if let Some(reason) = &entry.reason {
                let _ = write!(out, " - {reason}");
            }
            out.push('\n');
        }

        let done = self
            .stages
            .iter()
            .filter(|e| e.progress == StageProgress::Succeeded)
            .count();
        let _ = write!(out, "\n{done} stage(s) succeeded.");
        out
    }
}
