//! Consolidated result of one orchestrated run.

use crate::core::{ExecutionMode, RunStatus, StageId, StageResult, StageStatus};
use crate::pipeline::{Complexity, FailureSummary, StageGraph};
use crate::state::ProjectState;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// One resolved stage as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// Stage id.
    pub stage: StageId,
    /// Agent tool name for the stage.
    pub agent: String,
    /// Final stage status.
    pub status: StageStatus,
    /// Why the stage failed or was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Attempts made (0 for skipped stages).
    pub attempts: u32,
    /// Wall-clock time across all attempts.
    pub duration_ms: f64,
    /// Truncated artifact content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Paths of files the artifact proposes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl StageReport {
    fn from_result(result: &StageResult, preview_chars: usize) -> Self {
        let artifact = result.artifact.as_ref();
        Self {
            stage: result.stage,
            agent: result.stage.agent_name().to_string(),
            status: result.status,
            reason: result.reason(),
            attempts: result.attempts,
            duration_ms: result.duration_ms,
            preview: artifact.map(|a| a.preview(preview_chars)),
            files: artifact
                .map(|a| a.files.iter().map(|f| f.path.clone()).collect())
                .unwrap_or_default(),
        }
    }

    fn not_executed(stage: StageId) -> Self {
        Self {
            stage,
            agent: stage.agent_name().to_string(),
            status: StageStatus::Skipped,
            reason: Some("stage was not executed".to_string()),
            attempts: 0,
            duration_ms: 0.0,
            preview: None,
            files: Vec::new(),
        }
    }
}

/// Run summary returned by the `orchestrator` operation.
///
/// Lists every resolved stage in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run id.
    pub run_id: Uuid,
    /// The project request.
    pub request: String,
    /// Mode the caller asked for.
    pub mode: ExecutionMode,
    /// Mode actually run (differs from `mode` only for `custom`).
    pub effective_mode: ExecutionMode,
    /// Overall status.
    pub status: RunStatus,
    /// Per-stage reports.
    pub stages: Vec<StageReport>,
    /// Outcome counts over the resolved stages.
    pub counts: FailureSummary,
    /// Total run time.
    pub duration_ms: f64,
}

impl RunSummary {
    pub(crate) fn from_state(
        state: &ProjectState,
        mode: ExecutionMode,
        effective_mode: ExecutionMode,
        preview_chars: usize,
        duration_ms: f64,
    ) -> Self {
        let stages = state
            .resolved
            .iter()
            .map(|stage| {
                state.result(*stage).map_or_else(
                    || StageReport::not_executed(*stage),
                    |r| StageReport::from_result(r, preview_chars),
                )
            })
            .collect::<Vec<StageReport>>();
        let counts = FailureSummary::tally(stages.len(), stages.iter().map(|s| s.status));

        Self {
            run_id: state.request.as_ref().map_or_else(Uuid::nil, |r| r.run_id),
            request: state.description().unwrap_or_default().to_string(),
            mode,
            effective_mode,
            status: state.status,
            stages,
            counts,
            duration_ms,
        }
    }

    /// Report for one stage.
    #[must_use]
    pub fn stage(&self, stage: StageId) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Resolved stage ids in execution order.
    #[must_use]
    pub fn stage_ids(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.stage).collect()
    }

    /// Stages that ended with `status`.
    #[must_use]
    pub fn stages_with(&self, status: StageStatus) -> Vec<StageId> {
        self.stages
            .iter()
            .filter(|s| s.status == status)
            .map(|s| s.stage)
            .collect()
    }

    /// Plain-text rendering for tool clients.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "Run {} ({} mode, ran {}): {}\n",
            self.run_id, self.mode, self.effective_mode, self.status
        );
        for report in &self.stages {
            let _ = write!(out, "- {}: {}", report.stage.as_str(), status_label(report.status));
            if let Some(reason) = &report.reason {
                let _ = write!(out, " ({reason})");
            }
            out.push('\n');
        }
        let _ = write!(
            out,
            "{}/{} stages succeeded ({:.0}%), {} failed, {} skipped",
            self.counts.succeeded,
            self.counts.total_stages,
            self.counts.success_rate() * 100.0,
            self.counts.failed,
            self.counts.skipped
        );
        out
    }
}

/// One stage a plan would run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStage {
    /// Stage id.
    pub stage: StageId,
    /// Agent (tool) name.
    pub agent: String,
    /// Dependencies within the plan.
    pub depends_on: Vec<StageId>,
}

/// The stages a request would run, resolved without running anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPlan {
    /// The project request.
    pub request: String,
    /// Mode the caller asked for.
    pub mode: ExecutionMode,
    /// Mode that would run.
    pub effective_mode: ExecutionMode,
    /// Estimated complexity of the request.
    pub complexity: Complexity,
    /// Stages in execution order.
    pub stages: Vec<PlannedStage>,
}

impl RunPlan {
    pub(crate) fn new(
        request: &str,
        mode: ExecutionMode,
        effective_mode: ExecutionMode,
        complexity: Complexity,
        graph: &StageGraph,
        resolved: &[StageId],
    ) -> Self {
        let stages = resolved
            .iter()
            .map(|stage| PlannedStage {
                stage: *stage,
                agent: stage.agent_name().to_string(),
                depends_on: graph
                    .dependencies(*stage)
                    .iter()
                    .copied()
                    .filter(|d| resolved.contains(d))
                    .collect(),
            })
            .collect();

        Self {
            request: request.to_string(),
            mode,
            effective_mode,
            complexity,
            stages,
        }
    }

    /// Planned stage ids in execution order.
    #[must_use]
    pub fn stage_ids(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.stage).collect()
    }

    /// Plain-text rendering for tool clients.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "Plan for '{}' ({} mode, runs {}, complexity {}):\n",
            self.request, self.mode, self.effective_mode, self.complexity
        );
        for (step, planned) in self.stages.iter().enumerate() {
            let _ = write!(out, "{}. {} ({})", step + 1, planned.stage.as_str(), planned.agent);
            if !planned.depends_on.is_empty() {
                let deps: Vec<&str> = planned.depends_on.iter().map(|d| d.as_str()).collect();
                let _ = write!(out, " after {}", deps.join(", "));
            }
            out.push('\n');
        }
        out
    }
}

const fn status_label(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Succeeded => "succeeded",
        StageStatus::Failed => "failed",
        StageStatus::Skipped => "skipped",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Artifact, ErrorClass, ProjectRequest};

    #[test]
    fn test_summary_lists_every_resolved_stage() {
        let resolved = vec![StageId::Analysis, StageId::Research, StageId::Architecture];
        let mut state = ProjectState::running(
            ProjectRequest::new("Build a todo app", ExecutionMode::Planning),
            resolved.clone(),
        );
        state.upsert(StageResult::succeeded(
            StageId::Analysis,
            Artifact::new("Requirements", "a".repeat(50)).with_file("notes.md", "n"),
        ));
        state.upsert(StageResult::failed(StageId::Research, ErrorClass::Permanent, "search down"));
        state.status = RunStatus::Partial;

        let summary = RunSummary::from_state(&state, ExecutionMode::Planning, ExecutionMode::Planning, 10, 1.0);
        assert_eq!(summary.stage_ids(), resolved);
        assert_eq!(summary.request, "Build a todo app");

        let analysis = summary.stage(StageId::Analysis).unwrap();
        assert_eq!(analysis.preview.as_deref(), Some("aaaaaaaaaa..."));
        assert_eq!(analysis.files, vec!["notes.md"]);

        let research = summary.stage(StageId::Research).unwrap();
        assert!(research.reason.as_deref().unwrap().contains("search down"));

        let architecture = summary.stage(StageId::Architecture).unwrap();
        assert_eq!(architecture.status, StageStatus::Skipped);
        assert_eq!(summary.stages_with(StageStatus::Skipped), vec![StageId::Architecture]);

        assert_eq!(summary.counts.succeeded, 1);
        assert_eq!(summary.counts.failed, 1);
        assert_eq!(summary.counts.skipped, 1);
        assert_eq!(summary.counts.total_stages, 3);

        let text = summary.render_text();
        assert!(text.contains("- research: failed"));
        assert!(text.contains("1/3 stages succeeded (33%), 1 failed, 1 skipped"));
    }

    #[test]
    fn test_plan_keeps_dependencies_inside_plan() {
        let resolved = vec![StageId::Analysis, StageId::Research, StageId::Architecture];
        let plan = RunPlan::new(
            "Build a todo app",
            ExecutionMode::Custom,
            ExecutionMode::Planning,
            Complexity::Simple,
            &StageGraph::standard(),
            &resolved,
        );

        assert_eq!(plan.stage_ids(), resolved);
        assert!(plan.stages[0].depends_on.is_empty());
        assert_eq!(plan.stages[2].depends_on, vec![StageId::Analysis, StageId::Research]);
        assert_eq!(plan.stages[2].agent, "software_architect");

        let text = plan.render_text();
        assert!(text.contains("complexity simple"));
        assert!(text.contains("3. architecture (software_architect) after analysis, research"));
    }
}
