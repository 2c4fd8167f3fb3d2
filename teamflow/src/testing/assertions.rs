//! Assertions for run summaries and stage orders.

use crate::core::{RunStatus, StageId, StageStatus};
use crate::orchestrator::RunSummary;
use crate::pipeline::StageGraph;

/// Asserts that `stage` is in the summary with `expected` status.
pub fn assert_stage_status(summary: &RunSummary, stage: StageId, expected: StageStatus) {
    let report = summary
        .stage(stage)
        .unwrap_or_else(|| panic!("stage '{stage}' not in run summary: {:?}", summary.stage_ids()));
    assert_eq!(
        report.status, expected,
        "Expected {stage} to be {expected:?}, got {:?} ({:?})",
        report.status, report.reason
    );
}

/// Asserts the overall run status.
pub fn assert_run_status(summary: &RunSummary, expected: RunStatus) {
    assert_eq!(
        summary.status,
        expected,
        "Expected run status {expected}, got {}:\n{}",
        summary.status,
        summary.render_text()
    );
}

/// Asserts that every failed or skipped stage carries a reason.
pub fn assert_reasons_present(summary: &RunSummary) {
    for report in &summary.stages {
        if report.status != StageStatus::Succeeded {
            assert!(
                report.reason.as_deref().is_some_and(|r| !r.is_empty()),
                "stage '{}' is {:?} without a reason",
                report.stage,
                report.status
            );
        }
    }
}

/// Asserts that each stage in `order` comes after all of its dependencies.
pub fn assert_dependency_order(graph: &StageGraph, order: &[StageId]) {
    for (position, stage) in order.iter().enumerate() {
        for dependency in graph.dependencies(*stage) {
            let dep_position = order.iter().position(|s| s == dependency);
            assert!(
                dep_position.is_some_and(|p| p < position),
                "{stage} at {position} runs before its dependency {dependency} ({dep_position:?})"
            );
        }
    }
}
