//! Continue-on-failure bookkeeping for a run.
//!
//! A failed stage blocks only its transitive dependents; independent
//! branches keep running. The collector answers "can this stage run?" and
//! derives the overall run status once every stage has a result.

use crate::core::{RunStatus, StageId, StageResult, StageStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Why a stage cannot run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocked {
    /// The dependency that did not succeed.
    pub dependency: StageId,
    /// Whether that dependency failed or was itself skipped.
    pub status: StageStatus,
    /// The failed stage at the root of the chain.
    pub root: StageId,
}

impl Blocked {
    /// Human-readable skip reason.
    #[must_use]
    pub fn reason(&self) -> String {
        if self.dependency == self.root {
            format!("dependency '{}' failed", self.dependency)
        } else {
            format!(
                "dependency '{}' was skipped (upstream '{}' failed)",
                self.dependency, self.root
            )
        }
    }
}

/// Counts of stage outcomes within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSummary {
    /// Stages resolved for the run.
    pub total_stages: usize,
    /// Stages that succeeded.
    pub succeeded: usize,
    /// Stages that failed.
    pub failed: usize,
    /// Stages skipped by failure propagation or cancellation.
    pub skipped: usize,
}

impl FailureSummary {
    /// Counts `statuses` over `total_stages` resolved stages.
    #[must_use]
    pub fn tally(total_stages: usize, statuses: impl IntoIterator<Item = StageStatus>) -> Self {
        statuses.into_iter().fold(
            Self {
                total_stages,
                ..Self::default()
            },
            |mut summary, status| {
                match status {
                    StageStatus::Succeeded => summary.succeeded += 1,
                    StageStatus::Failed => summary.failed += 1,
                    StageStatus::Skipped => summary.skipped += 1,
                }
                summary
            },
        )
    }

    /// Fraction of resolved stages that succeeded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_stages == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total_stages as f64
    }
}

/// Tracks stage outcomes for one run.
#[derive(Debug, Default)]
pub struct FailureCollector {
    outcomes: HashMap<StageId, StageStatus>,
    /// Failed stage that caused each non-success.
    roots: HashMap<StageId, StageId>,
}

impl FailureCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a stage result.
    pub fn record(&mut self, result: &StageResult) {
        self.outcomes.insert(result.stage, result.status);
        if result.status == StageStatus::Failed {
            self.roots.insert(result.stage, result.stage);
        }
    }

    /// Records a skip caused by `blocked`.
    pub fn record_skip(&mut self, stage: StageId, blocked: &Blocked) {
        self.outcomes.insert(stage, StageStatus::Skipped);
        self.roots.insert(stage, blocked.root);
    }

    /// Returns the recorded status of a stage.
    #[must_use]
    pub fn status(&self, stage: StageId) -> Option<StageStatus> {
        self.outcomes.get(&stage).copied()
    }

    /// Returns the first dependency that failed or was skipped, if any.
    ///
    /// Dependencies not yet recorded do not block.
    #[must_use]
    pub fn blocking_dependency(&self, dependencies: &[StageId]) -> Option<Blocked> {
        dependencies.iter().find_map(|dep| {
            let status = self.status(*dep)?;
            status.blocks_dependents().then(|| Blocked {
                dependency: *dep,
                status,
                root: self.roots.get(dep).copied().unwrap_or(*dep),
            })
        })
    }

    /// Returns true if every dependency has succeeded.
    #[must_use]
    pub fn dependencies_met(&self, dependencies: &[StageId]) -> bool {
        dependencies
            .iter()
            .all(|dep| self.status(*dep) == Some(StageStatus::Succeeded))
    }
}

/// Derives the overall run status from the resolved stages' results.
///
/// `Completed` iff every result succeeded; `Failed` iff none did;
/// `Partial` otherwise. An empty run is `Completed`.
#[must_use]
pub fn overall_status(results: &[StageResult]) -> RunStatus {
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    if succeeded == results.len() {
        RunStatus::Completed
    } else if succeeded == 0 {
        RunStatus::Failed
    } else {
        RunStatus::Partial
    }
}
