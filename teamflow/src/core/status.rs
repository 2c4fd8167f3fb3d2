//! Stage identifiers, execution modes, and status enums.

use crate::errors::InvalidModeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the eight production stages of the team pipeline.
///
/// Variants are listed in declaration order. That order is the tie-break
/// used whenever two stages have no dependency relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Requirements analysis (product analyst).
    Analysis,
    /// Technology research (research engineer).
    Research,
    /// System architecture (software architect).
    Architecture,
    /// Implementation plan and task breakdown (technical lead).
    Planning,
    /// Code modules (senior developer).
    Implementation,
    /// Test suites (QA engineer).
    Qa,
    /// Deployment configuration (DevOps engineer).
    Deployment,
    /// Project documentation (documentation specialist).
    Documentation,
}

impl StageId {
    /// All stages in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Analysis,
        Self::Research,
        Self::Architecture,
        Self::Planning,
        Self::Implementation,
        Self::Qa,
        Self::Deployment,
        Self::Documentation,
    ];

    /// Stages whose succeeded results must exist before this stage runs.
    #[must_use]
    pub const fn dependencies(self) -> &'static [Self] {
        match self {
            Self::Analysis | Self::Research => &[],
            Self::Architecture => &[Self::Analysis, Self::Research],
            Self::Planning => &[Self::Architecture],
            Self::Implementation => &[Self::Architecture, Self::Planning],
            Self::Qa => &[Self::Implementation],
            Self::Deployment => &[Self::Architecture, Self::Implementation],
            Self::Documentation => &[Self::Analysis, Self::Architecture, Self::Implementation],
        }
    }

    /// Position of the stage in declaration order.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable identifier used in summaries and exports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Research => "research",
            Self::Architecture => "architecture",
            Self::Planning => "planning",
            Self::Implementation => "implementation",
            Self::Qa => "qa",
            Self::Deployment => "deployment",
            Self::Documentation => "documentation",
        }
    }

    /// Returns true if reruns of this stage add files to the earlier
    /// result instead of replacing them (one run per code module).
    #[must_use]
    pub const fn accumulates_files(self) -> bool {
        matches!(self, Self::Implementation)
    }

    /// Name of the team member tool that runs this stage.
    #[must_use]
    pub const fn agent_name(self) -> &'static str {
        match self {
            Self::Analysis => "product_analyst",
            Self::Research => "research_engineer",
            Self::Architecture => "software_architect",
            Self::Planning => "technical_lead",
            Self::Implementation => "senior_developer",
            Self::Qa => "qa_engineer",
            Self::Deployment => "devops_engineer",
            Self::Documentation => "documentation_specialist",
        }
    }

    /// Human-readable role title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Analysis => "Product Analyst",
            Self::Research => "Research Engineer",
            Self::Architecture => "Software Architect",
            Self::Planning => "Technical Lead",
            Self::Implementation => "Senior Developer",
            Self::Qa => "QA Engineer",
            Self::Deployment => "DevOps Engineer",
            Self::Documentation => "Documentation Specialist",
        }
    }

    /// Looks up a stage by identifier or agent name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == name || s.agent_name() == name)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named policy selecting which stages run for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// All eight stages.
    Full,
    /// Analysis, research, and architecture.
    Planning,
    /// Planning plus task breakdown and implementation.
    Implementation,
    /// Implementation plus QA and deployment.
    Deployment,
    /// Let the complexity estimator pick one of the other modes.
    Custom,
}

impl ExecutionMode {
    /// All recognized modes.
    pub const ALL: [Self; 5] = [
        Self::Full,
        Self::Planning,
        Self::Implementation,
        Self::Deployment,
        Self::Custom,
    ];

    /// The stage set selected by the mode, or `None` for `Custom`.
    #[must_use]
    pub const fn stage_set(self) -> Option<&'static [StageId]> {
        match self {
            Self::Full => Some(&StageId::ALL),
            Self::Planning => Some(&[StageId::Analysis, StageId::Research, StageId::Architecture]),
            Self::Implementation => Some(&[
                StageId::Analysis,
                StageId::Research,
                StageId::Architecture,
                StageId::Planning,
                StageId::Implementation,
            ]),
            Self::Deployment => Some(&[
                StageId::Analysis,
                StageId::Research,
                StageId::Architecture,
                StageId::Planning,
                StageId::Implementation,
                StageId::Qa,
                StageId::Deployment,
            ]),
            Self::Custom => None,
        }
    }

    /// Wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Planning => "planning",
            Self::Implementation => "implementation",
            Self::Deployment => "deployment",
            Self::Custom => "custom",
        }
    }
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Full
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = InvalidModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| InvalidModeError::new(s))
    }
}

/// Outcome of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The capability produced an artifact.
    Succeeded,
    /// The capability failed permanently or exhausted its retries.
    Failed,
    /// The stage never ran because an ancestor failed or the run was cancelled.
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl StageStatus {
    /// Returns true if the stage produced an artifact.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if the stage failed or was skipped.
    #[must_use]
    pub fn blocks_dependents(&self) -> bool {
        matches!(self, Self::Failed | Self::Skipped)
    }
}

/// Overall status of the project state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No project is active.
    #[default]
    Idle,
    /// A run is in progress.
    Running,
    /// Every resolved stage succeeded.
    Completed,
    /// No stage succeeded.
    Failed,
    /// Some stages succeeded, others failed or were skipped.
    Partial,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

impl RunStatus {
    /// Returns true for `Completed`, `Failed`, and `Partial`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Partial)
    }
}

/// Classification of a stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// External-call failure; eligible for retry.
    Transient,
    /// Malformed input or unrecoverable failure; never retried.
    Permanent,
    /// A declared dependency had no succeeded result.
    MissingDependency,
    /// The run was cancelled while the stage was in flight.
    Cancelled,
}

impl ErrorClass {
    /// Returns true if the retry policy applies.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
            Self::MissingDependency => write!(f, "missing_dependency"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
