//! Error types for the teamflow engine.
//!
//! Caller errors (`InvalidModeError`, `ConcurrentRunError`,
//! `NothingToExportError`) are surfaced immediately and never touch the
//! project state. Stage-level errors (`CapabilityError`,
//! `MissingDependencyError`) are recorded per stage and never abort a run.

use crate::core::{ErrorClass, StageId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The main error type for teamflow operations.
#[derive(Debug, Error)]
pub enum TeamflowError {
    /// An unrecognized execution mode was requested.
    #[error("{0}")]
    InvalidMode(#[from] InvalidModeError),

    /// A run was requested while another is in progress.
    #[error("{0}")]
    ConcurrentRun(#[from] ConcurrentRunError),

    /// A capability ran without its dependencies.
    #[error("{0}")]
    MissingDependency(#[from] MissingDependencyError),

    /// A capability failed.
    #[error("{0}")]
    Capability(#[from] CapabilityError),

    /// Export was requested with no active project.
    #[error("{0}")]
    NothingToExport(#[from] NothingToExportError),

    /// The stage graph is invalid.
    #[error("{0}")]
    GraphValidation(#[from] GraphValidationError),

    /// A tool name was not recognized.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments could not be decoded.
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments {
        /// The tool name.
        tool: String,
        /// What was wrong.
        message: String,
    },

    /// An export path would escape the export directory.
    #[error("Refusing to write outside the export directory: {0}")]
    UnsafePath(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for TeamflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl TeamflowError {
    /// Returns diagnostic info for the error.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        match self {
            Self::InvalidMode(e) => ErrorInfo::new("INVALID_MODE", e.to_string())
                .with_fix_hint("Use one of: full, planning, implementation, deployment, custom."),
            Self::ConcurrentRun(e) => ErrorInfo::new("CONCURRENT_RUN", e.to_string())
                .with_fix_hint("Wait for the active run to finish or call reset_project."),
            Self::MissingDependency(e) => ErrorInfo::new("MISSING_DEPENDENCY", e.to_string())
                .with_fix_hint("Run the dependency stages first, or use the orchestrator."),
            Self::Capability(e) => ErrorInfo::new("CAPABILITY_FAILED", e.to_string()),
            Self::NothingToExport(e) => ErrorInfo::new("NOTHING_TO_EXPORT", e.to_string())
                .with_fix_hint("Run the orchestrator first to generate a project."),
            Self::GraphValidation(e) => ErrorInfo::new("INVALID_GRAPH", e.to_string()),
            Self::UnknownTool(_) => ErrorInfo::new("UNKNOWN_TOOL", self.to_string()),
            Self::InvalidArguments { .. } => ErrorInfo::new("INVALID_ARGUMENTS", self.to_string()),
            Self::UnsafePath(_) => ErrorInfo::new("UNSAFE_PATH", self.to_string()),
            Self::Serialization(_) => ErrorInfo::new("SERIALIZATION", self.to_string()),
            Self::Io(_) => ErrorInfo::new("IO", self.to_string()),
        }
    }

    /// Returns true for errors caused by the caller rather than the engine.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMode(_)
                | Self::ConcurrentRun(_)
                | Self::NothingToExport(_)
                | Self::UnknownTool(_)
                | Self::InvalidArguments { .. }
        )
    }
}

/// Diagnostic metadata attached to errors in tool payloads.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "INVALID_MODE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }
}

/// Error raised for an unrecognized execution mode.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid execution mode '{mode}': expected one of full, planning, implementation, deployment, custom")]
pub struct InvalidModeError {
    /// The rejected mode string.
    pub mode: String,
}

impl InvalidModeError {
    /// Creates a new invalid mode error.
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        Self { mode: mode.into() }
    }
}

/// Error raised when a run is requested while another is running.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("A project run is already in progress{}", .active_run_id.map(|id| format!(" (run {id})")).unwrap_or_default())]
pub struct ConcurrentRunError {
    /// The run holding the lock, when known.
    pub active_run_id: Option<Uuid>,
}

impl ConcurrentRunError {
    /// Creates a new concurrent run error.
    #[must_use]
    pub fn new(active_run_id: Option<Uuid>) -> Self {
        Self { active_run_id }
    }
}

/// Error raised when a capability runs before its dependencies succeeded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Stage '{stage}' is missing succeeded dependencies: {}", .missing.iter().copied().map(StageId::as_str).collect::<Vec<_>>().join(", "))]
pub struct MissingDependencyError {
    /// The stage that could not run.
    pub stage: StageId,
    /// Dependencies without a succeeded result.
    pub missing: Vec<StageId>,
}

impl MissingDependencyError {
    /// Creates a new missing dependency error.
    #[must_use]
    pub fn new(stage: StageId, missing: Vec<StageId>) -> Self {
        Self { stage, missing }
    }
}

/// Error returned by a capability invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{class} capability error: {message}")]
pub struct CapabilityError {
    /// Failure classification (drives retry).
    pub class: ErrorClass,
    /// Human-readable message.
    pub message: String,
}

impl CapabilityError {
    /// Creates a transient (retryable) error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Transient,
            message: message.into(),
        }
    }

    /// Creates a permanent error.
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Permanent,
            message: message.into(),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Cancelled,
            message: reason.into(),
        }
    }

    /// Returns true if the retry policy applies.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.class.is_retryable()
    }
}

impl From<MissingDependencyError> for CapabilityError {
    fn from(err: MissingDependencyError) -> Self {
        Self {
            class: ErrorClass::MissingDependency,
            message: err.to_string(),
        }
    }
}

/// Error raised when exporting with no active project.
#[derive(Debug, Clone, Error, PartialEq, Eq, Default)]
#[error("No active project to export; run the orchestrator first")]
pub struct NothingToExportError;

/// Error raised when a cycle is detected in the stage graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Cycle detected in stage graph: {}", .cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of stages forming the cycle.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

/// Error raised when a stage graph fails validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct GraphValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl GraphValidationError {
    /// Creates a new graph validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

impl From<CycleDetectedError> for GraphValidationError {
    fn from(err: CycleDetectedError) -> Self {
        Self {
            message: err.to_string(),
            stages: err.cycle_path,
        }
    }
}
