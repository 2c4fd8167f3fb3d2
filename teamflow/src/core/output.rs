//! Stage result type with factory methods.

use super::{Artifact, ErrorClass, StageId, StageStatus};
use crate::errors::CapabilityError;
use serde::{Deserialize, Serialize};

/// Why a stage failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    /// Failure classification.
    pub class: ErrorClass,
    /// Human-readable message.
    pub message: String,
}

impl From<&CapabilityError> for StageFailure {
    fn from(err: &CapabilityError) -> Self {
        Self {
            class: err.class,
            message: err.message.clone(),
        }
    }
}

/// The outcome of one stage.
///
/// `StageResult` is immutable once created. Exactly one of `artifact`,
/// `error`, or `skip_reason` is set, matching `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// The stage this result belongs to.
    pub stage: StageId,

    /// Outcome of the stage.
    pub status: StageStatus,

    /// Artifact (for succeeded stages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,

    /// Failure detail (for failed stages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StageFailure>,

    /// Skip reason (for skipped stages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    /// Number of invocation attempts.
    #[serde(default)]
    pub attempts: u32,

    /// Wall-clock duration across all attempts.
    #[serde(default)]
    pub duration_ms: f64,
}

impl StageResult {
    /// Creates a succeeded result.
    #[must_use]
    pub fn succeeded(stage: StageId, artifact: Artifact) -> Self {
        Self {
            stage,
            status: StageStatus::Succeeded,
            artifact: Some(artifact),
            error: None,
            skip_reason: None,
            attempts: 1,
            duration_ms: 0.0,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(stage: StageId, class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            artifact: None,
            error: Some(StageFailure {
                class,
                message: message.into(),
            }),
            skip_reason: None,
            attempts: 1,
            duration_ms: 0.0,
        }
    }

    /// Creates a failed result from a capability error.
    #[must_use]
    pub fn from_error(stage: StageId, err: &CapabilityError) -> Self {
        Self::failed(stage, err.class, err.message.clone())
    }

    /// Creates a skipped result.
    #[must_use]
    pub fn skipped(stage: StageId, reason: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            artifact: None,
            error: None,
            skip_reason: Some(reason.into()),
            attempts: 0,
            duration_ms: 0.0,
        }
    }

    /// Sets the attempt count.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Human-readable reason for failed or skipped stages.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self.status {
            StageStatus::Succeeded => None,
            StageStatus::Failed => self
                .error
                .as_ref()
                .map(|e| format!("{} failure: {}", e.class, e.message)),
            StageStatus::Skipped => self.skip_reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeded_result() {
        let result = StageResult::succeeded(StageId::Analysis, Artifact::new("Report", "ok"));
        assert!(result.is_success());
        assert!(result.artifact.is_some());
        assert!(result.error.is_none());
        assert!(result.reason().is_none());
    }

    #[test]
    fn test_failed_result_reason() {
        let result = StageResult::failed(StageId::Qa, ErrorClass::Permanent, "bad input")
            .with_attempts(1);
        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(result.reason().unwrap(), "permanent failure: bad input");
    }

    #[test]
    fn test_skipped_result() {
        let result = StageResult::skipped(StageId::Qa, "dependency 'implementation' failed");
        assert_eq!(result.status, StageStatus::Skipped);
        assert_eq!(result.attempts, 0);
        assert_eq!(result.reason().unwrap(), "dependency 'implementation' failed");
    }

    #[test]
    fn test_from_capability_error() {
        let err = CapabilityError::transient("timeout");
        let result = StageResult::from_error(StageId::Research, &err).with_attempts(3);
        let failure = result.error.unwrap();
        assert_eq!(failure.class, ErrorClass::Transient);
        assert_eq!(result.attempts, 3);
    }

    #[test]
    fn test_result_serialize() {
        let result = StageResult::skipped(StageId::Deployment, "cancelled");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["stage"], "deployment");
        assert_eq!(json["status"], "skipped");
        assert!(json.get("artifact").is_none());
    }
}
