//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document (or `{}`) is a
//! valid configuration.

use crate::errors::TeamflowError;
use crate::pipeline::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How the orchestrator schedules stages whose dependencies are met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// One stage at a time in resolved order.
    #[default]
    Sequential,
    /// Independent ready stages run concurrently; results are still
    /// written one at a time by the orchestrator.
    Parallel,
}

impl ExecutionStrategy {
    /// Maximum stages in flight at once.
    #[must_use]
    pub const fn max_in_flight(self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Parallel => usize::MAX,
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory `write_to_directory` targets by default.
    pub output_directory: PathBuf,
    /// Whether `docs/` entries are exported by default.
    pub include_docs: bool,
    /// Characters of artifact content shown in run summaries.
    pub preview_chars: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("generated_project"),
            include_docs: true,
            preview_chars: 200,
        }
    }
}

/// Top-level configuration for an [`Orchestrator`](crate::orchestrator::Orchestrator).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    /// Retry policy applied to every stage.
    pub retry: RetryConfig,
    /// Scheduling strategy.
    pub strategy: ExecutionStrategy,
    /// Per-attempt timeout; a timed-out attempt is a transient failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_timeout_ms: Option<u64>,
    /// Export settings.
    pub export: ExportConfig,
}

impl TeamConfig {
    /// Creates a default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`TeamflowError::Serialization`] if the document is malformed.
    pub fn from_json_str(json: &str) -> Result<Self, TeamflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the scheduling strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_stage_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.stage_timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets the export settings.
    #[must_use]
    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }

    /// The per-attempt timeout as a `Duration`.
    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::BackoffStrategy;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_is_default() {
        let config = TeamConfig::from_json_str("{}").unwrap();
        assert_eq!(config, TeamConfig::default());
        assert_eq!(config.strategy, ExecutionStrategy::Sequential);
        assert!(config.stage_timeout().is_none());
    }

    #[test]
    fn test_partial_document() {
        let config = TeamConfig::from_json_str(
            r#"{
                "strategy": "parallel",
                "stage_timeout_ms": 1500,
                "retry": {"max_attempts": 4, "backoff_strategy": "linear"},
                "export": {"include_docs": false}
            }"#,
        )
        .unwrap();

        assert_eq!(config.strategy, ExecutionStrategy::Parallel);
        assert_eq!(config.stage_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.backoff_strategy, BackoffStrategy::Linear);
        assert!(!config.export.include_docs);
        assert_eq!(config.export.preview_chars, 200);
    }

    #[test]
    fn test_malformed_document() {
        let err = TeamConfig::from_json_str("{\"strategy\": \"sideways\"}").unwrap_err();
        assert!(matches!(err, TeamflowError::Serialization(_)));
    }

    #[test]
    fn test_builder() {
        let config = TeamConfig::new()
            .with_strategy(ExecutionStrategy::Parallel)
            .with_retry(RetryConfig::no_retry())
            .with_stage_timeout_ms(50);
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.strategy.max_in_flight(), usize::MAX);
        assert_eq!(ExecutionStrategy::Sequential.max_in_flight(), 1);
    }
}
