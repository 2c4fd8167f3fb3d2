//! The immutable project request.

use super::ExecutionMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A natural-language project request.
///
/// Created once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRequest {
    /// Identifier of the run that created the request.
    pub run_id: Uuid,
    /// Free-text description of the project.
    pub description: String,
    /// Requested mode, or `None` for ad-hoc single-stage work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
}

impl ProjectRequest {
    /// Creates a request for an orchestrated run.
    #[must_use]
    pub fn new(description: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            description: description.into(),
            mode: Some(mode),
            created_at: Utc::now(),
        }
    }

    /// Creates a request for a single-stage call outside a run.
    #[must_use]
    pub fn ad_hoc(description: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            description: description.into(),
            mode: None,
            created_at: Utc::now(),
        }
    }
}
