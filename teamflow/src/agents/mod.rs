//! Team capabilities: one per production stage.
//!
//! A [`Capability`] reads the accumulated [`ProjectState`] and stage-specific
//! [`StageInput`], and returns an [`Artifact`]. Capabilities never write
//! state; the orchestrator records what they return.

mod delivery;
mod planning;
mod providers;
mod registry;

pub use delivery::{DevOpsEngineer, DocumentationSpecialist, QaEngineer, SeniorDeveloper};
pub use planning::{ProductAnalyst, ResearchEngineer, SoftwareArchitect, TechnicalLead};
pub use providers::{
    GenerationRequest, GenerationResponse, Generator, NoSearch, SearchHit, SearchProvider,
};
pub use registry::CapabilityRegistry;

#[cfg(test)]
pub use providers::MockGenerator;

use crate::core::{Artifact, StageId};
use crate::errors::{CapabilityError, MissingDependencyError};
use crate::state::ProjectState;
use crate::utils::truncate_chars;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A unit of work that produces one stage's artifact.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The stage this capability runs.
    fn stage(&self) -> StageId;

    /// Produces the stage artifact.
    ///
    /// Must not mutate shared state and should be idempotent for identical
    /// inputs.
    async fn invoke(&self, state: &ProjectState, input: &StageInput) -> Result<Artifact, CapabilityError>;
}

/// Stage-specific input: the request text plus free-form parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageInput {
    /// The project request text.
    pub request_text: String,
    /// Tool parameters (e.g. `module_name`, `focus_areas`).
    pub parameters: Map<String, Value>,
}

impl StageInput {
    /// Creates an input with no parameters.
    #[must_use]
    pub fn new(request_text: impl Into<String>) -> Self {
        Self {
            request_text: request_text.into(),
            parameters: Map::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// A non-empty string parameter.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// A string parameter with a fallback.
    #[must_use]
    pub fn param_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.param_str(key).unwrap_or(default)
    }

    /// A list-of-strings parameter. A single string counts as a list of one.
    #[must_use]
    pub fn param_list(&self, key: &str) -> Vec<String> {
        match self.parameters.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => Vec::new(),
        }
    }
}

/// Fails unless every dependency of `stage` has a succeeded result.
///
/// # Errors
///
/// Returns [`MissingDependencyError`] listing the unmet dependencies.
pub fn require_dependencies(stage: StageId, state: &ProjectState) -> Result<(), MissingDependencyError> {
    let missing: Vec<StageId> = stage
        .dependencies()
        .iter()
        .copied()
        .filter(|dep| !state.has_succeeded(*dep))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingDependencyError::new(stage, missing))
    }
}

/// Upstream artifact content for prompts, truncated to `max_chars`.
pub(crate) fn upstream(state: &ProjectState, stage: StageId, max_chars: usize) -> String {
    state.artifact(stage).map_or_else(
        || format!("No {} output available", stage.as_str()),
        |a| truncate_chars(&a.content, max_chars),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorClass, ExecutionMode, ProjectRequest, StageResult};

    #[test]
    fn test_stage_input_params() {
        let input = StageInput::new("Build a chat app")
            .with_param("module_name", "server")
            .with_param("blank", "   ")
            .with_param("focus_areas", serde_json::json!(["security", "", "scalability"]));

        assert_eq!(input.param_str("module_name"), Some("server"));
        assert_eq!(input.param_str("blank"), None);
        assert_eq!(input.param_or("language", "python"), "python");
        assert_eq!(input.param_list("focus_areas"), vec!["security", "scalability"]);
        assert_eq!(input.param_list("module_name"), vec!["server"]);
        assert!(input.param_list("missing").is_empty());
    }

    #[test]
    fn test_require_dependencies() {
        let mut state = ProjectState::running(
            ProjectRequest::new("x", ExecutionMode::Full),
            StageId::ALL.to_vec(),
        );
        let err = require_dependencies(StageId::Architecture, &state).unwrap_err();
        assert_eq!(err.missing, vec![StageId::Analysis, StageId::Research]);

        state.upsert(StageResult::succeeded(StageId::Analysis, Artifact::new("a", "b")));
        state.upsert(StageResult::failed(StageId::Research, ErrorClass::Permanent, "x"));
        let err = require_dependencies(StageId::Architecture, &state).unwrap_err();
        assert_eq!(err.missing, vec![StageId::Research]);

        assert!(require_dependencies(StageId::Analysis, &state).is_ok());
    }

    #[test]
    fn test_upstream_excerpt() {
        let mut state = ProjectState::idle();
        assert_eq!(upstream(&state, StageId::Architecture, 10), "No architecture output available");

        state.upsert(StageResult::succeeded(
            StageId::Architecture,
            Artifact::new("Architecture", "0123456789abcdef"),
        ));
        assert_eq!(upstream(&state, StageId::Architecture, 10), "0123456789...");
    }
}
