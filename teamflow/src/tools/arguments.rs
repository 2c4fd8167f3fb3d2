//! Typed tool arguments.

use crate::agents::StageInput;
use crate::errors::TeamflowError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Decodes `args` for `tool`, mapping decode failures to
/// [`TeamflowError::InvalidArguments`].
pub(crate) fn parse<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, TeamflowError> {
    let args = if args.is_null() { Value::Object(serde_json::Map::new()) } else { args };
    serde_json::from_value(args).map_err(|e| TeamflowError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Arguments of a single-stage tool.
pub(crate) trait StageArgs: DeserializeOwned {
    /// Converts into capability input.
    fn into_input(self) -> StageInput;
}

fn with_opt(input: StageInput, key: &str, value: Option<String>) -> StageInput {
    match value {
        Some(value) => input.with_param(key, value),
        None => input,
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrchestratorArgs {
    pub user_request: String,
    #[serde(default)]
    pub execution_mode: Option<String>,
    #[serde(default)]
    pub auto_execute: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportArgs {
    #[serde(default)]
    pub include_docs: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalystArgs {
    #[serde(default)]
    user_request: String,
    #[serde(default)]
    additional_context: Option<String>,
}

impl StageArgs for AnalystArgs {
    fn into_input(self) -> StageInput {
        with_opt(StageInput::new(self.user_request), "additional_context", self.additional_context)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResearchArgs {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    focus_areas: Vec<String>,
}

impl StageArgs for ResearchArgs {
    fn into_input(self) -> StageInput {
        let input = StageInput::new(self.topic.clone());
        let input = if self.topic.trim().is_empty() {
            input
        } else {
            input.with_param("topic", self.topic)
        };
        input.with_param("focus_areas", self.focus_areas)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NotesArgs {
    #[serde(default)]
    user_request: String,
    #[serde(default)]
    notes: Option<String>,
}

impl StageArgs for NotesArgs {
    fn into_input(self) -> StageInput {
        with_opt(StageInput::new(self.user_request), "notes", self.notes)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeveloperArgs {
    #[serde(default)]
    user_request: String,
    #[serde(default)]
    module_name: Option<String>,
    #[serde(default)]
    specifications: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

impl StageArgs for DeveloperArgs {
    fn into_input(self) -> StageInput {
        let input = StageInput::new(self.user_request);
        let input = with_opt(input, "module_name", self.module_name);
        let input = with_opt(input, "specifications", self.specifications);
        with_opt(input, "language", self.language)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QaArgs {
    #[serde(default)]
    user_request: String,
    #[serde(default)]
    module_name: Option<String>,
    #[serde(default)]
    test_type: Option<String>,
}

impl StageArgs for QaArgs {
    fn into_input(self) -> StageInput {
        let input = with_opt(StageInput::new(self.user_request), "module_name", self.module_name);
        with_opt(input, "test_type", self.test_type)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DevOpsArgs {
    #[serde(default)]
    user_request: String,
    #[serde(default)]
    environment: Option<String>,
    #[serde(default)]
    deployment_type: Option<String>,
}

impl StageArgs for DevOpsArgs {
    fn into_input(self) -> StageInput {
        let input = with_opt(StageInput::new(self.user_request), "environment", self.environment);
        with_opt(input, "deployment_type", self.deployment_type)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocsArgs {
    #[serde(default)]
    user_request: String,
    #[serde(default)]
    doc_type: Option<String>,
}

impl StageArgs for DocsArgs {
    fn into_input(self) -> StageInput {
        with_opt(StageInput::new(self.user_request), "doc_type", self.doc_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_null_as_empty_object() {
        let args: ExportArgs = parse("export_project_files", Value::Null).unwrap();
        assert_eq!(args.include_docs, None);
    }

    #[test]
    fn test_parse_reports_tool_name() {
        let err = parse::<OrchestratorArgs>("orchestrator", json!({})).unwrap_err();
        match err {
            TeamflowError::InvalidArguments { tool, message } => {
                assert_eq!(tool, "orchestrator");
                assert!(message.contains("user_request"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_research_args_into_input() {
        let args: ResearchArgs = parse(
            "research_engineer",
            json!({ "topic": "chat apps", "focus_areas": ["security"] }),
        )
        .unwrap();
        let input = args.into_input();
        assert_eq!(input.request_text, "chat apps");
        assert_eq!(input.param_str("topic"), Some("chat apps"));
        assert_eq!(input.param_list("focus_areas"), vec!["security"]);
    }

    #[test]
    fn test_developer_args_skip_missing_params() {
        let args: DeveloperArgs = parse("senior_developer", json!({ "language": "rust" })).unwrap();
        let input = args.into_input();
        assert_eq!(input.param_str("language"), Some("rust"));
        assert!(input.param_str("module_name").is_none());
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let err = parse::<ResearchArgs>("research_engineer", json!({ "focus_areas": "x" }));
        assert!(err.is_err());
    }
}
