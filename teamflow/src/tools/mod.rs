//! Transport-agnostic tool surface.
//!
//! Each tool takes a JSON argument object and returns JSON. Binding the
//! tools to a wire protocol is left to the embedding server.

mod arguments;
mod definitions;

pub use definitions::{ToolDefinition, ToolOutput};

use arguments::{
    parse, AnalystArgs, DeveloperArgs, DevOpsArgs, DocsArgs, ExportArgs, NotesArgs,
    OrchestratorArgs, QaArgs, ResearchArgs, StageArgs,
};
use crate::core::StageId;
use crate::errors::TeamflowError;
use crate::orchestrator::Orchestrator;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Tool names that are not single-stage calls.
pub const ORCHESTRATOR_TOOL: &str = "orchestrator";
/// Export tool name.
pub const EXPORT_TOOL: &str = "export_project_files";
/// Status tool name.
pub const STATUS_TOOL: &str = "team_status";
/// Reset tool name.
pub const RESET_TOOL: &str = "reset_project";
/// Summary tool name.
pub const SUMMARY_TOOL: &str = "get_project_summary";

/// Dispatches tool calls to an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct TeamTools {
    team: Arc<Orchestrator>,
}

impl TeamTools {
    /// Creates the tool surface over `team`.
    #[must_use]
    pub fn new(team: Arc<Orchestrator>) -> Self {
        Self { team }
    }

    /// The orchestrator behind the tools.
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.team
    }

    /// Definitions of all thirteen tools.
    #[must_use]
    pub fn definitions() -> Vec<ToolDefinition> {
        let request = "Project request text (used when no project is active)";
        let mut defs = vec![ToolDefinition::new(ORCHESTRATOR_TOOL)
            .with_description("Run the team on a project request")
            .with_string("user_request", "Project description", true)
            .with_property(
                "execution_mode",
                json!({
                    "type": "string",
                    "enum": ["full", "planning", "implementation", "deployment", "custom"],
                    "default": "full",
                }),
                false,
            )
            .with_property(
                "auto_execute",
                json!({ "type": "boolean", "default": true }),
                false,
            )];

        defs.push(
            ToolDefinition::new(StageId::Analysis.agent_name())
                .with_description("Analyze requirements and produce user stories")
                .with_string("user_request", "Project description", false)
                .with_string("additional_context", "Extra constraints or context", false),
        );
        defs.push(
            ToolDefinition::new(StageId::Research.agent_name())
                .with_description("Research best practices and technology options")
                .with_string("topic", "Research topic", false)
                .with_property(
                    "focus_areas",
                    json!({ "type": "array", "items": { "type": "string" } }),
                    false,
                ),
        );
        defs.push(
            ToolDefinition::new(StageId::Architecture.agent_name())
                .with_description("Design the system architecture from analysis and research")
                .with_string("user_request", request, false)
                .with_string("notes", "Architecture guidance", false),
        );
        defs.push(
            ToolDefinition::new(StageId::Planning.agent_name())
                .with_description("Turn the architecture into an implementation plan")
                .with_string("user_request", request, false)
                .with_string("notes", "Planning guidance", false),
        );
        defs.push(
            ToolDefinition::new(StageId::Implementation.agent_name())
                .with_description("Implement a code module")
                .with_string("user_request", request, false)
                .with_string("module_name", "Module to implement", false)
                .with_string("specifications", "What the module must do", false)
                .with_string("language", "Programming language", false),
        );
        defs.push(
            ToolDefinition::new(StageId::Qa.agent_name())
                .with_description("Write a test suite for the implemented module")
                .with_string("user_request", request, false)
                .with_string("module_name", "Module to test", false)
                .with_string("test_type", "unit, integration, or comprehensive", false),
        );
        defs.push(
            ToolDefinition::new(StageId::Deployment.agent_name())
                .with_description("Produce deployment and CI/CD configuration")
                .with_string("user_request", request, false)
                .with_string("environment", "Target environment", false)
                .with_string("deployment_type", "cloud, on-premise, or hybrid", false),
        );
        defs.push(
            ToolDefinition::new(StageId::Documentation.agent_name())
                .with_description("Write project documentation")
                .with_string("user_request", request, false)
                .with_string("doc_type", "Documentation scope", false),
        );

        defs.push(
            ToolDefinition::new(EXPORT_TOOL)
                .with_description("List the project files an export would write")
                .with_property("include_docs", json!({ "type": "boolean", "default": true }), false),
        );
        defs.push(ToolDefinition::new(STATUS_TOOL).with_description("Per-stage status of the current project"));
        defs.push(ToolDefinition::new(RESET_TOOL).with_description("Cancel any active run and clear the project"));
        defs.push(ToolDefinition::new(SUMMARY_TOOL).with_description("Human-readable summary of the current project"));
        defs
    }

    /// Calls a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`TeamflowError::UnknownTool`] or
    /// [`TeamflowError::InvalidArguments`] for bad calls, and passes through
    /// orchestrator caller errors.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, TeamflowError> {
        debug!(tool = name, "Tool call");
        match name {
            ORCHESTRATOR_TOOL => {
                let args: OrchestratorArgs = parse(name, args)?;
                if args.user_request.trim().is_empty() {
                    return Err(TeamflowError::InvalidArguments {
                        tool: name.to_string(),
                        message: "user_request must not be empty".to_string(),
                    });
                }
                let mode = args.execution_mode.as_deref();
                if !args.auto_execute.unwrap_or(true) {
                    let plan = self.team.plan(&args.user_request, mode)?;
                    return Ok(serde_json::to_value(plan)?);
                }
                let summary = self.team.orchestrate(&args.user_request, mode).await?;
                Ok(serde_json::to_value(summary)?)
            }
            EXPORT_TOOL => {
                let args: ExportArgs = parse(name, args)?;
                let files = self.team.export(args.include_docs)?;
                let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
                Ok(json!({ "paths": paths, "files": files }))
            }
            STATUS_TOOL => Ok(serde_json::to_value(self.team.status())?),
            RESET_TOOL => {
                self.team.reset().await;
                Ok(json!({ "reset": true, "message": "Project state cleared" }))
            }
            SUMMARY_TOOL => Ok(json!({ "summary": self.team.project_summary() })),
            other => {
                let stage = StageId::ALL
                    .into_iter()
                    .find(|s| s.agent_name() == other)
                    .ok_or_else(|| TeamflowError::UnknownTool(other.to_string()))?;
                self.call_stage(stage, args).await
            }
        }
    }

    /// Calls a tool, folding errors into a [`ToolOutput`].
    pub async fn call_output(&self, name: &str, args: Value) -> ToolOutput {
        match self.call(name, args).await {
            Ok(data) => ToolOutput::ok(data),
            Err(err) => ToolOutput::fail(err.info()),
        }
    }

    async fn call_stage(&self, stage: StageId, args: Value) -> Result<Value, TeamflowError> {
        let tool = stage.agent_name();
        let input = match stage {
            StageId::Analysis => parse::<AnalystArgs>(tool, args)?.into_input(),
            StageId::Research => parse::<ResearchArgs>(tool, args)?.into_input(),
            StageId::Architecture | StageId::Planning => parse::<NotesArgs>(tool, args)?.into_input(),
            StageId::Implementation => parse::<DeveloperArgs>(tool, args)?.into_input(),
            StageId::Qa => parse::<QaArgs>(tool, args)?.into_input(),
            StageId::Deployment => parse::<DevOpsArgs>(tool, args)?.into_input(),
            StageId::Documentation => parse::<DocsArgs>(tool, args)?.into_input(),
        };
        let result = self.team.run_stage(stage, input).await?;
        Ok(serde_json::to_value(result)?)
    }
}
