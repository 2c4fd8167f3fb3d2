//! Delivery capabilities: code, tests, deployment, documentation.

use super::providers::{GenerationRequest, Generator};
use super::{require_dependencies, upstream, Capability, StageInput};
use crate::core::{Artifact, ArtifactFile, StageId};
use crate::errors::CapabilityError;
use crate::state::ProjectState;
use async_trait::async_trait;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

/// Module name used when the caller gives none.
pub const DEFAULT_MODULE: &str = "main_module";
/// Language used when the caller gives none.
pub const DEFAULT_LANGUAGE: &str = "python";

/// File extension for a language name.
fn extension_for(language: &str) -> &'static str {
    match language.to_ascii_lowercase().as_str() {
        "python" | "py" => "py",
        "javascript" | "js" | "node" => "js",
        "typescript" | "ts" => "ts",
        "rust" | "rs" => "rs",
        "go" | "golang" => "go",
        "java" => "java",
        "ruby" | "rb" => "rb",
        "c#" | "csharp" => "cs",
        _ => "txt",
    }
}

/// Module name recorded by the implementation stage, if any.
fn implemented_module(state: &ProjectState) -> Option<&str> {
    state
        .artifact(StageId::Implementation)
        .and_then(|a| a.metadata_str("module_name"))
}

macro_rules! generator_capability {
    ($name:ident) => {
        impl $name {
            /// Creates the capability.
            #[must_use]
            pub fn new(generator: Arc<dyn Generator>) -> Self {
                Self { generator }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }
    };
}

/// Implements a code module from the architecture and plan.
#[derive(Clone)]
pub struct SeniorDeveloper {
    generator: Arc<dyn Generator>,
}

generator_capability!(SeniorDeveloper);

#[async_trait]
impl Capability for SeniorDeveloper {
    fn stage(&self) -> StageId {
        StageId::Implementation
    }

    async fn invoke(&self, state: &ProjectState, input: &StageInput) -> Result<Artifact, CapabilityError> {
        require_dependencies(self.stage(), state)?;

        let module_name = input.param_or("module_name", DEFAULT_MODULE);
        let language = input.param_or("language", DEFAULT_LANGUAGE);
        let specifications = input.param_or("specifications", "Implement according to the architecture");

        let prompt = format!(
            "MODULE: {module_name}\nLANGUAGE: {language}\nSPECIFICATIONS:\n{specifications}\n\n\
             ARCHITECTURE:\n{}\n\nPLAN:\n{}\n\n\
             Write production-ready code with error handling, logging, and docs.",
            upstream(state, StageId::Architecture, 2000),
            upstream(state, StageId::Planning, 2000),
        );

        let response = self
            .generator
            .generate(GenerationRequest::new(self.stage(), prompt).with_temperature(0.2))
            .await?;

        let files = if response.files.is_empty() {
            vec![ArtifactFile::new(
                format!("{module_name}.{}", extension_for(language)),
                response.content.clone(),
            )]
        } else {
            response.files
        };

        Ok(Artifact::new(format!("Module: {module_name}"), response.content)
            .with_files(files)
            .with_metadata("module_name", json!(module_name))
            .with_metadata("language", json!(language)))
    }
}

/// Writes a test suite for the implemented module.
#[derive(Clone)]
pub struct QaEngineer {
    generator: Arc<dyn Generator>,
}

generator_capability!(QaEngineer);

#[async_trait]
impl Capability for QaEngineer {
    fn stage(&self) -> StageId {
        StageId::Qa
    }

    async fn invoke(&self, state: &ProjectState, input: &StageInput) -> Result<Artifact, CapabilityError> {
        require_dependencies(self.stage(), state)?;

        let module_name = input
            .param_str("module_name")
            .or_else(|| implemented_module(state))
            .unwrap_or(DEFAULT_MODULE);
        let test_type = input.param_or("test_type", "comprehensive");
        let language = state
            .artifact(StageId::Implementation)
            .and_then(|a| a.metadata_str("language"))
            .unwrap_or(DEFAULT_LANGUAGE);

        let prompt = format!(
            "MODULE: {module_name}\nTEST TYPE: {test_type}\n\nCODE:\n{}\n\nARCHITECTURE:\n{}\n\n\
             Write a test suite: unit, integration, and edge cases with fixtures.",
            upstream(state, StageId::Implementation, 6000),
            upstream(state, StageId::Architecture, 1000),
        );

        let response = self
            .generator
            .generate(GenerationRequest::new(self.stage(), prompt).with_temperature(0.2))
            .await?;

        let files = if response.files.is_empty() {
            vec![ArtifactFile::new(
                format!("test_{module_name}.{}", extension_for(language)),
                response.content.clone(),
            )]
        } else {
            response.files
        };

        Ok(Artifact::new(format!("Test Suite: {module_name}"), response.content)
            .with_files(files)
            .with_metadata("module_name", json!(module_name))
            .with_metadata("test_type", json!(test_type)))
    }
}

/// Produces deployment configuration.
#[derive(Clone)]
pub struct DevOpsEngineer {
    generator: Arc<dyn Generator>,
}

generator_capability!(DevOpsEngineer);

#[async_trait]
impl Capability for DevOpsEngineer {
    fn stage(&self) -> StageId {
        StageId::Deployment
    }

    async fn invoke(&self, state: &ProjectState, input: &StageInput) -> Result<Artifact, CapabilityError> {
        require_dependencies(self.stage(), state)?;

        let environment = input.param_or("environment", "production");
        let deployment_type = input.param_or("deployment_type", "cloud");

        let prompt = format!(
            "ENVIRONMENT: {environment}\nDEPLOYMENT TYPE: {deployment_type}\n\n\
             ARCHITECTURE:\n{}\n\nIMPLEMENTATION:\n{}\n\n\
             Produce containerization, CI/CD pipeline, infrastructure, monitoring, \
             and rollback configuration.",
            upstream(state, StageId::Architecture, 2000),
            upstream(state, StageId::Implementation, 1000),
        );

        let response = self
            .generator
            .generate(GenerationRequest::new(self.stage(), prompt).with_temperature(0.2))
            .await?;

        Ok(Artifact::new("Deployment Guide", response.content)
            .with_files(response.files)
            .with_metadata("environment", json!(environment))
            .with_metadata("deployment_type", json!(deployment_type)))
    }
}

/// Writes project documentation.
#[derive(Clone)]
pub struct DocumentationSpecialist {
    generator: Arc<dyn Generator>,
}

generator_capability!(DocumentationSpecialist);

#[async_trait]
impl Capability for DocumentationSpecialist {
    fn stage(&self) -> StageId {
        StageId::Documentation
    }

    async fn invoke(&self, state: &ProjectState, input: &StageInput) -> Result<Artifact, CapabilityError> {
        require_dependencies(self.stage(), state)?;

        let doc_type = input.param_or("doc_type", "complete");
        let prompt = format!(
            "PROJECT: {}\nDOC TYPE: {doc_type}\n\nREQUIREMENTS:\n{}\n\nARCHITECTURE:\n{}\n\n\
             IMPLEMENTATION:\n{}\n\n\
             Write user and developer documentation: overview, setup, usage, API \
             reference, troubleshooting.",
            state.description().unwrap_or(&input.request_text),
            upstream(state, StageId::Analysis, 2000),
            upstream(state, StageId::Architecture, 2000),
            upstream(state, StageId::Implementation, 1000),
        );

        let response = self
            .generator
            .generate(GenerationRequest::new(self.stage(), prompt).with_temperature(0.3))
            .await?;

        Ok(Artifact::new("Project Documentation", response.content)
            .with_files(response.files)
            .with_metadata("doc_type", json!(doc_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::providers::{GenerationResponse, MockGenerator};
    use crate::core::{ErrorClass, StageResult};

    fn generator_with(response: GenerationResponse) -> Arc<dyn Generator> {
        let mut generator = MockGenerator::new();
        generator
            .expect_generate()
            .returning(move |_| Ok(response.clone()));
        Arc::new(generator)
    }

    fn state_with(stages: &[StageId]) -> ProjectState {
        let mut state = ProjectState::idle();
        for stage in stages {
            state.upsert(StageResult::succeeded(*stage, Artifact::new(stage.title(), "body")));
        }
        state
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("Python"), "py");
        assert_eq!(extension_for("typescript"), "ts");
        assert_eq!(extension_for("cobol"), "txt");
    }

    #[tokio::test]
    async fn test_developer_defaults() {
        let developer = SeniorDeveloper::new(generator_with(GenerationResponse::text("print('hi')")));
        let state = state_with(&[StageId::Architecture, StageId::Planning]);

        let artifact = developer.invoke(&state, &StageInput::new("x")).await.unwrap();
        assert_eq!(artifact.files.len(), 1);
        assert_eq!(artifact.files[0].path, "main_module.py");
        assert_eq!(artifact.metadata_str("module_name"), Some(DEFAULT_MODULE));
        assert_eq!(artifact.metadata_str("language"), Some("python"));
    }

    #[tokio::test]
    async fn test_developer_keeps_generated_files() {
        let response = GenerationResponse::text("two files")
            .with_file("server.js", "// server")
            .with_file("routes.js", "// routes");
        let developer = SeniorDeveloper::new(generator_with(response));
        let state = state_with(&[StageId::Architecture, StageId::Planning]);
        let input = StageInput::new("x")
            .with_param("module_name", "server")
            .with_param("language", "javascript");

        let artifact = developer.invoke(&state, &input).await.unwrap();
        let paths: Vec<_> = artifact.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["server.js", "routes.js"]);
        assert_eq!(artifact.title, "Module: server");
    }

    #[tokio::test]
    async fn test_qa_follows_implemented_module() {
        let mut state = state_with(&[StageId::Architecture]);
        state.upsert(StageResult::succeeded(
            StageId::Implementation,
            Artifact::new("Module: api", "code")
                .with_metadata("module_name", json!("api"))
                .with_metadata("language", json!("rust")),
        ));

        let qa = QaEngineer::new(generator_with(GenerationResponse::text("tests")));
        let artifact = qa.invoke(&state, &StageInput::new("x")).await.unwrap();
        assert_eq!(artifact.files[0].path, "test_api.rs");
        assert_eq!(artifact.metadata_str("test_type"), Some("comprehensive"));
    }

    #[tokio::test]
    async fn test_qa_requires_implementation() {
        let qa = QaEngineer::new(generator_with(GenerationResponse::text("tests")));
        let err = qa
            .invoke(&state_with(&[StageId::Architecture]), &StageInput::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.class, ErrorClass::MissingDependency);
    }

    #[tokio::test]
    async fn test_devops_and_docs_metadata() {
        let state = state_with(&[StageId::Analysis, StageId::Architecture, StageId::Implementation]);

        let devops = DevOpsEngineer::new(generator_with(
            GenerationResponse::text("deploy").with_file("Dockerfile", "FROM python:3.12"),
        ));
        let input = StageInput::new("x").with_param("environment", "staging");
        let artifact = devops.invoke(&state, &input).await.unwrap();
        assert_eq!(artifact.metadata_str("environment"), Some("staging"));
        assert_eq!(artifact.metadata_str("deployment_type"), Some("cloud"));
        assert_eq!(artifact.files[0].path, "Dockerfile");

        let docs = DocumentationSpecialist::new(generator_with(GenerationResponse::text("docs")));
        let artifact = docs.invoke(&state, &StageInput::new("x")).await.unwrap();
        assert_eq!(artifact.metadata_str("doc_type"), Some("complete"));
    }
}
