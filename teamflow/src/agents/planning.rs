//! Planning capabilities: analysis, research, architecture, task breakdown.

use super::providers::{GenerationRequest, Generator, SearchHit, SearchProvider};
use super::{require_dependencies, upstream, Capability, StageInput};
use crate::core::{Artifact, StageId};
use crate::errors::CapabilityError;
use crate::state::ProjectState;
use crate::utils::truncate_chars;
use async_trait::async_trait;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

fn report_title(stage: StageId) -> String {
    format!("{} Report", stage.title())
}

/// Analyzes the request into a product specification.
#[derive(Clone)]
pub struct ProductAnalyst {
    generator: Arc<dyn Generator>,
}

impl ProductAnalyst {
    /// Creates the capability.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }
}

impl fmt::Debug for ProductAnalyst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductAnalyst").finish_non_exhaustive()
    }
}

#[async_trait]
impl Capability for ProductAnalyst {
    fn stage(&self) -> StageId {
        StageId::Analysis
    }

    async fn invoke(&self, state: &ProjectState, input: &StageInput) -> Result<Artifact, CapabilityError> {
        require_dependencies(self.stage(), state)?;

        let context = input.param_or("additional_context", "None provided");
        let prompt = format!(
            "USER REQUEST:\n{}\n\nADDITIONAL CONTEXT:\n{context}\n\n\
             Produce a product specification: overview, core requirements (MVP, \
             phase 2, future), user stories with acceptance criteria, success \
             metrics, constraints and risks, open questions.",
            input.request_text
        );

        let response = self
            .generator
            .generate(GenerationRequest::new(self.stage(), prompt).with_temperature(0.5))
            .await?;

        Ok(Artifact::new(report_title(self.stage()), response.content)
            .with_files(response.files)
            .with_metadata("has_additional_context", json!(input.param_str("additional_context").is_some())))
    }
}

/// Searches the web and synthesizes a technology research report.
///
/// Runs up to [`ResearchEngineer::MAX_SEARCHES`] queries; individual search
/// failures are logged and tolerated.
#[derive(Clone)]
pub struct ResearchEngineer {
    generator: Arc<dyn Generator>,
    search: Arc<dyn SearchProvider>,
}

impl ResearchEngineer {
    /// Upper bound on queries per invocation.
    pub const MAX_SEARCHES: usize = 4;
    /// Focus areas that get their own query.
    pub const MAX_FOCUS_QUERIES: usize = 2;
    /// Results requested per query.
    pub const RESULTS_PER_QUERY: usize = 5;
    /// Characters of serialized search data included in the prompt.
    pub const MAX_RESEARCH_CHARS: usize = 12_000;

    /// Creates the capability.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>, search: Arc<dyn SearchProvider>) -> Self {
        Self { generator, search }
    }

    /// Queries for `topic`, in execution order.
    #[must_use]
    pub fn queries(topic: &str, focus_areas: &[String]) -> Vec<String> {
        let mut queries = vec![
            format!("{topic} best practices"),
            format!("{topic} architecture patterns"),
            format!("{topic} technology stack recommendations"),
        ];
        queries.extend(
            focus_areas
                .iter()
                .take(Self::MAX_FOCUS_QUERIES)
                .map(|area| format!("{topic} {area} solutions")),
        );
        queries.truncate(Self::MAX_SEARCHES);
        queries
    }
}

impl fmt::Debug for ResearchEngineer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResearchEngineer").finish_non_exhaustive()
    }
}

#[async_trait]
impl Capability for ResearchEngineer {
    fn stage(&self) -> StageId {
        StageId::Research
    }

    async fn invoke(&self, state: &ProjectState, input: &StageInput) -> Result<Artifact, CapabilityError> {
        require_dependencies(self.stage(), state)?;

        let topic = input.param_or("topic", &input.request_text);
        let focus_areas = input.param_list("focus_areas");
        let queries = Self::queries(topic, &focus_areas);

        let mut hits: Vec<SearchHit> = Vec::new();
        let mut failed_searches = 0usize;
        for query in &queries {
            match self.search.search(query, Self::RESULTS_PER_QUERY).await {
                Ok(found) => {
                    debug!(query, results = found.len(), "Search completed");
                    hits.extend(found);
                }
                Err(e) => {
                    warn!(query, error = %e, "Search failed, continuing");
                    failed_searches += 1;
                }
            }
        }

        let research_data = serde_json::to_string_pretty(&hits).unwrap_or_default();
        let focus = if focus_areas.is_empty() {
            "General best practices".to_string()
        } else {
            focus_areas.join(", ")
        };
        let prompt = format!(
            "TOPIC: {topic}\nFOCUS AREAS: {focus}\n\nRESEARCH DATA:\n{}\n\n\
             Produce a research report: executive summary, recommended stack, \
             architectural patterns, security considerations, key resources, \
             challenges, opportunities.",
            truncate_chars(&research_data, Self::MAX_RESEARCH_CHARS)
        );

        let response = self
            .generator
            .generate(GenerationRequest::new(self.stage(), prompt).with_temperature(0.4))
            .await?;

        let sources: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
        Ok(Artifact::new(report_title(self.stage()), response.content)
            .with_files(response.files)
            .with_metadata("searches_performed", json!(queries.len()))
            .with_metadata("failed_searches", json!(failed_searches))
            .with_metadata("sources_analyzed", json!(hits.len()))
            .with_metadata("sources", json!(sources)))
    }
}

/// Designs the system architecture from requirements and research.
#[derive(Clone)]
pub struct SoftwareArchitect {
    generator: Arc<dyn Generator>,
}

impl SoftwareArchitect {
    /// Creates the capability.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }
}

impl fmt::Debug for SoftwareArchitect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareArchitect").finish_non_exhaustive()
    }
}

#[async_trait]
impl Capability for SoftwareArchitect {
    fn stage(&self) -> StageId {
        StageId::Architecture
    }

    async fn invoke(&self, state: &ProjectState, input: &StageInput) -> Result<Artifact, CapabilityError> {
        require_dependencies(self.stage(), state)?;

        let prompt = format!(
            "REQUIREMENTS:\n{}\n\nRESEARCH FINDINGS:\n{}\n\nNOTES:\n{}\n\n\
             Design the system: architecture overview, components, data models, \
             API design, technology stack, security, scalability, project layout.",
            upstream(state, StageId::Analysis, 4000),
            upstream(state, StageId::Research, 4000),
            input.param_or("notes", "None"),
        );

        let response = self
            .generator
            .generate(GenerationRequest::new(self.stage(), prompt).with_temperature(0.3))
            .await?;

        Ok(Artifact::new(report_title(self.stage()), response.content).with_files(response.files))
    }
}

/// Breaks the architecture down into an implementation plan.
#[derive(Clone)]
pub struct TechnicalLead {
    generator: Arc<dyn Generator>,
}

impl TechnicalLead {
    /// Creates the capability.
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }
}

impl fmt::Debug for TechnicalLead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TechnicalLead").finish_non_exhaustive()
    }
}

#[async_trait]
impl Capability for TechnicalLead {
    fn stage(&self) -> StageId {
        StageId::Planning
    }

    async fn invoke(&self, state: &ProjectState, input: &StageInput) -> Result<Artifact, CapabilityError> {
        require_dependencies(self.stage(), state)?;

        let prompt = format!(
            "ARCHITECTURE:\n{}\n\nNOTES:\n{}\n\n\
             Produce an implementation plan: phases, task breakdown with \
             estimates, module order, coding standards, testing strategy, \
             risks, definition of done.",
            upstream(state, StageId::Architecture, 6000),
            input.param_or("notes", "None"),
        );

        let response = self
            .generator
            .generate(GenerationRequest::new(self.stage(), prompt).with_temperature(0.3))
            .await?;

        Ok(Artifact::new(report_title(self.stage()), response.content).with_files(response.files))
    }
}
