//! Protocol traits for the external services capabilities call.
//!
//! The engine never generates text or searches the web itself. A
//! [`Generator`] produces artifact content; a [`SearchProvider`] returns
//! web results for research. Both are injected.

use crate::core::{ArtifactFile, StageId};
use crate::errors::CapabilityError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request sent to a [`Generator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The stage asking for content.
    pub stage: StageId,
    /// Role the generator should adopt (e.g. "Product Analyst").
    pub role: String,
    /// Prompt text assembled from the request and upstream artifacts.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token budget.
    pub max_output_tokens: u32,
}

impl GenerationRequest {
    /// Creates a request with the stage's default role.
    #[must_use]
    pub fn new(stage: StageId, prompt: impl Into<String>) -> Self {
        Self {
            stage,
            role: stage.title().to_string(),
            prompt: prompt.into(),
            temperature: 0.3,
            max_output_tokens: 8192,
        }
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the output token budget.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }
}

/// Content returned by a [`Generator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Main text.
    pub content: String,
    /// Files the generator proposes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ArtifactFile>,
    /// Model identifier, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl GenerationResponse {
    /// Creates a text-only response.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Adds a proposed file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push(ArtifactFile::new(path, content));
        self
    }
}

/// Opaque text generation service.
///
/// Implementations classify their failures: rate limits and timeouts are
/// transient, malformed requests are permanent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generates content for `request`.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, CapabilityError>;
}

/// One web search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Snippet of page content.
    pub snippet: String,
}

impl SearchHit {
    /// Creates a search hit.
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// Web search service used by research.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Searches for `query`, returning at most `max_results` hits.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, CapabilityError>;
}

/// A search provider that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSearch;

#[async_trait]
impl SearchProvider for NoSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>, CapabilityError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_request_defaults() {
        let request = GenerationRequest::new(StageId::Qa, "write tests").with_temperature(0.2);
        assert_eq!(request.role, "QA Engineer");
        assert_eq!(request.max_output_tokens, 8192);
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_mock_generator() {
        let mut generator = MockGenerator::new();
        generator
            .expect_generate()
            .withf(|req| req.stage == StageId::Analysis)
            .times(1)
            .returning(|req| Ok(GenerationResponse::text(format!("echo: {}", req.prompt))));

        let response = generator
            .generate(GenerationRequest::new(StageId::Analysis, "hi"))
            .await
            .unwrap();
        assert_eq!(response.content, "echo: hi");
    }

    #[tokio::test]
    async fn test_no_search_is_empty() {
        assert!(NoSearch.search("anything", 5).await.unwrap().is_empty());
    }
}
