//! Test doubles for generators, search providers, and capabilities.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use crate::agents::{
    require_dependencies, Capability, GenerationRequest, GenerationResponse, Generator, SearchHit,
    SearchProvider, StageInput,
};
use crate::core::{Artifact, ErrorClass, StageId};
use crate::errors::CapabilityError;
use crate::state::ProjectState;

/// A generator that answers from a per-stage script and records prompts.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: HashMap<StageId, GenerationResponse>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    /// Creates a generator that answers every stage with placeholder text.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response for one stage.
    #[must_use]
    pub fn with_response(mut self, stage: StageId, response: GenerationResponse) -> Self {
        self.responses.insert(stage, response);
        self
    }

    /// Scripts a text-only response for one stage.
    #[must_use]
    pub fn with_text(self, stage: StageId, content: impl Into<String>) -> Self {
        self.with_response(stage, GenerationResponse::text(content))
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    /// Stages that called the generator, in call order.
    #[must_use]
    pub fn stages_called(&self) -> Vec<StageId> {
        self.requests.lock().iter().map(|r| r.stage).collect()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, CapabilityError> {
        let response = self
            .responses
            .get(&request.stage)
            .cloned()
            .unwrap_or_else(|| GenerationResponse::text(format!("{} output", request.role)));
        self.requests.lock().push(request);
        Ok(response)
    }
}

/// A search provider that returns the same hits for every query.
#[derive(Debug, Clone, Default)]
pub struct StaticSearch {
    hits: Vec<SearchHit>,
}

impl StaticSearch {
    /// Creates a provider returning `hits`.
    #[must_use]
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>, CapabilityError> {
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

/// A search provider whose every query fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSearch;

#[async_trait]
impl SearchProvider for FailingSearch {
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchHit>, CapabilityError> {
        Err(CapabilityError::transient(format!("search unavailable for '{query}'")))
    }
}

/// A capability that returns a fixed artifact and counts calls.
///
/// Like the real capabilities it refuses to run without its dependencies.
#[derive(Debug)]
pub struct StaticCapability {
    stage: StageId,
    artifact: Artifact,
    calls: AtomicU32,
}

impl StaticCapability {
    /// Creates a capability producing `content`.
    #[must_use]
    pub fn new(stage: StageId, content: impl Into<String>) -> Self {
        Self {
            stage,
            artifact: Artifact::new(format!("{} Report", stage.title()), content),
            calls: AtomicU32::new(0),
        }
    }

    /// Adds a file to the produced artifact.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.artifact = self.artifact.with_file(path, content);
        self
    }

    /// Number of invocations.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Capability for StaticCapability {
    fn stage(&self) -> StageId {
        self.stage
    }

    async fn invoke(&self, state: &ProjectState, _input: &StageInput) -> Result<Artifact, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        require_dependencies(self.stage, state)?;
        Ok(self.artifact.clone())
    }
}

/// A capability that always fails with a fixed class.
#[derive(Debug)]
pub struct FailingCapability {
    stage: StageId,
    error: CapabilityError,
    calls: AtomicU32,
}

impl FailingCapability {
    /// Creates a capability failing permanently.
    #[must_use]
    pub fn permanent(stage: StageId, message: impl Into<String>) -> Self {
        Self::new(stage, CapabilityError::permanent(message))
    }

    /// Creates a capability failing transiently on every attempt.
    #[must_use]
    pub fn transient(stage: StageId, message: impl Into<String>) -> Self {
        Self::new(stage, CapabilityError::transient(message))
    }

    /// Creates a capability failing with `error`.
    #[must_use]
    pub fn new(stage: StageId, error: CapabilityError) -> Self {
        Self {
            stage,
            error,
            calls: AtomicU32::new(0),
        }
    }

    /// Number of invocations.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The failure class this capability reports.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        self.error.class
    }
}

#[async_trait]
impl Capability for FailingCapability {
    fn stage(&self) -> StageId {
        self.stage
    }

    async fn invoke(&self, _state: &ProjectState, _input: &StageInput) -> Result<Artifact, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// A capability that fails transiently a set number of times, then succeeds.
#[derive(Debug)]
pub struct FlakyCapability {
    stage: StageId,
    failures: u32,
    calls: AtomicU32,
}

impl FlakyCapability {
    /// Creates a capability that fails the first `failures` calls.
    #[must_use]
    pub fn new(stage: StageId, failures: u32) -> Self {
        Self {
            stage,
            failures,
            calls: AtomicU32::new(0),
        }
    }

    /// Number of invocations.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Capability for FlakyCapability {
    fn stage(&self) -> StageId {
        self.stage
    }

    async fn invoke(&self, _state: &ProjectState, _input: &StageInput) -> Result<Artifact, CapabilityError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(CapabilityError::transient(format!("rate limited (call {call})")))
        } else {
            Ok(Artifact::new(self.stage.title(), format!("succeeded on call {call}")))
        }
    }
}

/// A capability that sleeps before succeeding.
///
/// Signals [`SlowCapability::started`] on every invocation so tests can
/// act while it is in flight.
#[derive(Debug)]
pub struct SlowCapability {
    stage: StageId,
    delay: Duration,
    started: Notify,
    calls: AtomicU32,
}

impl SlowCapability {
    /// Creates a slow capability.
    #[must_use]
    pub fn new(stage: StageId, delay: Duration) -> Self {
        Self {
            stage,
            delay,
            started: Notify::new(),
            calls: AtomicU32::new(0),
        }
    }

    /// Creates a slow capability with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(stage: StageId, ms: u64) -> Self {
        Self::new(stage, Duration::from_millis(ms))
    }

    /// Completes once an invocation has started.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    /// Number of invocations.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Capability for SlowCapability {
    fn stage(&self) -> StageId {
        self.stage
    }

    async fn invoke(&self, _state: &ProjectState, _input: &StageInput) -> Result<Artifact, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        tokio::time::sleep(self.delay).await;
        Ok(Artifact::new(self.stage.title(), "slow output"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_generator() {
        let generator = ScriptedGenerator::new().with_text(StageId::Analysis, "requirements");

        let scripted = generator
            .generate(GenerationRequest::new(StageId::Analysis, "p"))
            .await
            .unwrap();
        assert_eq!(scripted.content, "requirements");

        let fallback = generator
            .generate(GenerationRequest::new(StageId::Qa, "p"))
            .await
            .unwrap();
        assert_eq!(fallback.content, "QA Engineer output");
        assert_eq!(generator.stages_called(), vec![StageId::Analysis, StageId::Qa]);
    }

    #[tokio::test]
    async fn test_static_capability_checks_dependencies() {
        let capability = StaticCapability::new(StageId::Planning, "plan");
        let err = capability
            .invoke(&ProjectState::idle(), &StageInput::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.class, ErrorClass::MissingDependency);
        assert_eq!(capability.calls(), 1);
    }

    #[tokio::test]
    async fn test_flaky_capability() {
        let capability = FlakyCapability::new(StageId::Analysis, 2);
        let state = ProjectState::idle();
        let input = StageInput::new("x");

        assert!(capability.invoke(&state, &input).await.unwrap_err().is_transient());
        assert!(capability.invoke(&state, &input).await.is_err());
        assert!(capability.invoke(&state, &input).await.is_ok());
        assert_eq!(capability.calls(), 3);
    }

    #[tokio::test]
    async fn test_failing_search() {
        let err = FailingSearch.search("rust", 5).await.unwrap_err();
        assert!(err.message.contains("rust"));
    }

    #[tokio::test]
    async fn test_slow_capability() {
        let capability = SlowCapability::with_delay_ms(StageId::Research, 10);
        let start = std::time::Instant::now();
        capability
            .invoke(&ProjectState::idle(), &StageInput::new("x"))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(10));
        // The permit stored by notify_one lets a late waiter through.
        capability.started().await;
    }
}
