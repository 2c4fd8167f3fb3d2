//! Ready-made teams for tests.

use std::sync::Arc;

use super::mocks::{ScriptedGenerator, StaticCapability};
use crate::agents::{Capability, CapabilityRegistry, NoSearch};
use crate::config::TeamConfig;
use crate::core::StageId;
use crate::events::{CollectingEventSink, EventSink};
use crate::orchestrator::Orchestrator;
use crate::pipeline::RetryConfig;

/// Configuration with millisecond retry delays.
#[must_use]
pub fn fast_config() -> TeamConfig {
    TeamConfig::new().with_retry(
        RetryConfig::new()
            .with_max_attempts(3)
            .with_base_delay_ms(1)
            .with_max_delay_ms(5),
    )
}

/// A registry of [`StaticCapability`] for every stage.
#[must_use]
pub fn static_registry() -> CapabilityRegistry {
    StageId::ALL.into_iter().fold(CapabilityRegistry::new(), |registry, stage| {
        registry.with(StaticCapability::new(
            stage,
            format!("{} output", stage.title()),
        ))
    })
}

/// The real capabilities over a [`ScriptedGenerator`] and no search.
#[must_use]
pub fn standard_team() -> Orchestrator {
    let registry = CapabilityRegistry::standard(Arc::new(ScriptedGenerator::new()), Arc::new(NoSearch));
    Orchestrator::new(registry).with_config(fast_config())
}

/// An orchestrator wired to a collecting event sink.
#[derive(Debug)]
pub struct TeamFixture {
    /// The orchestrator under test.
    pub team: Arc<Orchestrator>,
    /// Every event the orchestrator emitted.
    pub events: Arc<CollectingEventSink>,
}

impl TeamFixture {
    /// Static capabilities for every stage, fast retries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_overrides(Vec::new())
    }

    /// Static capabilities except for `overrides`, which replace the
    /// capability for their stage.
    #[must_use]
    pub fn with_overrides(overrides: Vec<Arc<dyn Capability>>) -> Self {
        Self::build(overrides, fast_config())
    }

    /// Like [`TeamFixture::with_overrides`] with an explicit configuration.
    #[must_use]
    pub fn build(overrides: Vec<Arc<dyn Capability>>, config: TeamConfig) -> Self {
        let mut registry = static_registry();
        for capability in overrides {
            registry.register(capability);
        }

        let events = Arc::new(CollectingEventSink::new());
        let team = Orchestrator::new(registry)
            .with_config(config)
            .with_event_sink(Arc::clone(&events) as Arc<dyn EventSink>);

        Self {
            team: Arc::new(team),
            events,
        }
    }
}

impl Default for TeamFixture {
    fn default() -> Self {
        Self::new()
    }
}
