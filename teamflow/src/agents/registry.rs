//! Stage id to capability dispatch.

use super::delivery::{DevOpsEngineer, DocumentationSpecialist, QaEngineer, SeniorDeveloper};
use super::planning::{ProductAnalyst, ResearchEngineer, SoftwareArchitect, TechnicalLead};
use super::providers::{Generator, SearchProvider};
use super::Capability;
use crate::core::StageId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maps each stage to the capability that runs it.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<StageId, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The eight standard team capabilities over `generator` and `search`.
    #[must_use]
    pub fn standard(generator: Arc<dyn Generator>, search: Arc<dyn SearchProvider>) -> Self {
        Self::new()
            .with(ProductAnalyst::new(Arc::clone(&generator)))
            .with(ResearchEngineer::new(Arc::clone(&generator), search))
            .with(SoftwareArchitect::new(Arc::clone(&generator)))
            .with(TechnicalLead::new(Arc::clone(&generator)))
            .with(SeniorDeveloper::new(Arc::clone(&generator)))
            .with(QaEngineer::new(Arc::clone(&generator)))
            .with(DevOpsEngineer::new(Arc::clone(&generator)))
            .with(DocumentationSpecialist::new(generator))
    }

    /// Registers `capability` under its stage, replacing any previous one.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities.insert(capability.stage(), capability);
    }

    /// Builder form of [`CapabilityRegistry::register`].
    #[must_use]
    pub fn with(mut self, capability: impl Capability + 'static) -> Self {
        self.register(Arc::new(capability));
        self
    }

    /// Returns the capability for `stage`.
    #[must_use]
    pub fn get(&self, stage: StageId) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(&stage).cloned()
    }

    /// Stages with a registered capability, in declaration order.
    #[must_use]
    pub fn stages(&self) -> Vec<StageId> {
        StageId::ALL
            .into_iter()
            .filter(|s| self.capabilities.contains_key(s))
            .collect()
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("stages", &self.stages())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::NoSearch;
    use crate::testing::{ScriptedGenerator, StaticCapability};

    #[test]
    fn test_standard_registry_covers_every_stage() {
        let registry = CapabilityRegistry::standard(Arc::new(ScriptedGenerator::new()), Arc::new(NoSearch));
        assert_eq!(registry.stages(), StageId::ALL.to_vec());
        assert_eq!(registry.get(StageId::Qa).unwrap().stage(), StageId::Qa);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = CapabilityRegistry::new();
        assert!(registry.get(StageId::Analysis).is_none());

        registry.register(Arc::new(StaticCapability::new(StageId::Analysis, "first")));
        registry.register(Arc::new(StaticCapability::new(StageId::Analysis, "second")));
        assert_eq!(registry.stages(), vec![StageId::Analysis]);
    }
}
