//! Mode resolution: execution mode plus request text to an ordered stage list.
//!
//! Fixed modes select a static stage set. `custom` asks a pluggable
//! [`ComplexityEstimator`] to classify the request and maps the class to the
//! smallest sufficient fixed mode, falling back to `full` when the
//! estimate is inconclusive.

use super::graph::StageGraph;
use crate::core::{ExecutionMode, StageId};
use crate::errors::InvalidModeError;
use crate::utils::word_count;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Estimated size of a project request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// A small tool or prototype.
    Simple,
    /// A typical application with a few components.
    Moderate,
    /// A multi-service system that needs deployment.
    Complex,
    /// A large system that needs the whole team.
    Enterprise,
    /// No usable signal.
    Inconclusive,
}

impl Complexity {
    /// The smallest fixed mode sufficient for this complexity.
    #[must_use]
    pub const fn recommended_mode(self) -> ExecutionMode {
        match self {
            Self::Simple => ExecutionMode::Planning,
            Self::Moderate => ExecutionMode::Implementation,
            Self::Complex => ExecutionMode::Deployment,
            Self::Enterprise | Self::Inconclusive => ExecutionMode::Full,
        }
    }

    /// Wire name of the class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
            Self::Enterprise => "enterprise",
            Self::Inconclusive => "inconclusive",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a request for `custom` mode.
///
/// Implementations must be deterministic for a given input.
pub trait ComplexityEstimator: Send + Sync + fmt::Debug {
    /// Estimates the complexity of `request_text`.
    fn estimate(&self, request_text: &str) -> Complexity;
}

#[allow(clippy::expect_used)]
static ENTERPRISE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(enterprise|multi[- ]?tenant|compliance|sso|audit(ing)?|high[- ]availability|global scale)\b")
        .expect("enterprise pattern is valid")
});

#[allow(clippy::expect_used)]
static COMPLEX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(microservices?|distributed|kubernetes|k8s|deploy(ment|ed)?|real[- ]?time|scal(e|able|ing)|payments?|ci/cd|production)\b")
        .expect("complex pattern is valid")
});

#[allow(clippy::expect_used)]
static MODERATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(api|database|auth(entication)?|login|users?|backend|frontend|web ?app|dashboard|rest)\b")
        .expect("moderate pattern is valid")
});

#[allow(clippy::expect_used)]
static SIMPLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(script|cli|prototype|simple|small|todo|calculator|hello world|utility)\b")
        .expect("simple pattern is valid")
});

/// Keyword and length heuristic.
///
/// The strongest keyword class wins; without keywords, long requests are
/// treated as moderate and anything under three words is inconclusive.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordComplexityEstimator;

impl KeywordComplexityEstimator {
    /// Requests at or above this many words count as at least moderate.
    pub const LONG_REQUEST_WORDS: usize = 60;
    /// Requests below this many words carry no signal on their own.
    pub const MIN_SIGNAL_WORDS: usize = 3;
}

impl ComplexityEstimator for KeywordComplexityEstimator {
    fn estimate(&self, request_text: &str) -> Complexity {
        let words = word_count(request_text);
        if words == 0 {
            return Complexity::Inconclusive;
        }

        if ENTERPRISE_PATTERN.is_match(request_text) {
            return Complexity::Enterprise;
        }
        if COMPLEX_PATTERN.is_match(request_text) {
            return Complexity::Complex;
        }
        if MODERATE_PATTERN.is_match(request_text) || words >= Self::LONG_REQUEST_WORDS {
            return Complexity::Moderate;
        }
        if SIMPLE_PATTERN.is_match(request_text) {
            return Complexity::Simple;
        }
        if words < Self::MIN_SIGNAL_WORDS {
            return Complexity::Inconclusive;
        }
        Complexity::Simple
    }
}

/// Maps modes to ordered stage lists over a [`StageGraph`].
#[derive(Debug, Clone)]
pub struct ModeResolver {
    graph: StageGraph,
    estimator: Arc<dyn ComplexityEstimator>,
}

impl Default for ModeResolver {
    fn default() -> Self {
        Self::new(StageGraph::standard())
    }
}

impl ModeResolver {
    /// Creates a resolver with the keyword estimator.
    #[must_use]
    pub fn new(graph: StageGraph) -> Self {
        Self {
            graph,
            estimator: Arc::new(KeywordComplexityEstimator),
        }
    }

    /// Replaces the complexity estimator.
    #[must_use]
    pub fn with_estimator(mut self, estimator: Arc<dyn ComplexityEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// The graph stages are ordered against.
    #[must_use]
    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// Estimated complexity of `request_text`.
    #[must_use]
    pub fn complexity(&self, request_text: &str) -> Complexity {
        self.estimator.estimate(request_text)
    }

    /// The fixed mode `mode` stands for. `Custom` is resolved through the
    /// estimator; other modes map to themselves.
    #[must_use]
    pub fn effective_mode(&self, mode: ExecutionMode, request_text: &str) -> ExecutionMode {
        match mode {
            ExecutionMode::Custom => {
                let complexity = self.estimator.estimate(request_text);
                let chosen = complexity.recommended_mode();
                tracing::debug!(%complexity, mode = %chosen, "Resolved custom mode");
                chosen
            }
            fixed => fixed,
        }
    }

    /// Resolves `mode` to a dependency-ordered stage list.
    ///
    /// Deterministic for a given `(mode, request_text)`; every stage's
    /// dependencies appear before it.
    #[must_use]
    pub fn resolve(&self, mode: ExecutionMode, request_text: &str) -> Vec<StageId> {
        let effective = self.effective_mode(mode, request_text);
        let selected = effective.stage_set().unwrap_or(&StageId::ALL);
        let closed = self.graph.closure(selected);
        self.graph.topological_order(&closed)
    }

    /// Parses `mode` and resolves it.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidModeError`] for unrecognized mode strings.
    pub fn resolve_str(&self, mode: &str, request_text: &str) -> Result<Vec<StageId>, InvalidModeError> {
        let mode: ExecutionMode = mode.parse()?;
        Ok(self.resolve(mode, request_text))
    }
}
