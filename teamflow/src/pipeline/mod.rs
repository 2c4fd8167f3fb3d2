//! Stage graph, mode resolution, and run-level execution policy.
//!
//! This module provides:
//! - The static stage dependency graph
//! - Execution mode to stage list resolution
//! - Bounded retry for transient failures
//! - Continue-on-failure bookkeeping

mod failure_tolerance;
mod graph;
mod modes;
mod retry;

pub use failure_tolerance::{overall_status, Blocked, FailureCollector, FailureSummary};
pub use graph::StageGraph;
pub use modes::{Complexity, ComplexityEstimator, KeywordComplexityEstimator, ModeResolver};
pub use retry::{
    should_retry, with_retry, BackoffStrategy, JitterStrategy, RetryConfig, RetryDecision,
    RetryOutcome, RetryState,
};
