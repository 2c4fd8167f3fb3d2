//! Testing utilities for teams.
//!
//! This module provides:
//! - Scripted generators and search providers
//! - Programmable capabilities (static, failing, flaky, slow)
//! - Ready-made orchestrator fixtures and summary assertions

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_dependency_order, assert_reasons_present, assert_run_status, assert_stage_status,
};
pub use fixtures::{fast_config, standard_team, static_registry, TeamFixture};
pub use mocks::{
    FailingCapability, FailingSearch, FlakyCapability, ScriptedGenerator, SlowCapability,
    StaticCapability, StaticSearch,
};
