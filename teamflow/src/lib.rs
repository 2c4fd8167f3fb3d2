//! # Teamflow
//!
//! An orchestration engine for a staged team of software engineering agents.
//!
//! Eight capabilities (analysis, research, architecture, planning,
//! implementation, QA, deployment, documentation) form a fixed dependency
//! graph. Teamflow provides:
//!
//! - **Mode resolution**: pick the stage subset for a run, including a
//!   complexity-driven `custom` mode
//! - **Dependency-ordered execution**: each stage runs once its
//!   dependencies have succeeded, sequentially or in parallel
//! - **Failure tolerance**: transient failures are retried, and dependents
//!   of a failed stage are skipped with a reason
//! - **Single-writer project state**: one run at a time, with snapshot
//!   reads, reset, and cancellation
//! - **Export**: turn stage artifacts into a project file tree
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use teamflow::prelude::*;
//!
//! let registry = CapabilityRegistry::standard(generator, Arc::new(NoSearch));
//! let team = Orchestrator::new(registry).with_config(TeamConfig::new());
//!
//! let summary = team.orchestrate("Build a todo app", Some("planning")).await?;
//! println!("{}", summary.render_text());
//!
//! let files = team.export(None)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod agents;
pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod export;
pub mod observability;
pub mod orchestrator;
pub mod pipeline;
pub mod state;
pub mod testing;
pub mod tools;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agents::{
        Capability, CapabilityRegistry, GenerationRequest, GenerationResponse, Generator,
        NoSearch, SearchHit, SearchProvider, StageInput,
    };
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{ExecutionStrategy, ExportConfig, TeamConfig};
    pub use crate::core::{
        Artifact, ArtifactFile, ErrorClass, ExecutionMode, ProjectRequest, RunStatus, StageId,
        StageResult, StageStatus,
    };
    pub use crate::errors::{
        CapabilityError, ConcurrentRunError, ErrorInfo, InvalidModeError, NothingToExportError,
        TeamflowError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::export::{ExportedFile, Exporter, WriteReport};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::orchestrator::{Orchestrator, RunPlan, RunSummary, StageReport};
    pub use crate::pipeline::{ModeResolver, RetryConfig, StageGraph};
    pub use crate::state::{ProjectState, ProjectStore, StatusSummary};
    pub use crate::tools::{TeamTools, ToolDefinition, ToolOutput};
}
