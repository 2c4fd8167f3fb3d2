//! Core domain model types for teamflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Stage identifiers, execution modes, and status enums
//! - Stage results with factory methods
//! - Artifacts and the immutable project request

mod artifact;
mod output;
mod request;
mod status;

pub use artifact::{Artifact, ArtifactFile};
pub use output::{StageFailure, StageResult};
pub use request::ProjectRequest;
pub use status::{ErrorClass, ExecutionMode, RunStatus, StageId, StageStatus};
