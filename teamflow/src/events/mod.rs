//! Run lifecycle events.
//!
//! The orchestrator reports progress through an [`EventSink`]. Event names
//! are fixed by [`TeamEvent`]; payloads are small JSON objects keyed by
//! `run_id` and, for stage events, `stage`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use std::fmt;

/// Names of events emitted during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamEvent {
    /// A run resolved its stages and started.
    RunStarted,
    /// A stage is about to be invoked.
    StageStarted,
    /// A stage failed transiently and will be retried.
    StageRetrying,
    /// A stage produced an artifact.
    StageSucceeded,
    /// A stage failed after its final attempt.
    StageFailed,
    /// A stage was skipped by failure propagation or cancellation.
    StageSkipped,
    /// A run reached a terminal status.
    RunCompleted,
    /// The project store was cleared.
    ProjectReset,
}

impl TeamEvent {
    /// Dotted event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunStarted => "run.started",
            Self::StageStarted => "stage.started",
            Self::StageRetrying => "stage.retrying",
            Self::StageSucceeded => "stage.succeeded",
            Self::StageFailed => "stage.failed",
            Self::StageSkipped => "stage.skipped",
            Self::RunCompleted => "run.completed",
            Self::ProjectReset => "project.reset",
        }
    }
}

impl fmt::Display for TeamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(TeamEvent::RunStarted.as_str(), "run.started");
        assert_eq!(TeamEvent::StageRetrying.to_string(), "stage.retrying");
        assert_eq!(TeamEvent::ProjectReset.as_str(), "project.reset");
    }
}
