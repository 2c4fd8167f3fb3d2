//! Structured logging setup and span helpers.

use crate::core::{ExecutionMode, StageId};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info_span, Span};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Output format for [`init_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, multi-line output.
    #[default]
    Pretty,
    /// Single-line compact output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// Installs a global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `teamflow=info,warn`.
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("teamflow=info,warn"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);

    let result = match format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().with_target(false).try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    result.is_ok()
}

/// Span covering one orchestrated run.
#[must_use]
pub fn run_span(run_id: Uuid, mode: ExecutionMode) -> Span {
    info_span!("team_run", %run_id, %mode)
}

/// Span covering one stage, across all of its attempts.
#[must_use]
pub fn stage_span(run_id: Uuid, stage: StageId) -> Span {
    info_span!("team_stage", %run_id, stage = stage.as_str(), agent = stage.agent_name())
}

/// Wall-clock timer for stage durations.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
}

impl SpanTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}
