//! Observability utilities.

mod logging;

pub use logging::{init_tracing, run_span, stage_span, LogFormat, SpanTimer};
