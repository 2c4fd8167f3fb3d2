//! Event sink trait and implementations.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, Level};

/// Receives run lifecycle events.
///
/// Sinks must never fail the caller; problems are logged and dropped.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    ///
    /// * `event_type` - dotted event name (e.g. "stage.started")
    /// * `data` - optional payload
    async fn emit(&self, event_type: &str, data: Option<Value>);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at the given level (DEBUG or INFO).
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event_type: &str, data: Option<&Value>) {
        if self.level == Level::DEBUG {
            debug!(event_type, event_data = ?data, "team event");
        } else {
            info!(event_type, event_data = ?data, "team event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.log_event(event_type, data.as_ref());
    }
}

/// Records every event in memory. Used by tests and status tooling.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<(String, Option<Value>)>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<Value>)> {
        self.events.read().clone()
    }

    /// Returns just the event names, in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events whose name starts with `type_prefix`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<(String, Option<Value>)> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    #[test]
    fn test_noop_and_logging_sinks_accept_events() {
        block_on(NoOpEventSink.emit("run.started", None));
        let sink = LoggingEventSink::debug();
        block_on(sink.emit("stage.started", Some(serde_json::json!({"stage": "analysis"}))));
        block_on(LoggingEventSink::default().emit("run.completed", None));
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        block_on(async {
            sink.emit("stage.started", None).await;
            sink.emit("stage.succeeded", Some(serde_json::json!({"attempts": 1})))
                .await;
            sink.emit("run.completed", None).await;
        });

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events_of_type("stage.").len(), 2);
        assert_eq!(
            sink.event_types(),
            vec!["stage.started", "stage.succeeded", "run.completed"]
        );

        sink.clear();
        assert!(sink.is_empty());
    }
}
