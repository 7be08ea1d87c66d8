//! Lifecycle events emitted by the harness.
//!
//! Every run failure (and a missing task) is reported to an [`EventSink`] so
//! the cluster agent can diagnose it remotely. Emission is fire-and-forget:
//! sinks log their own delivery failures and never hand them back to the
//! runner.
//!
//! # Event Format
//!
//! Events serialize as single-line JSON objects:
//! - `ts`: RFC3339 timestamp
//! - `priority`: `debug` or `error`
//! - `publisher`: publisher id of this agent
//! - `node_id`: node the event originates from
//! - `task`: optional task identifier
//! - `payload`: freeform object, always carrying a `message` string
//!
//! ```no_run
//! use hostexec::events::{Emitter, NdjsonSink};
//! use hostexec::identity::Identity;
//! use std::sync::Arc;
//!
//! let identity = Identity::new("hostexec", "node-1", "/var/run/hostexec/message.sock");
//! let emitter = Emitter::new(identity, Arc::new(NdjsonSink::new("/tmp/events.ndjson")));
//! emitter.error(Some("check_disk"), "Empty argument dictionary");
//! ```

mod sink;

pub use sink::{EventSink, FanoutSink, MemorySink, NdjsonSink, SocketSink, TracingSink};

use crate::error::{HarnessError, Result};
use crate::identity::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Priority of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Debug,
    Error,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Debug => write!(f, "debug"),
            Priority::Error => write!(f, "error"),
        }
    }
}

/// A lifecycle notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    pub priority: Priority,

    /// Publisher id of the emitting agent.
    pub publisher: String,

    /// Node the event originates from.
    pub node_id: String,

    /// Task the event concerns, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Freeform payload; always carries a `message` string.
    pub payload: Value,
}

impl Event {
    /// Create an event stamped with the given identity and the current time.
    pub fn new(priority: Priority, identity: &Identity, message: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            priority,
            publisher: identity.publisher_id.clone(),
            node_id: identity.node_id.clone(),
            task: None,
            payload: json!({ "message": message.into() }),
        }
    }

    /// Set the task identifier for this event.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// The `message` field of the payload.
    pub fn message(&self) -> &str {
        self.payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            HarnessError::Config(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// Stamps events with this process's identity and hands them to a sink.
#[derive(Clone)]
pub struct Emitter {
    identity: Identity,
    sink: Arc<dyn EventSink>,
}

impl Emitter {
    pub fn new(identity: Identity, sink: Arc<dyn EventSink>) -> Self {
        Self { identity, sink }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn debug(&self, task: Option<&str>, message: impl Into<String>) {
        self.emit(Priority::Debug, task, message.into());
    }

    pub fn error(&self, task: Option<&str>, message: impl Into<String>) {
        self.emit(Priority::Error, task, message.into());
    }

    fn emit(&self, priority: Priority, task: Option<&str>, message: String) {
        let mut event = Event::new(priority, &self.identity, message);
        if let Some(task) = task {
            event = event.with_task(task);
        }
        self.sink.emit(&event);
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::new("publisher-a", "node-1", "/run/test.sock")
    }

    #[test]
    fn test_event_creation() {
        let event = Event::new(Priority::Error, &identity(), "boom");

        assert_eq!(event.priority, Priority::Error);
        assert_eq!(event.publisher, "publisher-a");
        assert_eq!(event.node_id, "node-1");
        assert_eq!(event.message(), "boom");
        assert!(event.task.is_none());
        let age = Utc::now().signed_duration_since(event.ts);
        assert!(age.num_minutes() < 1);
    }

    #[test]
    fn test_event_serialization_is_single_line() {
        let event = Event::new(Priority::Debug, &identity(), "line one\nline two")
            .with_task("check_disk");
        let line = event.to_ndjson_line().unwrap();

        assert!(!line.contains('\n'));
        assert!(line.contains("\"priority\":\"debug\""));
        let parsed: Event = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.task.as_deref(), Some("check_disk"));
        assert_eq!(parsed.message(), "line one\nline two");
    }

    #[test]
    fn test_event_without_task_omits_field() {
        let line = Event::new(Priority::Debug, &identity(), "x")
            .to_ndjson_line()
            .unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert!(parsed.get("task").is_none());
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(Priority::Debug.to_string(), "debug");
        assert_eq!(Priority::Error.to_string(), "error");
    }

    #[test]
    fn test_emitter_stamps_identity() {
        let sink = Arc::new(MemorySink::new());
        let emitter = Emitter::new(identity(), sink.clone());

        emitter.debug(Some("setup"), "looking");
        emitter.error(None, "failed");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].priority, Priority::Debug);
        assert_eq!(events[0].task.as_deref(), Some("setup"));
        assert_eq!(events[1].priority, Priority::Error);
        assert_eq!(events[1].node_id, "node-1");
        assert_eq!(events[1].message(), "failed");
    }
}
