//! Event sinks.
//!
//! A sink receives fully stamped [`Event`]s. Delivery is best-effort: a sink
//! that cannot deliver logs a warning through `tracing` and drops the event.

use super::{Event, Priority};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Destination for lifecycle events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event);
}

/// Writes each event as one JSON line to the agent's Unix event socket.
#[derive(Debug, Clone)]
pub struct SocketSink {
    path: PathBuf,
    timeout: Duration,
}

impl SocketSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: Duration::from_secs(2),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn deliver(&self, line: &str) -> std::io::Result<()> {
        use std::os::unix::net::UnixStream;

        let mut stream = UnixStream::connect(&self.path)?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()
    }

    #[cfg(not(unix))]
    fn deliver(&self, _line: &str) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "unix sockets are not available on this platform",
        ))
    }
}

impl EventSink for SocketSink {
    fn emit(&self, event: &Event) {
        let line = match event.to_ndjson_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "dropping event");
                return;
            }
        };

        if let Err(e) = self.deliver(&line) {
            tracing::warn!(
                socket = %self.path.display(),
                error = %e,
                "failed to deliver event to socket"
            );
        }
    }
}

/// Appends events to an NDJSON file, one object per line.
#[derive(Debug)]
pub struct NdjsonSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl NdjsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        // Concurrent runners share one sink; keep their lines whole.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.sync_all()
    }
}

impl EventSink for NdjsonSink {
    fn emit(&self, event: &Event) {
        let result = event
            .to_ndjson_line()
            .map_err(|e| std::io::Error::other(e.to_string()))
            .and_then(|line| self.append(&line));

        if let Err(e) = result {
            tracing::warn!(
                file = %self.path.display(),
                error = %e,
                "failed to append event"
            );
        }
    }
}

/// Forwards events to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &Event) {
        let task = event.task.as_deref().unwrap_or("-");
        match event.priority {
            Priority::Debug => tracing::debug!(
                publisher = %event.publisher,
                node_id = %event.node_id,
                task,
                "{}",
                event.message()
            ),
            Priority::Error => tracing::error!(
                publisher = %event.publisher,
                node_id = %event.node_id,
                task,
                "{}",
                event.message()
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    /// Events of the given priority.
    pub fn with_priority(&self, priority: Priority) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.priority == priority)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(event.clone());
    }
}

/// Delivers every event to each of its sinks in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &Event) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use tempfile::TempDir;

    fn event(priority: Priority, message: &str) -> Event {
        let identity = Identity::new("pub", "node", "/run/none.sock");
        Event::new(priority, &identity, message)
    }

    #[test]
    fn test_ndjson_sink_creates_file_and_parent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("events.ndjson");
        let sink = NdjsonSink::new(&path);

        sink.emit(&event(Priority::Debug, "first"));
        sink.emit(&event(Priority::Error, "second"));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(content.ends_with('\n'));

        let parsed: Event = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.priority, Priority::Error);
        assert_eq!(parsed.message(), "second");
    }

    #[test]
    fn test_ndjson_sink_swallows_write_failures() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be opened for appending.
        let sink = NdjsonSink::new(temp_dir.path());
        sink.emit(&event(Priority::Error, "lost"));
    }

    #[test]
    fn test_socket_sink_missing_socket_is_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let sink = SocketSink::new(temp_dir.path().join("absent.sock"));
        sink.emit(&event(Priority::Error, "nobody listening"));
    }

    #[cfg(unix)]
    #[test]
    fn test_socket_sink_writes_json_line() {
        use std::io::{BufRead, BufReader};
        use std::os::unix::net::UnixListener;

        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("events.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let reader = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut line = String::new();
            BufReader::new(stream).read_line(&mut line).unwrap();
            line
        });

        SocketSink::new(&socket_path).emit(&event(Priority::Error, "over the wire"));

        let line = reader.join().unwrap();
        let parsed: Event = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed.message(), "over the wire");
        assert_eq!(parsed.publisher, "pub");
    }

    #[test]
    fn test_memory_sink_filters_by_priority() {
        let sink = MemorySink::new();
        sink.emit(&event(Priority::Debug, "a"));
        sink.emit(&event(Priority::Error, "b"));
        sink.emit(&event(Priority::Error, "c"));

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.with_priority(Priority::Error).len(), 2);
        assert_eq!(sink.with_priority(Priority::Debug)[0].message(), "a");
    }

    #[test]
    fn test_fanout_delivers_to_every_sink() {
        let first = Arc::new(MemorySink::new());
        let second = Arc::new(MemorySink::new());
        let fanout = FanoutSink::new()
            .with(first.clone())
            .with(second.clone())
            .with(Arc::new(TracingSink));

        assert_eq!(fanout.len(), 3);
        fanout.emit(&event(Priority::Error, "everywhere"));

        assert_eq!(first.events().len(), 1);
        assert_eq!(second.events()[0].message(), "everywhere");
    }
}
