// crates/arbor-debug/src/sink.rs
// ============================================================================
// Module: Trace and Explanation Sinks
// Description: Structured trace events and pluggable output sinks.
// Purpose: Route debugger tracing and decision explanations without hard wiring.
// Dependencies: arbor-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Trace events are JSON-serializable records emitted while the debugger
//! walks a tree with the `tracing` option on. Explanations are plain lines
//! emitted with the `explanations` option on. Sinks decide where both go:
//! nowhere, an in-memory buffer, stderr, or an append-only JSON-lines file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use arbor_core::NodeId;
use arbor_core::Value;
use serde::Serialize;

// ============================================================================
// SECTION: Trace Events
// ============================================================================

/// Trace event payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    /// Event identifier (`node_enter`, `decision`, `branch`, `node_exit`, `pause`, `complete`).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch, read from the debugger clock).
    pub timestamp_ms: u128,
    /// Node the event concerns, when any.
    pub node: Option<NodeId>,
    /// Free-form detail such as a branch target or pause reason.
    pub detail: Option<String>,
    /// Decision or result value, when any.
    pub value: Option<Value>,
}

impl TraceEvent {
    /// Creates an event stamped with the given wall-clock time.
    #[must_use]
    pub const fn new(event: &'static str, unix_time: Duration) -> Self {
        Self {
            event,
            timestamp_ms: unix_time.as_millis(),
            node: None,
            detail: None,
            value: None,
        }
    }

    /// Attaches a node.
    #[must_use]
    pub const fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Attaches detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attaches a value.
    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

// ============================================================================
// SECTION: Trace Sinks
// ============================================================================

/// Destination for trace events.
pub trait TraceSink: Send + Sync {
    /// Record a trace event.
    fn record(&self, event: &TraceEvent);
}

/// Trace sink that drops every event.
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn record(&self, _event: &TraceEvent) {}
}

/// Trace sink that buffers events in memory.
#[derive(Default)]
pub struct MemoryTraceSink {
    /// Buffered events in emission order.
    events: Mutex<Vec<TraceEvent>>,
}

impl MemoryTraceSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the buffered events.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the buffered event identifiers.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .map(|events| events.iter().map(|event| event.event).collect())
            .unwrap_or_default()
    }
}

impl TraceSink for MemoryTraceSink {
    fn record(&self, event: &TraceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Trace sink that logs JSON lines to stderr.
pub struct StderrTraceSink;

impl TraceSink for StderrTraceSink {
    fn record(&self, event: &TraceEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Trace sink that logs JSON lines to a file.
pub struct FileTraceSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileTraceSink {
    /// Opens the trace file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl TraceSink for FileTraceSink {
    fn record(&self, event: &TraceEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

// ============================================================================
// SECTION: Explanation Sinks
// ============================================================================

/// Destination for human-readable decision explanations.
pub trait ExplanationSink: Send + Sync {
    /// Record one explanation line.
    fn explain(&self, line: &str);
}

/// Explanation sink that drops every line.
pub struct NoopExplanationSink;

impl ExplanationSink for NoopExplanationSink {
    fn explain(&self, _line: &str) {}
}

/// Explanation sink that buffers lines in memory.
#[derive(Default)]
pub struct MemoryExplanationSink {
    /// Buffered lines in emission order.
    lines: Mutex<Vec<String>>,
}

impl MemoryExplanationSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the buffered lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }
}

impl ExplanationSink for MemoryExplanationSink {
    fn explain(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
