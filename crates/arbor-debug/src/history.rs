// crates/arbor-debug/src/history.rs
// ============================================================================
// Module: Decision History
// Description: Append-only log of node decisions with path reconstruction.
// Purpose: Let operators replay how an evaluation reached a decision.
// Dependencies: arbor-core, serde, serde_json, time
// ============================================================================

//! ## Overview
//! Every executed node appends a [`DecisionRecord`] holding an owned clone
//! of the decision value, its tree depth (recomputed from parent links on
//! every record), wall-clock timestamp, and evaluation time. Records are
//! never mutated after creation.
//!
//! [`DecisionHistory::get_path`] rebuilds the root-to-node path by scanning
//! backward to the nearest depth-0 record. This assumes one linear
//! evaluation stream; interleaved evaluations are not detected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::time::Duration;

use arbor_core::DecisionTree;
use arbor_core::NodeId;
use arbor_core::SharedClock;
use arbor_core::Value;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Timestamp layout of the history table.
const TABLE_TIMESTAMP_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

// ============================================================================
// SECTION: Records
// ============================================================================

/// One recorded decision.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    /// Strictly increasing sequence number.
    pub sequence: u64,
    /// Node that decided.
    pub node: NodeId,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Owned copy of the decision value.
    pub decision: Value,
    /// Wall-clock time as an offset from the Unix epoch.
    pub timestamp: Duration,
    /// Node evaluation time.
    pub execution_time: Duration,
    /// Hops from the root at record time.
    pub depth: usize,
    /// Whether the node had no children.
    pub is_leaf: bool,
    /// Whether the node was a condition.
    pub is_condition: bool,
}

/// JSON shape of a record.
#[derive(Debug, Serialize)]
struct RecordView<'a> {
    /// Sequence number.
    sequence: u64,
    /// Node identifier.
    node: NodeId,
    /// Description, if any.
    description: Option<&'a str>,
    /// Decision value.
    decision: &'a Value,
    /// RFC 3339 UTC timestamp.
    timestamp: String,
    /// Evaluation time in microseconds.
    execution_time_us: u64,
    /// Tree depth.
    depth: usize,
    /// Leaf flag.
    is_leaf: bool,
    /// Condition flag.
    is_condition: bool,
}

impl<'a> From<&'a DecisionRecord> for RecordView<'a> {
    fn from(record: &'a DecisionRecord) -> Self {
        Self {
            sequence: record.sequence,
            node: record.node,
            description: record.description.as_deref(),
            decision: &record.decision,
            timestamp: rfc3339(record.timestamp),
            execution_time_us: u64::try_from(record.execution_time.as_micros()).unwrap_or(u64::MAX),
            depth: record.depth,
            is_leaf: record.is_leaf,
            is_condition: record.is_condition,
        }
    }
}

// ============================================================================
// SECTION: History
// ============================================================================

/// Decision recorder.
///
/// # Invariants
/// - Sequence numbers strictly increase and reset only on `clear`.
/// - With a capacity set, at most `capacity` records are retained; the oldest
///   are evicted first.
#[derive(Clone)]
pub struct DecisionHistory {
    /// Retained records, oldest first.
    records: VecDeque<DecisionRecord>,
    /// Whether recording is on.
    enabled: bool,
    /// Optional retention cap.
    capacity: Option<usize>,
    /// Next sequence number.
    next_sequence: u64,
    /// Wall-clock source.
    clock: SharedClock,
}

impl std::fmt::Debug for DecisionHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionHistory")
            .field("records", &self.records.len())
            .field("enabled", &self.enabled)
            .field("capacity", &self.capacity)
            .field("next_sequence", &self.next_sequence)
            .finish_non_exhaustive()
    }
}

impl DecisionHistory {
    /// Creates an enabled, unbounded history.
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            records: VecDeque::new(),
            enabled: true,
            capacity: None,
            next_sequence: 1,
            clock,
        }
    }

    /// Caps retained records; zero is treated as one.
    #[must_use]
    pub fn with_capacity(mut self, capacity: Option<usize>) -> Self {
        self.capacity = capacity.map(|capacity| capacity.max(1));
        self.evict();
        self
    }

    /// Turns recording on or off.
    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns whether recording is on.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Appends a decision; returns its sequence number, or `None` when disabled.
    pub fn record_decision(
        &mut self,
        tree: &DecisionTree,
        node: NodeId,
        value: &Value,
        execution_time: Duration,
        description: Option<&str>,
    ) -> Option<u64> {
        if !self.enabled {
            return None;
        }
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        let shape = tree.get(node);
        self.records.push_back(DecisionRecord {
            sequence,
            node,
            description: description.map(str::to_string),
            decision: value.clone(),
            timestamp: self.clock.unix_time(),
            execution_time,
            depth: tree.depth_of(node).unwrap_or(0),
            is_leaf: shape.is_some_and(arbor_core::Node::is_leaf),
            is_condition: shape.is_some_and(arbor_core::Node::is_condition),
        });
        self.evict();
        Some(sequence)
    }

    /// Drops the oldest records beyond the capacity.
    fn evict(&mut self) {
        if let Some(capacity) = self.capacity {
            while self.records.len() > capacity {
                self.records.pop_front();
            }
        }
    }

    /// Returns the number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether no records are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the retained record at `index` (0 is the oldest retained).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DecisionRecord> {
        self.records.get(index)
    }

    /// Returns the newest record.
    #[must_use]
    pub fn last(&self) -> Option<&DecisionRecord> {
        self.records.back()
    }

    /// Iterates retained records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DecisionRecord> {
        self.records.iter()
    }

    /// Rebuilds the root-to-node path ending at `index`.
    ///
    /// Scans backward and prepends records until a depth-0 record is included.
    /// When retained history starts before such a record, the partial path is
    /// returned. An out-of-range index yields an empty path.
    #[must_use]
    pub fn get_path(&self, index: usize) -> Vec<&DecisionRecord> {
        if index >= self.records.len() {
            return Vec::new();
        }
        let mut path = Vec::new();
        for record in self.records.range(..=index).rev() {
            path.push(record);
            if record.depth == 0 {
                break;
            }
        }
        path.reverse();
        path
    }

    /// Returns every retained record for `node`.
    #[must_use]
    pub fn find_by_node(&self, node: NodeId) -> Vec<&DecisionRecord> {
        self.records.iter().filter(|record| record.node == node).collect()
    }

    /// Drops all records and restarts sequence numbering.
    pub fn clear(&mut self) {
        self.records.clear();
        self.next_sequence = 1;
    }

    /// Renders the text table.
    #[must_use]
    pub fn render_table(&self) -> String {
        render_records(self.records.iter())
    }

    /// Renders the JSON array.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let views: Vec<RecordView<'_>> = self.records.iter().map(RecordView::from).collect();
        serde_json::to_value(views).unwrap_or(serde_json::Value::Null)
    }
}

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Renders records as the history table.
pub fn render_records<'a>(records: impl Iterator<Item = &'a DecisionRecord>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<4} {:<20} {:<6} {:<5} Decision", "Seq", "Timestamp", "Depth", "Node");
    let mut empty = true;
    for record in records {
        empty = false;
        let _ = writeln!(
            out,
            "{:<4} {:<20} {:<6} {:<5} {}",
            record.sequence,
            table_timestamp(record.timestamp),
            record.depth,
            record.node,
            record.decision
        );
    }
    if empty {
        out.push_str("(no decisions recorded)\n");
    }
    out
}

/// Formats a Unix offset as RFC 3339 UTC; out-of-range times render empty.
fn rfc3339(unix: Duration) -> String {
    i128::try_from(unix.as_nanos())
        .ok()
        .and_then(|nanos| OffsetDateTime::from_unix_timestamp_nanos(nanos).ok())
        .and_then(|time| time.format(&Rfc3339).ok())
        .unwrap_or_default()
}

/// Formats a Unix offset as `YYYY-MM-DD HH:MM:SS` UTC; out-of-range times
/// render as `-`.
fn table_timestamp(unix: Duration) -> String {
    i64::try_from(unix.as_secs())
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|time| {
            let format = format_description::parse(TABLE_TIMESTAMP_FORMAT).ok()?;
            time.format(&format).ok()
        })
        .unwrap_or_else(|| "-".to_string())
}
