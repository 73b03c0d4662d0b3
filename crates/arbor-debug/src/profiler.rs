// crates/arbor-debug/src/profiler.rs
// ============================================================================
// Module: Profiler
// Description: Hierarchical timing of nodes, functions, and named blocks.
// Purpose: Attribute evaluation time and allocation to tree structure.
// Dependencies: arbor-core, serde, serde_json
// ============================================================================

//! ## Overview
//! `begin`/`end` pairs time one [`ProfileId`]. The profiler keeps an explicit
//! call stack: the entry active when `begin` runs becomes the caller, and the
//! callee is linked as its child (at most once). Unmatched `end` calls are
//! ignored. With memory tracking on, the live-byte counter of the injected
//! [`arbor_core::MemoryProbe`] is sampled on every begin and end to maintain
//! a peak.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::time::Duration;

use arbor_core::NodeId;
use arbor_core::SharedClock;
use arbor_core::SharedProbe;
use serde::Serialize;

/// Default number of entries shown by reports.
pub const DEFAULT_REPORT_LIMIT: usize = 20;

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Profiled unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfileId {
    /// A tree node, timed across its whole subtree.
    Node(NodeId),
    /// A function called from an expression.
    Function(String),
    /// A caller-named block.
    Block(String),
}

impl ProfileId {
    /// Returns the entry kind.
    #[must_use]
    pub const fn kind(&self) -> ProfileKind {
        match self {
            Self::Node(_) => ProfileKind::Node,
            Self::Function(_) => ProfileKind::Function,
            Self::Block(_) => ProfileKind::Block,
        }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => write!(f, "node:{node}"),
            Self::Function(name) => write!(f, "fn:{name}"),
            Self::Block(name) => write!(f, "block:{name}"),
        }
    }
}

/// Entry kind label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Tree node.
    Node,
    /// Expression function.
    Function,
    /// Named block.
    Block,
}

// ============================================================================
// SECTION: Entries
// ============================================================================

/// Aggregated timing for one id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    /// Entry identifier.
    id: ProfileId,
    /// Completed and in-flight begins.
    call_count: u64,
    /// Sum of completed call durations.
    total: Duration,
    /// Shortest completed call.
    min: Option<Duration>,
    /// Longest completed call.
    max: Duration,
    /// Completed outermost calls; recursive re-entries are not counted.
    spans: u64,
    /// Start of the in-flight call, if active.
    active_since: Option<Duration>,
    /// Call-stack depth at the last begin.
    depth: usize,
    /// Callees in discovery order, each at most once.
    children: Vec<ProfileId>,
}

impl ProfileEntry {
    /// Creates an empty entry.
    const fn new(id: ProfileId) -> Self {
        Self {
            id,
            call_count: 0,
            total: Duration::ZERO,
            min: None,
            max: Duration::ZERO,
            spans: 0,
            active_since: None,
            depth: 0,
            children: Vec::new(),
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> &ProfileId {
        &self.id
    }

    /// Returns the number of begins.
    #[must_use]
    pub const fn call_count(&self) -> u64 {
        self.call_count
    }

    /// Returns the summed duration of completed calls.
    #[must_use]
    pub const fn total(&self) -> Duration {
        self.total
    }

    /// Returns the shortest completed call (zero before any completes).
    #[must_use]
    pub fn min(&self) -> Duration {
        self.min.unwrap_or_default()
    }

    /// Returns the longest completed call.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Returns the number of completed outermost calls.
    #[must_use]
    pub const fn spans(&self) -> u64 {
        self.spans
    }

    /// Returns the mean duration of completed outermost calls.
    #[must_use]
    pub fn average(&self) -> Duration {
        u32::try_from(self.spans)
            .ok()
            .and_then(|calls| self.total.checked_div(calls))
            .unwrap_or_default()
    }

    /// Returns whether a call is in flight.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active_since.is_some()
    }

    /// Returns the call-stack depth at the last begin.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns callee ids in discovery order.
    #[must_use]
    pub fn children(&self) -> &[ProfileId] {
        &self.children
    }
}

// ============================================================================
// SECTION: Memory
// ============================================================================

/// Allocation summary since memory tracking was enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySummary {
    /// Bytes allocated.
    pub allocated: u64,
    /// Bytes freed.
    pub freed: u64,
    /// Highest sampled live-byte count.
    pub peak: u64,
    /// Allocated minus freed.
    pub net: i64,
}

/// Probe readings captured when tracking starts.
#[derive(Debug, Clone, Copy, Default)]
struct MemoryBaseline {
    /// Allocated counter at start.
    allocated: u64,
    /// Freed counter at start.
    freed: u64,
    /// Highest live-byte sample.
    peak: u64,
}

// ============================================================================
// SECTION: Report Views
// ============================================================================

/// JSON shape of an entry.
#[derive(Debug, Serialize)]
struct EntryView {
    /// Rendered id.
    id: String,
    /// Entry kind.
    kind: ProfileKind,
    /// Begin count.
    calls: u64,
    /// Total microseconds.
    total_us: u64,
    /// Mean microseconds.
    avg_us: u64,
    /// Minimum microseconds.
    min_us: u64,
    /// Maximum microseconds.
    max_us: u64,
    /// Share of total time.
    percent: f64,
    /// Depth at last begin.
    depth: usize,
    /// Rendered child ids.
    children: Vec<String>,
}

/// JSON shape of the report.
#[derive(Debug, Serialize)]
struct ReportView {
    /// Completed runs.
    runs: u64,
    /// Summed run time in microseconds.
    total_time_us: u64,
    /// Allocation summary when tracking is on.
    memory: Option<MemorySummary>,
    /// Entries sorted by total time.
    entries: Vec<EntryView>,
}

// ============================================================================
// SECTION: Profiler
// ============================================================================

/// Hierarchical profiler.
///
/// # Invariants
/// - Every id on the call stack refers to an active entry.
/// - An entry is active while at least one of its calls is on the stack.
#[derive(Clone)]
pub struct Profiler {
    /// Entries keyed by id.
    entries: BTreeMap<ProfileId, ProfileEntry>,
    /// Active entries, innermost last.
    stack: Vec<ProfileId>,
    /// Time source.
    clock: SharedClock,
    /// Allocation source.
    probe: SharedProbe,
    /// Memory baseline when tracking is on.
    memory: Option<MemoryBaseline>,
    /// Completed runs.
    runs: u64,
    /// Summed duration of completed runs.
    run_time: Duration,
    /// Start of the in-flight run.
    run_started: Option<Duration>,
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("entries", &self.entries.len())
            .field("stack", &self.stack)
            .field("memory", &self.memory)
            .field("runs", &self.runs)
            .field("run_time", &self.run_time)
            .finish_non_exhaustive()
    }
}

impl Profiler {
    /// Creates a profiler reading `clock` and `probe`.
    #[must_use]
    pub fn new(clock: SharedClock, probe: SharedProbe) -> Self {
        Self {
            entries: BTreeMap::new(),
            stack: Vec::new(),
            clock,
            probe,
            memory: None,
            runs: 0,
            run_time: Duration::ZERO,
            run_started: None,
        }
    }

    /// Turns memory tracking on (capturing a fresh baseline) or off.
    pub fn set_memory_tracking(&mut self, enabled: bool) {
        self.memory = enabled.then(|| MemoryBaseline {
            allocated: self.probe.allocated_bytes(),
            freed: self.probe.freed_bytes(),
            peak: self.probe.live_bytes(),
        });
    }

    /// Returns whether memory tracking is on.
    #[must_use]
    pub const fn is_tracking_memory(&self) -> bool {
        self.memory.is_some()
    }

    /// Starts a call of `id`.
    ///
    /// A recursive begin of an already active id counts a call but extends
    /// the outermost timing instead of restarting it.
    pub fn begin(&mut self, id: ProfileId) {
        let now = self.clock.elapsed();
        let depth = self.stack.len();
        if let Some(caller) = self.stack.last()
            && *caller != id
            && let Some(parent) = self.entries.get_mut(caller)
            && !parent.children.contains(&id)
        {
            parent.children.push(id.clone());
        }
        let entry = self.entries.entry(id.clone()).or_insert_with(|| ProfileEntry::new(id.clone()));
        entry.call_count = entry.call_count.saturating_add(1);
        if entry.active_since.is_none() {
            entry.active_since = Some(now);
        }
        entry.depth = depth;
        self.stack.push(id);
        self.sample_memory();
    }

    /// Ends the in-flight call of `id`; unmatched ends are ignored.
    pub fn end(&mut self, id: &ProfileId) {
        let now = self.clock.elapsed();
        let Some(position) = self.stack.iter().rposition(|active| active == id) else {
            return;
        };
        self.stack.remove(position);
        self.sample_memory();
        if self.stack.contains(id) {
            return;
        }
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        let Some(started) = entry.active_since.take() else {
            return;
        };
        let elapsed = now.saturating_sub(started);
        entry.total = entry.total.saturating_add(elapsed);
        entry.min = Some(entry.min.map_or(elapsed, |min| min.min(elapsed)));
        entry.max = entry.max.max(elapsed);
        entry.spans = entry.spans.saturating_add(1);
    }

    /// Starts timing a node.
    pub fn begin_node(&mut self, node: NodeId) {
        self.begin(ProfileId::Node(node));
    }

    /// Ends timing a node.
    pub fn end_node(&mut self, node: NodeId) {
        self.end(&ProfileId::Node(node));
    }

    /// Starts timing a function call.
    pub fn begin_function(&mut self, name: &str) {
        self.begin(ProfileId::Function(name.to_string()));
    }

    /// Ends timing a function call.
    pub fn end_function(&mut self, name: &str) {
        self.end(&ProfileId::Function(name.to_string()));
    }

    /// Marks the start of an evaluation run.
    pub fn start_run(&mut self) {
        self.run_started = Some(self.clock.elapsed());
    }

    /// Marks the end of the in-flight run; ignored when none is in flight.
    pub fn finish_run(&mut self) {
        if let Some(started) = self.run_started.take() {
            self.runs = self.runs.saturating_add(1);
            self.run_time = self.run_time.saturating_add(self.clock.elapsed().saturating_sub(started));
        }
    }

    /// Abandons the in-flight run and any active entries without recording them.
    pub fn cancel_run(&mut self) {
        self.run_started = None;
        for id in self.stack.drain(..) {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.active_since = None;
            }
        }
    }

    /// Samples live bytes into the peak.
    fn sample_memory(&mut self) {
        if let Some(memory) = &mut self.memory {
            memory.peak = memory.peak.max(self.probe.live_bytes());
        }
    }

    /// Returns an entry by id.
    #[must_use]
    pub fn entry(&self, id: &ProfileId) -> Option<&ProfileEntry> {
        self.entries.get(id)
    }

    /// Returns the active entry, if any.
    #[must_use]
    pub fn current(&self) -> Option<&ProfileId> {
        self.stack.last()
    }

    /// Returns entries sorted by total time, longest first.
    #[must_use]
    pub fn entries_by_total(&self) -> Vec<&ProfileEntry> {
        let mut entries: Vec<&ProfileEntry> = self.entries.values().collect();
        entries.sort_by(|left, right| right.total.cmp(&left.total).then_with(|| left.id.cmp(&right.id)));
        entries
    }

    /// Returns the number of completed runs.
    #[must_use]
    pub const fn runs(&self) -> u64 {
        self.runs
    }

    /// Returns the summed duration of completed runs.
    #[must_use]
    pub const fn total_run_time(&self) -> Duration {
        self.run_time
    }

    /// Returns the allocation summary when tracking is on.
    #[must_use]
    pub fn memory_summary(&self) -> Option<MemorySummary> {
        let baseline = self.memory?;
        let allocated = self.probe.allocated_bytes().saturating_sub(baseline.allocated);
        let freed = self.probe.freed_bytes().saturating_sub(baseline.freed);
        let net = i64::try_from(allocated)
            .unwrap_or(i64::MAX)
            .saturating_sub(i64::try_from(freed).unwrap_or(i64::MAX));
        Some(MemorySummary {
            allocated,
            freed,
            peak: baseline.peak.max(self.probe.live_bytes()),
            net,
        })
    }

    /// Drops all entries, runs, and the call stack; memory tracking restarts
    /// from the current probe readings when on.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.stack.clear();
        self.runs = 0;
        self.run_time = Duration::ZERO;
        self.run_started = None;
        if self.memory.is_some() {
            self.set_memory_tracking(true);
        }
    }

    /// Returns the time percentages are computed against: completed run time,
    /// or the summed time of top-level entries when no run completed.
    fn reference_time(&self) -> Duration {
        if self.run_time > Duration::ZERO {
            return self.run_time;
        }
        self.entries
            .values()
            .filter(|entry| entry.depth == 0)
            .fold(Duration::ZERO, |sum, entry| sum.saturating_add(entry.total))
    }

    /// Renders the top `limit` entries with the summary block.
    #[must_use]
    pub fn render_report(&self, limit: usize) -> String {
        let reference = self.reference_time();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<15} {:>6} {:>10} {:>8} {:>8} {:>8} {:>6}",
            "ID", "Calls", "Total(ms)", "Avg(ms)", "Min(ms)", "Max(ms)", "%"
        );
        for entry in self.entries_by_total().into_iter().take(limit) {
            let _ = writeln!(
                out,
                "{:<15} {:>6} {:>10.3} {:>8.3} {:>8.3} {:>8.3} {:>6.1}",
                entry.id.to_string(),
                entry.call_count,
                millis(entry.total),
                millis(entry.average()),
                millis(entry.min()),
                millis(entry.max),
                percent(entry.total, reference)
            );
        }
        let _ = writeln!(out, "Runs: {}", self.runs);
        let _ = writeln!(out, "Total time: {:.3} ms", millis(self.run_time));
        let average = u32::try_from(self.runs)
            .ok()
            .and_then(|runs| self.run_time.checked_div(runs))
            .unwrap_or_default();
        let _ = writeln!(out, "Average run: {:.3} ms", millis(average));
        if let Some(memory) = self.memory_summary() {
            let _ = writeln!(out, "Allocated: {} bytes", memory.allocated);
            let _ = writeln!(out, "Freed: {} bytes", memory.freed);
            let _ = writeln!(out, "Peak: {} bytes", memory.peak);
            let _ = writeln!(out, "Net: {} bytes", memory.net);
        }
        out
    }

    /// Renders the JSON report with every entry and its child ids.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let reference = self.reference_time();
        let report = ReportView {
            runs: self.runs,
            total_time_us: micros(self.run_time),
            memory: self.memory_summary(),
            entries: self
                .entries_by_total()
                .into_iter()
                .map(|entry| EntryView {
                    id: entry.id.to_string(),
                    kind: entry.id.kind(),
                    calls: entry.call_count,
                    total_us: micros(entry.total),
                    avg_us: micros(entry.average()),
                    min_us: micros(entry.min()),
                    max_us: micros(entry.max),
                    percent: percent(entry.total, reference),
                    depth: entry.depth,
                    children: entry.children.iter().map(ToString::to_string).collect(),
                })
                .collect(),
        };
        serde_json::to_value(report).unwrap_or(serde_json::Value::Null)
    }
}

/// Converts a duration to fractional milliseconds.
fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Converts a duration to whole microseconds.
fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Returns `part` as a percentage of `whole` (0 when `whole` is zero).
fn percent(part: Duration, whole: Duration) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    part.as_secs_f64() / whole.as_secs_f64() * 100.0
}
