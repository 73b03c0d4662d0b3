// crates/arbor-debug/src/debugger.rs
// ============================================================================
// Module: Debugger Core
// Description: Run-state machine composing breakpoints, watches, and instruments.
// Purpose: Drive a stepping walk and answer operator commands.
// Dependencies: arbor-core, serde_json, crate::{breakpoint, command, coverage, history, profiler, sink, watch}
// ============================================================================

//! ## Overview
//! A [`Debugger`] owns one [`Runtime`], an optional loaded [`DecisionTree`],
//! the walk in progress, and every debugging subsystem. Execution moves
//! through [`DebuggerState`]: `Idle`, `Running`, then one of `Paused` (before
//! a node with a triggered breakpoint), `Stepping` (after a step or next), or
//! `Completed`.
//!
//! Every executed node updates coverage, history, and the profiler, then
//! watches are re-checked. Breakpoints are consulted before a node executes;
//! the node a halted walk is positioned at is not re-checked when resuming.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use arbor_core::CallObserver;
use arbor_core::DecisionTree;
use arbor_core::EvalError;
use arbor_core::Node;
use arbor_core::NodeId;
use arbor_core::NodeKind;
use arbor_core::Runtime;
use arbor_core::RuntimeOption;
use arbor_core::SharedClock;
use arbor_core::Value;
use arbor_core::WalkObserver;
use arbor_core::Walker;
use arbor_core::parse_expression;

use crate::breakpoint::BreakpointId;
use crate::breakpoint::BreakpointManager;
use crate::command::Command;
use crate::command::CommandError;
use crate::command::DebuggerError;
use crate::command::HELP_TEXT;
use crate::command::InfoTopic;
use crate::command::ReportFormat;
use crate::coverage::CoverageData;
use crate::history::DecisionHistory;
use crate::history::render_records;
use crate::profiler::DEFAULT_REPORT_LIMIT;
use crate::profiler::Profiler;
use crate::sink::ExplanationSink;
use crate::sink::NoopExplanationSink;
use crate::sink::NoopTraceSink;
use crate::sink::TraceEvent;
use crate::sink::TraceSink;
use crate::watch::WatchChange;
use crate::watch::WatchTracker;

// ============================================================================
// SECTION: Settings and State
// ============================================================================

/// Debugger session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggerSettings {
    /// Record decisions into the history.
    pub history_enabled: bool,
    /// Maximum retained history records.
    pub history_capacity: Option<usize>,
    /// Sample the memory probe in the profiler.
    pub memory_tracking: bool,
    /// Entries shown by the profiler text report.
    pub report_limit: usize,
    /// Pause at the root before it executes on `run`.
    pub break_on_entry: bool,
}

impl Default for DebuggerSettings {
    fn default() -> Self {
        Self {
            history_enabled: true,
            history_capacity: None,
            memory_tracking: false,
            report_limit: DEFAULT_REPORT_LIMIT,
            break_on_entry: false,
        }
    }
}

/// Why a walk paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// A breakpoint triggered.
    Breakpoint(BreakpointId),
    /// `break_on_entry` stopped at the root.
    Entry,
}

/// Debugger run state.
#[derive(Debug, Clone, PartialEq)]
pub enum DebuggerState {
    /// No walk in progress.
    Idle,
    /// A walk is executing.
    Running,
    /// Halted before `node` executes.
    Paused {
        /// Next node to execute.
        node: NodeId,
        /// Why execution halted.
        reason: PauseReason,
    },
    /// Halted after a step; the payload is the next node to execute.
    Stepping(NodeId),
    /// The walk finished with this result.
    Completed(Value),
}

impl DebuggerState {
    /// Returns whether a walk is halted and can resume.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        matches!(self, Self::Paused { .. } | Self::Stepping(_))
    }
}

impl fmt::Display for DebuggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running => f.write_str("running"),
            Self::Paused {
                node,
                reason: PauseReason::Breakpoint(id),
            } => write!(f, "paused at node {node} (breakpoint {id})"),
            Self::Paused {
                node,
                reason: PauseReason::Entry,
            } => write!(f, "paused at node {node} (entry)"),
            Self::Stepping(node) => write!(f, "stopped before node {node}"),
            Self::Completed(value) => write!(f, "completed: {value}"),
        }
    }
}

/// Outcome of a run, step, next, continue, or quit.
#[derive(Debug, Clone, PartialEq)]
pub struct StopReport {
    /// State after the operation.
    pub state: DebuggerState,
    /// Watches whose observation changed while executing.
    pub watch_changes: Vec<WatchChange>,
    /// Most recently executed node.
    pub last_node: Option<NodeId>,
}

impl fmt::Display for StopReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_node {
            Some(node) => write!(f, "[node {node}] {}", self.state)?,
            None => write!(f, "{}", self.state)?,
        }
        for change in &self.watch_changes {
            write!(f, "\n{change}")?;
        }
        Ok(())
    }
}

/// Result of executing a command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// Text for the operator.
    pub text: String,
    /// Stop report for execution commands.
    pub report: Option<StopReport>,
    /// Whether the session should end.
    pub quit: bool,
}

impl CommandOutput {
    /// Creates a text-only output.
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            report: None,
            quit: false,
        }
    }

    /// Creates an output carrying a stop report.
    fn stopped(report: StopReport) -> Self {
        Self {
            text: report.to_string(),
            report: Some(report),
            quit: false,
        }
    }
}

/// How far execution proceeds before halting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// One node.
    Step,
    /// The current node and its subtree.
    Next,
    /// Until a breakpoint or completion.
    Continue,
}

// ============================================================================
// SECTION: Instruments
// ============================================================================

/// Walk observer feeding coverage, history, profiler, and sinks.
struct Instruments {
    /// Coverage of the loaded tree.
    coverage: CoverageData,
    /// Decision history.
    history: DecisionHistory,
    /// Profiler.
    profiler: Profiler,
    /// Trace destination.
    trace: Arc<dyn TraceSink>,
    /// Explanation destination.
    explanations: Arc<dyn ExplanationSink>,
    /// Clock for trace timestamps.
    clock: SharedClock,
    /// Mirrors the runtime `tracing` option.
    tracing: bool,
    /// Mirrors the runtime `explanations` option.
    explaining: bool,
}

impl Instruments {
    /// Picks up the runtime's tracing and explanation options.
    const fn refresh(&mut self, runtime: &Runtime) {
        self.tracing = runtime.config().tracing;
        self.explaining = runtime.config().explanations;
    }

    /// Emits a trace event when tracing is on.
    fn emit(&self, event: &'static str, build: impl FnOnce(TraceEvent) -> TraceEvent) {
        if self.tracing {
            self.trace.record(&build(TraceEvent::new(event, self.clock.unix_time())));
        }
    }
}

impl CallObserver for Instruments {
    fn on_call_start(&mut self, name: &str) {
        self.profiler.begin_function(name);
    }

    fn on_call_end(&mut self, name: &str) {
        self.profiler.end_function(name);
    }
}

impl WalkObserver for Instruments {
    fn on_enter(&mut self, _tree: &DecisionTree, node: NodeId) {
        self.profiler.begin_node(node);
        self.coverage.record_node(node);
        self.emit("node_enter", |event| event.with_node(node));
    }

    fn on_decision(&mut self, tree: &DecisionTree, node: NodeId, value: &Value, elapsed: Duration) {
        let description = tree.get(node).map(describe);
        self.history.record_decision(tree, node, value, elapsed, description.as_deref());
        self.emit("decision", |event| event.with_node(node).with_value(value.clone()));
        if self.explaining {
            let what = description.unwrap_or_else(|| "unknown node".to_string());
            self.explanations.explain(&format!("node {node} ({what}) decided {value}"));
        }
    }

    fn on_branch(&mut self, from: NodeId, to: NodeId) {
        self.coverage.record_branch(from, to);
        self.emit("branch", |event| event.with_node(from).with_detail(format!("{from}->{to}")));
    }

    fn on_exit(&mut self, _tree: &DecisionTree, node: NodeId) {
        self.profiler.end_node(node);
        self.emit("node_exit", |event| event.with_node(node));
    }
}

/// Describes a node for history and explanations.
fn describe(node: &Node) -> String {
    if let Some(label) = node.label() {
        return label.to_string();
    }
    match node.kind() {
        NodeKind::Condition(expr) => format!("if {expr}"),
        NodeKind::Action(spec) => format!("{} {}", spec.kind, spec.target),
        NodeKind::Outcome(expr) => format!("return {expr}"),
    }
}

// ============================================================================
// SECTION: Debugger
// ============================================================================

/// Interactive decision-tree debugger.
///
/// # Invariants
/// - `walker` is `Some` exactly while the state is `Running`, `Paused`, or
///   `Stepping`.
pub struct Debugger {
    /// Runtime environment shared by the tree and commands.
    runtime: Runtime,
    /// Loaded tree.
    tree: Option<DecisionTree>,
    /// Walk in progress.
    walker: Option<Walker>,
    /// Current state.
    state: DebuggerState,
    /// Most recently executed node.
    last_node: Option<NodeId>,
    /// Session settings.
    settings: DebuggerSettings,
    /// Breakpoints.
    breakpoints: BreakpointManager,
    /// Watch expressions.
    watches: WatchTracker,
    /// Coverage, history, profiler, and sinks.
    instruments: Instruments,
}

impl fmt::Debug for Debugger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debugger")
            .field("state", &self.state)
            .field("last_node", &self.last_node)
            .field("settings", &self.settings)
            .field("breakpoints", &self.breakpoints.len())
            .field("watches", &self.watches.len())
            .finish_non_exhaustive()
    }
}

impl Debugger {
    /// Creates a debugger around `runtime`, reading its clock and memory probe.
    #[must_use]
    pub fn new(runtime: Runtime, settings: DebuggerSettings) -> Self {
        let clock = runtime.clock();
        let mut profiler = Profiler::new(clock.clone(), runtime.probe());
        profiler.set_memory_tracking(settings.memory_tracking);
        let mut history = DecisionHistory::new(clock.clone()).with_capacity(settings.history_capacity);
        history.set_enabled(settings.history_enabled);
        let mut instruments = Instruments {
            coverage: CoverageData::from_tree(&DecisionTree::new(), clock.clone()),
            history,
            profiler,
            trace: Arc::new(NoopTraceSink),
            explanations: Arc::new(NoopExplanationSink),
            clock,
            tracing: false,
            explaining: false,
        };
        instruments.refresh(&runtime);
        Self {
            runtime,
            tree: None,
            walker: None,
            state: DebuggerState::Idle,
            last_node: None,
            settings,
            breakpoints: BreakpointManager::new(),
            watches: WatchTracker::new(),
            instruments,
        }
    }

    /// Routes trace events to `sink`.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.instruments.trace = sink;
        self
    }

    /// Routes decision explanations to `sink`.
    #[must_use]
    pub fn with_explanation_sink(mut self, sink: Arc<dyn ExplanationSink>) -> Self {
        self.instruments.explanations = sink;
        self
    }

    /// Installs a tree, rebuilds coverage for it, and discards any walk.
    pub fn load(&mut self, tree: DecisionTree) {
        self.instruments.coverage = CoverageData::from_tree(&tree, self.instruments.clock.clone());
        self.instruments.profiler.cancel_run();
        self.tree = Some(tree);
        self.walker = None;
        self.last_node = None;
        self.state = DebuggerState::Idle;
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> &DebuggerState {
        &self.state
    }

    /// Returns the session settings.
    #[must_use]
    pub const fn settings(&self) -> &DebuggerSettings {
        &self.settings
    }

    /// Returns the runtime.
    #[must_use]
    pub const fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Returns the runtime for host setup.
    pub const fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Returns the loaded tree.
    #[must_use]
    pub const fn tree(&self) -> Option<&DecisionTree> {
        self.tree.as_ref()
    }

    /// Returns the breakpoint manager.
    #[must_use]
    pub const fn breakpoints(&self) -> &BreakpointManager {
        &self.breakpoints
    }

    /// Returns the breakpoint manager for direct edits.
    pub const fn breakpoints_mut(&mut self) -> &mut BreakpointManager {
        &mut self.breakpoints
    }

    /// Returns the watch tracker.
    #[must_use]
    pub const fn watches(&self) -> &WatchTracker {
        &self.watches
    }

    /// Returns the watch tracker for direct edits.
    pub const fn watches_mut(&mut self) -> &mut WatchTracker {
        &mut self.watches
    }

    /// Returns coverage of the loaded tree.
    #[must_use]
    pub const fn coverage(&self) -> &CoverageData {
        &self.instruments.coverage
    }

    /// Returns the decision history.
    #[must_use]
    pub const fn history(&self) -> &DecisionHistory {
        &self.instruments.history
    }

    /// Returns the profiler.
    #[must_use]
    pub const fn profiler(&self) -> &Profiler {
        &self.instruments.profiler
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    /// Starts a fresh walk from the root and continues it.
    ///
    /// # Errors
    ///
    /// Returns [`DebuggerError::NoTree`] without a loaded tree, or
    /// [`DebuggerError::Eval`] when a node fails (the session returns to idle).
    pub fn run(&mut self) -> Result<StopReport, DebuggerError> {
        self.start_walk()?;
        if self.settings.break_on_entry
            && let Some(root) = self.tree.as_ref().and_then(DecisionTree::root)
        {
            self.state = DebuggerState::Paused {
                node: root,
                reason: PauseReason::Entry,
            };
            self.instruments.emit("pause", |event| event.with_node(root).with_detail("entry"));
            return Ok(self.report(Vec::new()));
        }
        self.advance(Mode::Continue, false)
    }

    /// Executes exactly one node, starting a walk when none is in progress.
    ///
    /// # Errors
    ///
    /// Same as [`Debugger::run`].
    pub fn step(&mut self) -> Result<StopReport, DebuggerError> {
        self.ensure_walk()?;
        self.advance(Mode::Step, true)
    }

    /// Executes the current node and its whole subtree, stopping early at
    /// breakpoints. Starts a walk when none is in progress.
    ///
    /// # Errors
    ///
    /// Same as [`Debugger::run`].
    pub fn step_over(&mut self) -> Result<StopReport, DebuggerError> {
        self.ensure_walk()?;
        self.advance(Mode::Next, true)
    }

    /// Resumes a halted walk until a breakpoint or completion.
    ///
    /// # Errors
    ///
    /// Returns [`DebuggerError::NotRunning`] when no walk is halted, or
    /// [`DebuggerError::Eval`] when a node fails.
    pub fn continue_(&mut self) -> Result<StopReport, DebuggerError> {
        if !self.state.is_halted() {
            return Err(DebuggerError::NotRunning);
        }
        self.advance(Mode::Continue, true)
    }

    /// Abandons any walk and returns to idle.
    pub fn quit(&mut self) -> StopReport {
        if self.walker.take().is_some() {
            self.instruments.profiler.cancel_run();
        }
        self.state = DebuggerState::Idle;
        self.report(Vec::new())
    }

    /// Creates a walker at the root and starts a profiler run.
    fn start_walk(&mut self) -> Result<(), DebuggerError> {
        let tree = self.tree.as_ref().ok_or(DebuggerError::NoTree)?;
        if self.walker.is_some() {
            self.instruments.profiler.cancel_run();
        }
        self.walker = Some(Walker::new(tree));
        self.instruments.refresh(&self.runtime);
        self.instruments.profiler.start_run();
        self.state = DebuggerState::Running;
        Ok(())
    }

    /// Starts a walk unless one is halted.
    fn ensure_walk(&mut self) -> Result<(), DebuggerError> {
        if self.state.is_halted() { Ok(()) } else { self.start_walk() }
    }

    /// Executes nodes until `mode` is satisfied, a breakpoint triggers, or the
    /// walk completes. `resuming` skips the breakpoint check for the node the
    /// walk is already halted at.
    fn advance(&mut self, mode: Mode, resuming: bool) -> Result<StopReport, DebuggerError> {
        let tree = self.tree.as_mut().ok_or(DebuggerError::NoTree)?;
        let walker = self.walker.as_mut().ok_or(DebuggerError::NotRunning)?;
        self.instruments.refresh(&self.runtime);
        self.state = DebuggerState::Running;
        let start_depth = walker.open_nodes();
        let mut changes = Vec::new();
        let mut skip_check = resuming;

        let outcome: Result<DebuggerState, EvalError> = loop {
            let Some(node) = walker.next_node() else {
                let value = walker.result().cloned().unwrap_or_default();
                self.instruments.profiler.finish_run();
                self.instruments.emit("complete", |event| event.with_value(value.clone()));
                break Ok(DebuggerState::Completed(value));
            };
            if !skip_check && let Some(id) = self.breakpoints.should_break(node, &mut self.runtime) {
                self.instruments
                    .emit("pause", |event| event.with_node(node).with_detail(format!("breakpoint {id}")));
                break Ok(DebuggerState::Paused {
                    node,
                    reason: PauseReason::Breakpoint(id),
                });
            }
            skip_check = false;
            match walker.step(tree, &mut self.runtime, &mut self.instruments) {
                Ok(executed) => self.last_node = executed.or(self.last_node),
                Err(error) => break Err(error),
            }
            changes.extend(self.watches.check(&mut self.runtime));
            let Some(next) = walker.next_node() else {
                continue;
            };
            let halt = match mode {
                Mode::Step => true,
                Mode::Next => walker.open_nodes() <= start_depth,
                Mode::Continue => false,
            };
            if halt {
                break Ok(DebuggerState::Stepping(next));
            }
        };

        match outcome {
            Ok(state) => {
                if matches!(state, DebuggerState::Completed(_)) {
                    self.walker = None;
                }
                self.state = state;
                Ok(self.report(changes))
            }
            Err(error) => {
                self.walker = None;
                self.instruments.profiler.cancel_run();
                self.state = DebuggerState::Idle;
                Err(DebuggerError::Eval(error))
            }
        }
    }

    /// Builds a stop report for the current state.
    fn report(&self, watch_changes: Vec<WatchChange>) -> StopReport {
        StopReport {
            state: self.state.clone(),
            watch_changes,
            last_node: self.last_node,
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Parses and executes one command line.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the line does not parse or the command fails.
    pub fn execute_line(&mut self, line: &str) -> Result<CommandOutput, CommandError> {
        let command: Command = line.parse()?;
        self.execute(command)
    }

    /// Executes a command.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for unknown ids, invalid expressions, runtime
    /// failures, or session state errors.
    pub fn execute(&mut self, command: Command) -> Result<CommandOutput, CommandError> {
        match command {
            Command::Run => Ok(CommandOutput::stopped(self.run()?)),
            Command::Step => Ok(CommandOutput::stopped(self.step()?)),
            Command::Next => Ok(CommandOutput::stopped(self.step_over()?)),
            Command::Continue => Ok(CommandOutput::stopped(self.continue_()?)),
            Command::Break {
                node,
                condition,
                temporary,
            } => {
                if let Some(tree) = &self.tree
                    && !tree.contains(node)
                {
                    return Err(CommandError::UnknownNode(node));
                }
                let id = self.breakpoints.add(node, condition.as_deref(), temporary)?;
                let kind = if temporary { "Temporary breakpoint" } else { "Breakpoint" };
                Ok(CommandOutput::text(format!("{kind} {id} at node {node}")))
            }
            Command::Delete(id) => {
                if !self.breakpoints.remove(id) {
                    return Err(CommandError::UnknownBreakpoint(id));
                }
                Ok(CommandOutput::text(format!("Deleted breakpoint {id}")))
            }
            Command::Enable(id) => {
                if !self.breakpoints.enable(id) {
                    return Err(CommandError::UnknownBreakpoint(id));
                }
                Ok(CommandOutput::text(format!("Enabled breakpoint {id}")))
            }
            Command::Disable(id) => {
                if !self.breakpoints.disable(id) {
                    return Err(CommandError::UnknownBreakpoint(id));
                }
                Ok(CommandOutput::text(format!("Disabled breakpoint {id}")))
            }
            Command::Condition {
                id,
                condition,
            } => {
                if !self.breakpoints.set_condition(id, condition.as_deref())? {
                    return Err(CommandError::UnknownBreakpoint(id));
                }
                Ok(CommandOutput::text(match condition {
                    Some(condition) => format!("Breakpoint {id} condition: {condition}"),
                    None => format!("Breakpoint {id} is now unconditional"),
                }))
            }
            Command::Limit {
                id,
                limit,
            } => {
                if !self.breakpoints.set_hit_limit(id, limit) {
                    return Err(CommandError::UnknownBreakpoint(id));
                }
                Ok(CommandOutput::text(format!("Breakpoint {id} hit limit: {limit}")))
            }
            Command::Info(InfoTopic::Breakpoints) => {
                Ok(CommandOutput::text(self.breakpoints.render_table()))
            }
            Command::Info(InfoTopic::Watches) => {
                Ok(CommandOutput::text(self.watches.render(&mut self.runtime)))
            }
            Command::Info(InfoTopic::Stats) => Ok(CommandOutput::text(self.render_stats())),
            Command::Watch(source) => {
                let id = self.watches.add(&source)?;
                Ok(CommandOutput::text(format!("Watch {id}: {}", source.trim())))
            }
            Command::Unwatch(id) => {
                if !self.watches.remove(id) {
                    return Err(CommandError::UnknownWatch(id));
                }
                Ok(CommandOutput::text(format!("Removed watch {id}")))
            }
            Command::Print(source) => {
                let value = parse_expression(&source)?.evaluate(&mut self.runtime)?;
                Ok(CommandOutput::text(value.to_string()))
            }
            Command::Set {
                option,
                value,
            } => {
                self.runtime.set_option(option, value)?;
                self.instruments.refresh(&self.runtime);
                Ok(CommandOutput::text(format!("{option} = {value}")))
            }
            Command::Let {
                name,
                expr,
            } => {
                let value = parse_expression(&expr)?.evaluate(&mut self.runtime)?;
                self.runtime.set_variable(&name, value.clone())?;
                Ok(CommandOutput::text(format!("{name} = {value}")))
            }
            Command::Coverage(ReportFormat::Text) => {
                Ok(CommandOutput::text(self.instruments.coverage.render_text()))
            }
            Command::Coverage(ReportFormat::Json) => {
                Ok(CommandOutput::text(pretty(&self.instruments.coverage.to_json())))
            }
            Command::History(ReportFormat::Text) => {
                Ok(CommandOutput::text(self.instruments.history.render_table()))
            }
            Command::History(ReportFormat::Json) => {
                Ok(CommandOutput::text(pretty(&self.instruments.history.to_json())))
            }
            Command::Path(index) => {
                let path = self.instruments.history.get_path(index);
                if path.is_empty() {
                    return Err(CommandError::UnknownRecord(index));
                }
                Ok(CommandOutput::text(render_records(path.into_iter())))
            }
            Command::Profile(ReportFormat::Text) => Ok(CommandOutput::text(
                self.instruments.profiler.render_report(self.settings.report_limit),
            )),
            Command::Profile(ReportFormat::Json) => {
                Ok(CommandOutput::text(pretty(&self.instruments.profiler.to_json())))
            }
            Command::Reset => {
                self.instruments.coverage.reset();
                self.instruments.history.clear();
                self.instruments.profiler.reset();
                Ok(CommandOutput::text("Coverage, history, and profiler data reset"))
            }
            Command::Help => Ok(CommandOutput::text(HELP_TEXT)),
            Command::Quit => {
                let report = self.quit();
                Ok(CommandOutput {
                    text: String::new(),
                    report: Some(report),
                    quit: true,
                })
            }
        }
    }

    /// Renders runtime statistics and options.
    fn render_stats(&self) -> String {
        let stats = self.runtime.stats();
        let mut out = String::new();
        let _ = writeln!(out, "State: {}", self.state);
        let _ = writeln!(out, "Variables set: {}", stats.variables_set);
        let _ = writeln!(out, "Variables read: {}", stats.variables_read);
        let _ = writeln!(out, "Functions called: {}", stats.functions_called);
        let _ = writeln!(out, "Consequences executed: {}", stats.consequences_executed);
        let _ = writeln!(out, "Consequences failed: {}", stats.consequences_failed);
        let _ = writeln!(out, "Errors: {}", stats.errors);
        let _ = writeln!(out, "Max recursion reached: {}", stats.max_recursion_reached);
        let _ = writeln!(out, "Scope depth: {}", stats.scope_depth);
        let _ = writeln!(out, "GC runs: {} ({} bytes freed)", stats.gc_runs, stats.bytes_freed_total);
        let _ = writeln!(out, "Uptime: {} ms", stats.uptime_ms);
        if let Some(error) = self.runtime.last_error() {
            let _ = writeln!(out, "Last error [{}]: {error}", error.code());
        }
        for option in RuntimeOption::ALL {
            let _ = writeln!(out, "{option}: {}", self.runtime.option(option));
        }
        out
    }
}

/// Pretty-prints a JSON report.
fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
