// crates/arbor-debug/src/lib.rs
// ============================================================================
// Module: Arbor Debug Library
// Description: Debugging subsystems and the debugger core for Arbor trees.
// Purpose: Expose breakpoints, watches, coverage, history, profiling, and sinks.
// Dependencies: arbor-core, serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! Arbor debug layers an interactive debugger over the stepping walker in
//! `arbor-core`. Each subsystem is usable on its own; [`Debugger`] composes
//! them behind a closed [`Command`] set. Subsystem operations never fail on
//! bad input: unknown ids and unmatched calls degrade to no-ops or `None`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod breakpoint;
pub mod command;
pub mod coverage;
pub mod debugger;
pub mod history;
pub mod profiler;
pub mod sink;
pub mod watch;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use breakpoint::BreakCondition;
pub use breakpoint::Breakpoint;
pub use breakpoint::BreakpointId;
pub use breakpoint::BreakpointManager;
pub use command::Command;
pub use command::CommandError;
pub use command::DebuggerError;
pub use command::HELP_TEXT;
pub use command::InfoTopic;
pub use command::ReportFormat;
pub use coverage::BranchCoverage;
pub use coverage::CoverageData;
pub use coverage::CoverageSummary;
pub use coverage::NodeCoverage;
pub use debugger::CommandOutput;
pub use debugger::Debugger;
pub use debugger::DebuggerSettings;
pub use debugger::DebuggerState;
pub use debugger::PauseReason;
pub use debugger::StopReport;
pub use history::DecisionHistory;
pub use history::DecisionRecord;
pub use history::render_records;
pub use profiler::DEFAULT_REPORT_LIMIT;
pub use profiler::MemorySummary;
pub use profiler::ProfileEntry;
pub use profiler::ProfileId;
pub use profiler::ProfileKind;
pub use profiler::Profiler;
pub use sink::ExplanationSink;
pub use sink::FileTraceSink;
pub use sink::MemoryExplanationSink;
pub use sink::MemoryTraceSink;
pub use sink::NoopExplanationSink;
pub use sink::NoopTraceSink;
pub use sink::StderrTraceSink;
pub use sink::TraceEvent;
pub use sink::TraceSink;
pub use watch::Observation;
pub use watch::WatchChange;
pub use watch::WatchId;
pub use watch::WatchTracker;
