// crates/arbor-debug/tests/sinks.rs
// ============================================================================
// Module: Trace Sink Tests
// Description: JSON-lines output of the file trace sink.
// ============================================================================
//! ## Overview
//! Integration tests for trace sinks backed by files.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod support;

use std::sync::Arc;
use std::time::Duration;

use arbor_core::DecisionTree;
use arbor_core::ManualClock;
use arbor_core::NodeId;
use arbor_core::Runtime;
use arbor_core::Value;
use arbor_core::parse_expression;
use arbor_debug::Debugger;
use arbor_debug::DebuggerSettings;
use arbor_debug::FileTraceSink;
use arbor_debug::TraceEvent;
use arbor_debug::TraceSink;
use support::TestResult;
use support::ensure;

/// Reads every JSON line from `path`.
fn read_lines(path: &std::path::Path) -> TestResult<Vec<serde_json::Value>> {
    let text = std::fs::read_to_string(path)?;
    text.lines().map(|line| serde_json::from_str(line).map_err(Into::into)).collect()
}

/// Tests events are appended as one JSON object per line.
#[test]
fn file_sink_appends_json_lines() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("trace.jsonl");
    let node = NodeId::from_raw(4).ok_or("node id must be non-zero")?;
    {
        let sink = FileTraceSink::new(&path)?;
        sink.record(&TraceEvent::new("node_enter", Duration::from_millis(1_500)).with_node(node));
    }
    let sink = FileTraceSink::new(&path)?;
    sink.record(
        &TraceEvent::new("complete", Duration::from_secs(2)).with_value(Value::from("pass")),
    );

    let lines = read_lines(&path)?;
    ensure(lines.len() == 2, "Expected reopen to append")?;
    ensure(lines[0]["event"] == "node_enter", "Expected event label")?;
    ensure(lines[0]["timestamp_ms"] == 1_500, "Expected millisecond timestamp")?;
    ensure(lines[0]["node"] == 4, "Expected node id")?;
    ensure(lines[0]["value"].is_null(), "Expected absent value as null")?;
    ensure(lines[1]["value"] == "pass", "Expected result value")?;
    Ok(())
}

/// Tests a traced debugger run lands in the file.
#[test]
fn debugger_run_writes_trace_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("run.jsonl");
    let clock = ManualClock::starting_at(Duration::from_secs(1_700_000_000));
    let mut runtime = Runtime::new().with_clock(clock.shared());
    runtime.set_variable("score", Value::from(20.0))?;
    let mut debugger = Debugger::new(runtime, DebuggerSettings::default())
        .with_trace_sink(Arc::new(FileTraceSink::new(&path)?));
    debugger.load(DecisionTree::condition_tree(
        parse_expression("score > 50")?,
        parse_expression("\"pass\"")?,
        parse_expression("\"fail\"")?,
    ));
    debugger.execute_line("set tracing on")?;
    debugger.run()?;

    let lines = read_lines(&path)?;
    ensure(lines.len() == 8, format!("Expected eight events, got {}", lines.len()))?;
    ensure(
        lines.iter().all(|line| line["timestamp_ms"] == 1_700_000_000_000_u64),
        "Expected manual clock timestamps",
    )?;
    ensure(lines[1]["detail"] == "1->3", "Expected false branch")?;
    ensure(lines[7]["event"] == "complete" && lines[7]["value"] == "fail", "Expected fail")?;
    Ok(())
}
