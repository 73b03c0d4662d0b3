// crates/arbor-debug/tests/debugger.rs
// ============================================================================
// Module: Debugger Tests
// Description: Run-state transitions, command handling, and instrumentation.
// ============================================================================
//! ## Overview
//! End-to-end tests driving the debugger through its API and command lines.

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

use arbor_core::ConsequenceKind;
use arbor_core::DecisionTree;
use arbor_core::ErrorKind;
use arbor_core::NodeId;
use arbor_core::NodeKind;
use arbor_core::Runtime;
use arbor_core::Value;
use arbor_core::parse_expression;
use arbor_debug::BreakpointId;
use arbor_debug::Command;
use arbor_debug::CommandError;
use arbor_debug::Debugger;
use arbor_debug::DebuggerError;
use arbor_debug::DebuggerSettings;
use arbor_debug::DebuggerState;
use arbor_debug::HELP_TEXT;
use arbor_debug::MemoryExplanationSink;
use arbor_debug::MemoryTraceSink;
use arbor_debug::Observation;
use arbor_debug::PauseReason;
use arbor_debug::ProfileId;
use arbor_debug::ReportFormat;
use support::TestResult;
use support::ensure;

// ========================================================================
// Fixtures
// ========================================================================

/// Returns the node id for a raw value.
fn node(raw: u32) -> TestResult<NodeId> {
    NodeId::from_raw(raw).ok_or_else(|| "node id must be non-zero".into())
}

/// Returns the breakpoint id for a raw value.
fn breakpoint(raw: u32) -> TestResult<BreakpointId> {
    BreakpointId::from_raw(raw).ok_or_else(|| "breakpoint id must be non-zero".into())
}

/// Builds a condition tree from expression sources.
fn condition_tree(condition: &str, when_true: &str, when_false: &str) -> TestResult<DecisionTree> {
    Ok(DecisionTree::condition_tree(
        parse_expression(condition)?,
        parse_expression(when_true)?,
        parse_expression(when_false)?,
    ))
}

/// Builds a debugger over the `score > 50` tree with `score` bound.
fn score_debugger(score: f64, settings: DebuggerSettings) -> TestResult<Debugger> {
    let mut runtime = Runtime::new();
    runtime.set_variable("score", Value::from(score))?;
    let mut debugger = Debugger::new(runtime, settings);
    debugger.load(condition_tree("score > 50", "\"pass\"", "\"fail\"")?);
    Ok(debugger)
}

/// Builds an action root with a condition subtree and a trailing outcome.
///
/// Layout: `1` logs `audit`, children `2` (`x > 0`, leaves `4`/`5`) and `3`.
fn action_debugger() -> TestResult<Debugger> {
    let mut tree = DecisionTree::new();
    let root = tree.add_root(NodeKind::action(ConsequenceKind::Log, "audit", &["1"])?);
    let check = tree.add_child(root, NodeKind::condition("x > 0")?).ok_or("missing root")?;
    tree.add_child(root, NodeKind::outcome("\"done\"")?).ok_or("missing root")?;
    tree.add_child(check, NodeKind::outcome("\"positive\"")?).ok_or("missing check")?;
    tree.add_child(check, NodeKind::outcome("\"negative\"")?).ok_or("missing check")?;
    let mut runtime = Runtime::new().with_default_handlers();
    runtime.set_variable("x", Value::from(1.0))?;
    let mut debugger = Debugger::new(runtime, DebuggerSettings::default());
    debugger.load(tree);
    Ok(debugger)
}

// ========================================================================
// Execution
// ========================================================================

/// Tests a full run completes and feeds coverage, history, and the profiler.
#[test]
fn run_completes_and_records_instruments() -> TestResult {
    let mut debugger = score_debugger(75.0, DebuggerSettings::default())?;
    let report = debugger.run()?;
    ensure(report.state == DebuggerState::Completed(Value::from("pass")), "Expected pass")?;
    ensure(report.last_node == Some(node(2)?), "Expected last executed node")?;
    ensure(report.to_string() == "[node 2] completed: pass", "Expected report rendering")?;

    let coverage = debugger.coverage();
    ensure(format!("{:.1}", coverage.node_percentage()) == "66.7", "Expected 2/3 nodes")?;
    ensure(coverage.branch_percentage() == 50.0, "Expected 1/2 branches")?;
    ensure(coverage.uncovered_branches() == vec![(node(1)?, node(3)?)], "Expected false arm")?;
    ensure(debugger.history().len() == 2, "Expected two decisions")?;
    ensure(
        debugger.history().get(0).is_some_and(|record| record.decision == Value::from(true)),
        "Expected condition decision",
    )?;
    ensure(debugger.profiler().runs() == 1, "Expected one profiled run")?;
    ensure(debugger.profiler().current().is_none(), "Expected balanced profiler")?;
    Ok(())
}

/// Tests a breakpoint pauses before its node and continue finishes the walk.
#[test]
fn breakpoint_pauses_then_continue_completes() -> TestResult {
    let mut debugger = score_debugger(75.0, DebuggerSettings::default())?;
    let output = debugger.execute_line("break 2")?;
    ensure(output.text == "Breakpoint 1 at node 2", format!("Unexpected: {}", output.text))?;

    let report = debugger.run()?;
    let expected = DebuggerState::Paused {
        node: node(2)?,
        reason: PauseReason::Breakpoint(breakpoint(1)?),
    };
    ensure(report.state == expected, format!("Unexpected state {}", report.state))?;
    ensure(debugger.history().len() == 1, "Expected node 2 not yet executed")?;
    ensure(debugger.state().is_halted(), "Expected halted state")?;

    let report = debugger.continue_()?;
    ensure(report.state == DebuggerState::Completed(Value::from("pass")), "Expected pass")?;
    ensure(debugger.breakpoints().get(breakpoint(1)?).is_some_and(|bp| bp.hit_count() == 1), "Hit")?;
    ensure(debugger.continue_() == Err(DebuggerError::NotRunning), "Expected not running")?;
    Ok(())
}

/// Tests a conditional breakpoint whose condition is false does not pause.
#[test]
fn false_conditional_breakpoint_does_not_pause() -> TestResult {
    let mut debugger = score_debugger(75.0, DebuggerSettings::default())?;
    debugger.execute_line("b 2 if score > 90")?;
    let report = debugger.run()?;
    ensure(report.state == DebuggerState::Completed(Value::from("pass")), "Expected no pause")?;
    ensure(
        debugger.breakpoints().get(breakpoint(1)?).is_some_and(|bp| bp.hit_count() == 0),
        "Expected no hits",
    )?;
    Ok(())
}

/// Tests step executes one node at a time, starting a walk from idle.
#[test]
fn step_executes_one_node() -> TestResult {
    let mut debugger = score_debugger(10.0, DebuggerSettings::default())?;
    let report = debugger.step()?;
    ensure(report.state == DebuggerState::Stepping(node(3)?), "Expected stop before false arm")?;
    ensure(report.last_node == Some(node(1)?), "Expected root executed")?;
    ensure(report.to_string() == "[node 1] stopped before node 3", "Expected rendering")?;
    let report = debugger.step()?;
    ensure(report.state == DebuggerState::Completed(Value::from("fail")), "Expected fail")?;
    Ok(())
}

/// Tests next runs a whole subtree and stops at the following sibling.
#[test]
fn next_steps_over_subtree() -> TestResult {
    let mut debugger = action_debugger()?;
    let report = debugger.step()?;
    ensure(report.state == DebuggerState::Stepping(node(2)?), "Expected stop before subtree")?;
    ensure(debugger.runtime_mut().take_log() == vec!["audit: 1"], "Expected action ran")?;

    let report = debugger.step_over()?;
    ensure(report.state == DebuggerState::Stepping(node(3)?), "Expected stop at sibling")?;
    let visited: Vec<NodeId> = debugger.history().iter().map(|record| record.node).collect();
    ensure(visited == vec![node(1)?, node(2)?, node(4)?], "Expected subtree executed")?;

    let report = debugger.execute_line("n")?.report.ok_or("Expected stop report")?;
    ensure(report.state == DebuggerState::Completed(Value::from("done")), "Expected done")?;
    Ok(())
}

/// Tests a breakpoint inside the stepped-over subtree still pauses.
#[test]
fn next_honors_breakpoints_in_subtree() -> TestResult {
    let mut debugger = action_debugger()?;
    debugger.execute_line("break 4")?;
    debugger.step()?;
    let report = debugger.step_over()?;
    let expected = DebuggerState::Paused {
        node: node(4)?,
        reason: PauseReason::Breakpoint(breakpoint(1)?),
    };
    ensure(report.state == expected, format!("Unexpected state {}", report.state))?;
    let report = debugger.continue_()?;
    ensure(report.state == DebuggerState::Completed(Value::from("done")), "Expected done")?;
    Ok(())
}

/// Tests breaking on entry pauses at the root before anything executes.
#[test]
fn break_on_entry_pauses_at_root() -> TestResult {
    let settings = DebuggerSettings {
        break_on_entry: true,
        ..DebuggerSettings::default()
    };
    let mut debugger = score_debugger(75.0, settings)?;
    debugger.execute_line("break 1")?;
    let report = debugger.run()?;
    let expected = DebuggerState::Paused {
        node: node(1)?,
        reason: PauseReason::Entry,
    };
    ensure(report.state == expected, "Expected entry pause")?;
    ensure(debugger.history().is_empty(), "Expected nothing executed")?;
    let report = debugger.continue_()?;
    ensure(report.state == DebuggerState::Completed(Value::from("pass")), "Expected pass")?;
    ensure(
        debugger.breakpoints().get(breakpoint(1)?).is_some_and(|bp| bp.hit_count() == 0),
        "Expected root breakpoint skipped on resume",
    )?;
    Ok(())
}

/// Tests an evaluation failure aborts the walk and returns to idle.
#[test]
fn evaluation_failure_returns_to_idle() -> TestResult {
    let mut debugger = Debugger::new(Runtime::new(), DebuggerSettings::default());
    debugger.load(condition_tree("missing > 1", "1", "0")?);
    let Err(error) = debugger.run() else {
        return Err("Expected evaluation failure".into());
    };
    ensure(
        matches!(&error, DebuggerError::Eval(inner) if inner.node().get() == 1),
        format!("Unexpected error {error}"),
    )?;
    ensure(*debugger.state() == DebuggerState::Idle, "Expected idle after failure")?;
    ensure(debugger.profiler().current().is_none(), "Expected profiler stack cleared")?;
    ensure(debugger.profiler().runs() == 0, "Expected failed run not counted")?;

    debugger.execute_line("let missing = 5")?;
    let report = debugger.run()?;
    ensure(report.state == DebuggerState::Completed(Value::from(1.0)), "Expected recovery")?;
    Ok(())
}

/// Tests loading a tree discards the walk in progress.
#[test]
fn load_resets_walk() -> TestResult {
    let mut debugger = score_debugger(75.0, DebuggerSettings::default())?;
    debugger.step()?;
    debugger.load(condition_tree("score < 0", "\"neg\"", "\"pos\"")?);
    ensure(*debugger.state() == DebuggerState::Idle, "Expected idle after load")?;
    ensure(debugger.coverage().nodes_visited() == 0, "Expected fresh coverage")?;
    let report = debugger.run()?;
    ensure(report.state == DebuggerState::Completed(Value::from("pos")), "Expected new tree")?;
    Ok(())
}

// ========================================================================
// Watches and Sinks
// ========================================================================

/// Tests watch changes are reported per node and only on change.
#[test]
fn watches_report_changes_during_run() -> TestResult {
    let mut debugger = score_debugger(75.0, DebuggerSettings::default())?;
    debugger.execute_line("watch score * 2")?;
    let output = debugger.execute_line("watch missing + 1")?;
    ensure(output.text == "Watch 2: missing + 1", "Expected watch confirmation")?;

    let report = debugger.run()?;
    ensure(report.watch_changes.len() == 2, "Expected both watches reported once")?;
    ensure(
        report.watch_changes[0].current == Observation::Value(Value::from(150.0)),
        "Expected 150",
    )?;
    ensure(report.watch_changes[1].current == Observation::Unavailable, "Expected unavailable")?;
    ensure(report.to_string().contains("watch 1 `score * 2`: <unset> -> 150"), "Expected line")?;

    let report = debugger.run()?;
    ensure(report.watch_changes.is_empty(), "Expected no changes on rerun")?;
    let info = debugger.execute_line("info watches")?;
    ensure(info.text == "1: score * 2 = 150\n2: missing + 1 = <unavailable>\n", "Expected info")?;
    debugger.execute_line("unwatch 2")?;
    ensure(debugger.watches().len() == 1, "Expected watch removed")?;
    Ok(())
}

/// Tests trace events follow walk order once tracing is switched on.
#[test]
fn tracing_emits_events_in_walk_order() -> TestResult {
    let sink = Arc::new(MemoryTraceSink::new());
    let mut debugger =
        score_debugger(75.0, DebuggerSettings::default())?.with_trace_sink(Arc::<MemoryTraceSink>::clone(&sink));
    debugger.run()?;
    ensure(sink.events().is_empty(), "Expected silence while tracing is off")?;

    let output = debugger.execute_line("set tracing on")?;
    ensure(output.text == "tracing = on", format!("Unexpected: {}", output.text))?;
    debugger.run()?;
    let expected = vec![
        "node_enter",
        "branch",
        "decision",
        "node_enter",
        "decision",
        "node_exit",
        "node_exit",
        "complete",
    ];
    ensure(sink.labels() == expected, format!("Unexpected labels {:?}", sink.labels()))?;
    let events = sink.events();
    ensure(events[1].detail.as_deref() == Some("1->2"), "Expected branch detail")?;
    ensure(events[2].value == Some(Value::from(true)), "Expected decision value")?;
    ensure(events[7].value == Some(Value::from("pass")), "Expected result value")?;
    Ok(())
}

/// Tests explanations describe each decision when enabled.
#[test]
fn explanations_describe_decisions() -> TestResult {
    let sink = Arc::new(MemoryExplanationSink::new());
    let mut debugger = score_debugger(75.0, DebuggerSettings::default())?
        .with_explanation_sink(Arc::<MemoryExplanationSink>::clone(&sink));
    debugger.execute_line("set explain on")?;
    debugger.run()?;
    let lines = sink.lines();
    ensure(
        lines == vec![
            "node 1 (if (score > 50)) decided true".to_string(),
            "node 2 (return \"pass\") decided pass".to_string(),
        ],
        format!("Unexpected lines {lines:?}"),
    )?;
    Ok(())
}

// ========================================================================
// Instruments
// ========================================================================

/// Tests function calls show up under their node in the profiler.
#[test]
fn profiler_attributes_function_calls() -> TestResult {
    let mut runtime = Runtime::new();
    runtime.set_variable("score", Value::from(-80.0))?;
    let mut debugger = Debugger::new(runtime, DebuggerSettings::default());
    debugger.load(condition_tree("abs(score) > 50", "\"far\"", "\"near\"")?);
    debugger.run()?;

    let profiler = debugger.profiler();
    let function = ProfileId::Function("abs".to_string());
    ensure(profiler.entry(&function).is_some_and(|entry| entry.call_count() == 1), "abs")?;
    ensure(
        profiler.entry(&ProfileId::Node(node(1)?)).is_some_and(|entry| entry.children() == [function]),
        "Expected function nested under root",
    )?;

    let text = debugger.execute_line("profile json")?.text;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    ensure(json["runs"] == 1, "Expected one run")?;
    ensure(debugger.execute_line("prof")?.text.contains("fn:abs"), "Expected text report")?;
    Ok(())
}

/// Tests history capacity, path lookup, and reset through commands.
#[test]
fn history_commands_and_reset() -> TestResult {
    let settings = DebuggerSettings {
        history_capacity: Some(1),
        ..DebuggerSettings::default()
    };
    let mut debugger = score_debugger(75.0, settings)?;
    debugger.run()?;
    ensure(debugger.history().len() == 1, "Expected capacity of one")?;
    let last_node = node(2)?;
    ensure(debugger.history().last().is_some_and(|record| record.node == last_node), "Last")?;
    let path = debugger.execute_line("path 0")?;
    ensure(path.text.lines().count() == 2, "Expected header plus partial path")?;
    ensure(
        debugger.execute_line("path 5") == Err(CommandError::UnknownRecord(5)),
        "Expected unknown record",
    )?;

    let json: serde_json::Value = serde_json::from_str(&debugger.execute_line("history json")?.text)?;
    ensure(json[0]["decision"] == "pass", "Expected JSON history")?;
    let coverage: serde_json::Value = serde_json::from_str(&debugger.execute_line("cov json")?.text)?;
    ensure(coverage["nodes_visited"] == 2, "Expected JSON coverage")?;

    debugger.execute_line("reset")?;
    ensure(debugger.history().is_empty(), "Expected history cleared")?;
    ensure(debugger.coverage().nodes_visited() == 0, "Expected coverage cleared")?;
    ensure(debugger.coverage().nodes_total() == 3, "Expected universe kept")?;
    ensure(debugger.profiler().runs() == 0, "Expected profiler cleared")?;
    Ok(())
}

// ========================================================================
// Commands
// ========================================================================

/// Tests command parsing, aliases, and argument errors.
#[test]
fn command_lines_parse() -> TestResult {
    let parsed: Command = "b 3 if x > 1".parse()?;
    ensure(
        parsed
            == Command::Break {
                node: node(3)?,
                condition: Some("x > 1".to_string()),
                temporary: false,
            },
        "Expected conditional break",
    )?;
    let parsed: Command = "tbreak 2".parse()?;
    ensure(matches!(parsed, Command::Break { temporary: true, .. }), "Expected temporary")?;
    ensure("cov json".parse::<Command>()? == Command::Coverage(ReportFormat::Json), "cov")?;
    ensure("EXIT".parse::<Command>()? == Command::Quit, "Expected case-insensitive alias")?;
    let cleared = Command::Condition {
        id: breakpoint(1)?,
        condition: None,
    };
    ensure("condition 1".parse::<Command>()? == cleared, "Expected condition clear")?;

    ensure("   ".parse::<Command>() == Err(CommandError::Empty), "Expected empty")?;
    ensure(
        "frobnicate".parse::<Command>() == Err(CommandError::Unknown("frobnicate".to_string())),
        "Expected unknown",
    )?;
    ensure(
        matches!("break".parse::<Command>(), Err(CommandError::MissingArgument { .. })),
        "Expected missing node",
    )?;
    ensure(
        matches!("break 0".parse::<Command>(), Err(CommandError::InvalidArgument { .. })),
        "Expected invalid node",
    )?;
    ensure(
        matches!("break 2 when x".parse::<Command>(), Err(CommandError::InvalidArgument { .. })),
        "Expected invalid clause",
    )?;
    ensure(
        matches!("let 1x = 2".parse::<Command>(), Err(CommandError::InvalidArgument { .. })),
        "Expected invalid name",
    )?;
    let Err(CommandError::Runtime(unknown)) = "set colour on".parse::<Command>() else {
        return Err("Expected unknown option".into());
    };
    ensure(unknown.kind() == ErrorKind::Argument, "Expected argument error")?;
    let Err(CommandError::Runtime(bad_flag)) = "set tracing maybe".parse::<Command>() else {
        return Err("Expected bad flag value".into());
    };
    ensure(bad_flag.kind() == ErrorKind::Type, "Expected type error")?;
    Ok(())
}

/// Tests command execution errors surface as typed errors.
#[test]
fn command_execution_errors() -> TestResult {
    let mut idle = Debugger::new(Runtime::new(), DebuggerSettings::default());
    ensure(
        idle.execute_line("run") == Err(CommandError::Debugger(DebuggerError::NoTree)),
        "Expected no tree",
    )?;

    let mut debugger = score_debugger(75.0, DebuggerSettings::default())?;
    ensure(
        debugger.execute_line("continue") == Err(CommandError::Debugger(DebuggerError::NotRunning)),
        "Expected not running",
    )?;
    ensure(
        debugger.execute_line("delete 9") == Err(CommandError::UnknownBreakpoint(breakpoint(9)?)),
        "Expected unknown breakpoint",
    )?;
    ensure(
        debugger.execute_line("break 7") == Err(CommandError::UnknownNode(node(7)?)),
        "Expected unknown node",
    )?;
    ensure(
        matches!(debugger.execute_line("unwatch 3"), Err(CommandError::UnknownWatch(_))),
        "Expected unknown watch",
    )?;
    ensure(
        matches!(debugger.execute_line("print 1 +"), Err(CommandError::Parse(_))),
        "Expected parse error",
    )?;
    ensure(
        matches!(debugger.execute_line("set recursion 0"), Err(CommandError::Runtime(_))),
        "Expected range error",
    )?;
    ensure(
        debugger.execute_line("path 0") == Err(CommandError::UnknownRecord(0)),
        "Expected empty history",
    )?;
    Ok(())
}

/// Tests the informational commands and variable binding.
#[test]
fn informational_commands() -> TestResult {
    let mut debugger = score_debugger(75.0, DebuggerSettings::default())?;
    ensure(debugger.execute_line("let y = 40 + 2")?.text == "y = 42", "Expected binding")?;
    ensure(debugger.execute_line("p y + 1")?.text == "43", "Expected print")?;
    ensure(debugger.execute_line("help")?.text == HELP_TEXT, "Expected help")?;

    debugger.execute_line("break 2")?;
    debugger.execute_line("limit 1 3")?;
    debugger.execute_line("disable 1")?;
    let table = debugger.execute_line("info breakpoints")?.text;
    ensure(table.contains("1   disabled  0     3"), format!("Unexpected table {table}"))?;
    ensure(debugger.execute_line("enable 1")?.text == "Enabled breakpoint 1", "Enable")?;

    debugger.run()?;
    let stats = debugger.execute_line("info stats")?.text;
    ensure(stats.starts_with("State: paused at node 2 (breakpoint 1)\n"), "Expected state line")?;
    ensure(stats.contains("Variables set: 2\n"), format!("Unexpected stats {stats}"))?;
    Ok(())
}

/// Tests quit ends the session and abandons a halted walk.
#[test]
fn quit_abandons_walk() -> TestResult {
    let mut debugger = score_debugger(75.0, DebuggerSettings::default())?;
    debugger.step()?;
    let output = debugger.execute_line("q")?;
    ensure(output.quit, "Expected quit flag")?;
    ensure(*debugger.state() == DebuggerState::Idle, "Expected idle")?;
    ensure(debugger.profiler().current().is_none(), "Expected profiler stack cleared")?;
    ensure(
        debugger.continue_() == Err(DebuggerError::NotRunning),
        "Expected walk abandoned",
    )?;
    Ok(())
}
