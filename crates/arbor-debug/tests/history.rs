// crates/arbor-debug/tests/history.rs
// ============================================================================
// Module: Decision History Tests
// Description: Sequencing, path reconstruction, capacity, and rendering.
// ============================================================================
//! ## Overview
//! Integration tests for the decision history log.

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

use std::time::Duration;

use arbor_core::DecisionTree;
use arbor_core::ManualClock;
use arbor_core::NodeId;
use arbor_core::NodeKind;
use arbor_core::Value;
use arbor_debug::DecisionHistory;
use support::TestResult;
use support::ensure;

/// Builds a chain `1 -> 2 -> 3` of depths 0, 1, 2.
fn chain() -> TestResult<(DecisionTree, [NodeId; 3])> {
    let mut tree = DecisionTree::new();
    let root = tree.add_root(NodeKind::condition("a")?);
    let middle = tree.add_child(root, NodeKind::condition("b")?).ok_or("missing parent")?;
    let leaf = tree.add_child(middle, NodeKind::outcome("1")?).ok_or("missing parent")?;
    Ok((tree, [root, middle, leaf]))
}

/// Records the visit order `1, 2, 3, 1, 2` (two evaluations).
fn record_two_runs(history: &mut DecisionHistory) -> TestResult<DecisionTree> {
    let (tree, [root, middle, leaf]) = chain()?;
    for node in [root, middle, leaf, root, middle] {
        history.record_decision(&tree, node, &Value::from(true), Duration::ZERO, None);
    }
    Ok(tree)
}

/// Returns the sequence numbers of a path.
fn sequences(history: &DecisionHistory, index: usize) -> Vec<u64> {
    history.get_path(index).iter().map(|record| record.sequence).collect()
}

/// Tests sequence numbering, depth capture, and shape flags.
#[test]
fn records_capture_sequence_and_shape() -> TestResult {
    let mut history = DecisionHistory::new(ManualClock::new().shared());
    record_two_runs(&mut history)?;
    ensure(history.len() == 5, "Expected five records")?;
    let depths: Vec<usize> = history.iter().map(|record| record.depth).collect();
    ensure(depths == vec![0, 1, 2, 0, 1], format!("Unexpected depths {depths:?}"))?;
    let Some(leaf) = history.get(2) else {
        return Err("Expected third record".into());
    };
    ensure(leaf.sequence == 3 && leaf.is_leaf && !leaf.is_condition, "Expected leaf record")?;
    ensure(history.get(0).is_some_and(|record| record.is_condition), "Expected condition")?;
    ensure(history.last().is_some_and(|record| record.sequence == 5), "Expected last seq")?;
    Ok(())
}

/// Tests path reconstruction scans back to the nearest depth-0 record.
#[test]
fn get_path_stops_at_nearest_root() -> TestResult {
    let mut history = DecisionHistory::new(ManualClock::new().shared());
    record_two_runs(&mut history)?;
    ensure(sequences(&history, 2) == vec![1, 2, 3], "Expected first evaluation path")?;
    ensure(sequences(&history, 4) == vec![4, 5], "Expected second evaluation path")?;
    ensure(sequences(&history, 3) == vec![4], "Expected root-only path")?;
    ensure(history.get_path(5).is_empty(), "Expected out-of-range to be empty")?;
    ensure(history.get_path(usize::MAX).is_empty(), "Expected out-of-range to be empty")?;
    Ok(())
}

/// Tests capacity eviction drops the oldest records and truncates paths.
#[test]
fn capacity_evicts_oldest() -> TestResult {
    let mut history = DecisionHistory::new(ManualClock::new().shared()).with_capacity(Some(4));
    record_two_runs(&mut history)?;
    ensure(history.len() == 4, "Expected capacity respected")?;
    ensure(history.get(0).is_some_and(|record| record.sequence == 2), "Expected oldest evicted")?;
    ensure(sequences(&history, 1) == vec![2, 3], "Expected partial path without root")?;

    let mut zero = DecisionHistory::new(ManualClock::new().shared()).with_capacity(Some(0));
    record_two_runs(&mut zero)?;
    ensure(zero.len() == 1, "Expected zero capacity to keep one record")?;
    Ok(())
}

/// Tests a disabled history records nothing and clear restarts sequencing.
#[test]
fn disabled_and_cleared_history() -> TestResult {
    let (tree, [root, ..]) = chain()?;
    let mut history = DecisionHistory::new(ManualClock::new().shared());
    history.set_enabled(false);
    let skipped = history.record_decision(&tree, root, &Value::from(1.0), Duration::ZERO, None);
    ensure(skipped.is_none() && history.is_empty(), "Expected nothing recorded")?;

    history.set_enabled(true);
    record_two_runs(&mut history)?;
    ensure(history.find_by_node(root).len() == 2, "Expected two root records")?;
    history.clear();
    ensure(history.is_empty(), "Expected cleared")?;
    let first = history.record_decision(&tree, root, &Value::from(1.0), Duration::ZERO, None);
    ensure(first == Some(1), "Expected sequence restarted")?;
    ensure(
        history.render_table() == "Seq  Timestamp            Depth  Node  Decision\n1    1970-01-01 00:00:00  0      1     1\n",
        format!("Unexpected table:\n{}", history.render_table()),
    )?;
    Ok(())
}

/// Tests timestamps and JSON rows.
#[test]
fn json_rows_carry_wall_clock_timestamps() -> TestResult {
    let clock = ManualClock::starting_at(Duration::from_secs(1_700_000_000));
    let mut history = DecisionHistory::new(clock.shared());
    let (tree, [root, ..]) = chain()?;
    let empty = history.render_table();
    ensure(empty.ends_with("(no decisions recorded)\n"), "Expected empty marker")?;

    history.record_decision(
        &tree,
        root,
        &Value::from(false),
        Duration::from_micros(250),
        Some("if a"),
    );
    let json = history.to_json();
    ensure(json[0]["timestamp"] == "2023-11-14T22:13:20Z", format!("Unexpected {json}"))?;
    ensure(json[0]["execution_time_us"] == 250, "Expected microseconds")?;
    ensure(json[0]["description"] == "if a", "Expected description")?;
    ensure(json[0]["decision"] == false, "Expected decision value")?;
    ensure(json[0]["node"] == 1 && json[0]["depth"] == 0, "Expected node and depth")?;
    ensure(history.render_table().contains("2023-11-14 22:13:20"), "Expected table timestamp")?;
    Ok(())
}
