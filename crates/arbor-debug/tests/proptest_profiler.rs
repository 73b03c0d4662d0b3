// crates/arbor-debug/tests/proptest_profiler.rs
// ============================================================================
// Module: Profiler Property-Based Tests
// Description: Property tests for timing aggregation.
// Purpose: Check totals, extremes, and counts over arbitrary call sequences.
// ============================================================================

//! Property-based tests for profiler aggregation invariants.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use std::time::Duration;

use arbor_core::ManualClock;
use arbor_core::NodeId;
use arbor_core::NullProbe;
use arbor_debug::ProfileId;
use arbor_debug::Profiler;
use proptest::prelude::*;

proptest! {
    #[test]
    fn timing_aggregates_over_calls(spans in prop::collection::vec(0_u64 .. 10_000, 1 .. 32)) {
        let clock = ManualClock::new();
        let mut profiler = Profiler::new(clock.shared(), NullProbe::shared());
        let node = NodeId::from_raw(1).unwrap();
        for span in &spans {
            profiler.begin_node(node);
            clock.advance(Duration::from_micros(*span));
            profiler.end_node(node);
        }
        let entry = profiler.entry(&ProfileId::Node(node)).unwrap();
        prop_assert_eq!(entry.call_count(), spans.len() as u64);
        prop_assert_eq!(entry.total(), Duration::from_micros(spans.iter().sum()));
        prop_assert_eq!(entry.min(), Duration::from_micros(*spans.iter().min().unwrap()));
        prop_assert_eq!(entry.max(), Duration::from_micros(*spans.iter().max().unwrap()));
        prop_assert!(entry.min() <= entry.average() && entry.average() <= entry.max());
        prop_assert!(!entry.is_active());
    }

    #[test]
    fn nested_child_never_exceeds_parent(outer in 0_u64 .. 1_000, inner in 0_u64 .. 1_000, after in 0_u64 .. 1_000) {
        let clock = ManualClock::new();
        let mut profiler = Profiler::new(clock.shared(), NullProbe::shared());
        let node = NodeId::from_raw(1).unwrap();
        profiler.begin_node(node);
        clock.advance(Duration::from_micros(outer));
        profiler.begin_function("len");
        clock.advance(Duration::from_micros(inner));
        profiler.end_function("len");
        clock.advance(Duration::from_micros(after));
        profiler.end_node(node);
        let parent = profiler.entry(&ProfileId::Node(node)).unwrap().total();
        let child = profiler.entry(&ProfileId::Function("len".to_string())).unwrap().total();
        prop_assert_eq!(parent, Duration::from_micros(outer + inner + after));
        prop_assert_eq!(child, Duration::from_micros(inner));
        prop_assert!(child <= parent);
    }
}
