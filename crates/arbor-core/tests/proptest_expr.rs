// crates/arbor-core/tests/proptest_expr.rs
// ============================================================================
// Module: Expression Property-Based Tests
// Description: Property tests for arithmetic, comparison, and scope shadowing.
// Purpose: Check evaluator agreement with native arithmetic over wide ranges.
// ============================================================================

//! Property-based tests for expression and scope invariants.

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

use arbor_core::Runtime;
use arbor_core::Value;
use arbor_core::parse_expression;
use proptest::prelude::*;

proptest! {
    #[test]
    fn arithmetic_matches_native(a in -10_000_i32 .. 10_000, b in -10_000_i32 .. 10_000, c in 1_i32 .. 100) {
        let mut runtime = Runtime::new();
        runtime.set_variable("a", Value::from(a)).unwrap();
        runtime.set_variable("b", Value::from(b)).unwrap();
        runtime.set_variable("c", Value::from(c)).unwrap();
        let expr = parse_expression("a + b * c - a % c").unwrap();
        let expected = f64::from(a) + f64::from(b) * f64::from(c) - f64::from(a) % f64::from(c);
        prop_assert_eq!(expr.evaluate(&mut runtime).unwrap(), Value::from(expected));
    }

    #[test]
    fn comparisons_match_native(a in any::<i32>(), b in any::<i32>()) {
        let mut runtime = Runtime::new();
        runtime.set_variable("a", Value::from(a)).unwrap();
        runtime.set_variable("b", Value::from(b)).unwrap();
        let expr = parse_expression("a < b || a == b").unwrap();
        prop_assert_eq!(expr.evaluate(&mut runtime).unwrap(), Value::from(a <= b));
    }

    #[test]
    fn shadowing_never_leaks(outer in any::<i32>(), inner in any::<i32>(), depth in 1_usize .. 8) {
        let mut runtime = Runtime::new();
        runtime.set_variable("x", Value::from(outer)).unwrap();
        for _ in 0 .. depth {
            runtime.push_scope();
            runtime.set_variable("x", Value::from(inner)).unwrap();
        }
        prop_assert_eq!(runtime.get_variable("x").unwrap(), Value::from(inner));
        for _ in 0 .. depth {
            prop_assert!(runtime.pop_scope());
        }
        prop_assert!(!runtime.pop_scope());
        prop_assert_eq!(runtime.get_variable("x").unwrap(), Value::from(outer));
    }
}
