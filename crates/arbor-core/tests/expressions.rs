// crates/arbor-core/tests/expressions.rs
// ============================================================================
// Module: Expression Tests
// Description: Parsing, precedence, evaluation, and built-in error kinds.
// ============================================================================
//! ## Overview
//! Integration tests for the condition-expression language.

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

use arbor_core::CallObserver;
use arbor_core::ErrorKind;
use arbor_core::MAX_EXPR_HEIGHT;
use arbor_core::ParseError;
use arbor_core::Runtime;
use arbor_core::Value;
use arbor_core::parse_expression;
use support::TestResult;
use support::ensure;

/// Parses and evaluates `source` against `runtime`.
fn eval(runtime: &mut Runtime, source: &str) -> TestResult<Value> {
    Ok(parse_expression(source)?.evaluate(runtime)?)
}

/// Evaluates `source` and returns the error kind it fails with.
fn eval_error(runtime: &mut Runtime, source: &str) -> TestResult<ErrorKind> {
    match parse_expression(source)?.evaluate(runtime) {
        Ok(value) => Err(format!("Expected `{source}` to fail, got {value}").into()),
        Err(error) => Ok(error.kind()),
    }
}

// ========================================================================
// Parsing
// ========================================================================

/// Tests arithmetic precedence.
#[test]
fn arithmetic_respects_precedence() -> TestResult {
    let mut runtime = Runtime::new();
    ensure(eval(&mut runtime, "1 + 2 * 3")? == Value::from(7.0), "Expected * before +")?;
    ensure(eval(&mut runtime, "(1 + 2) * 3")? == Value::from(9.0), "Expected parentheses")?;
    ensure(eval(&mut runtime, "-2 * 3 + 10 % 4")? == Value::from(-4.0), "Expected unary minus")?;
    Ok(())
}

/// Tests logical operators and keyword forms.
#[test]
fn logical_operators_and_keywords() -> TestResult {
    let mut runtime = Runtime::new();
    ensure(eval(&mut runtime, "true and not false")? == Value::from(true), "Expected and/not")?;
    ensure(eval(&mut runtime, "false || 1 > 0")? == Value::from(true), "Expected || over >")?;
    ensure(eval(&mut runtime, "1 < 2 && 2 <= 2 && 3 != 4")? == Value::from(true), "Expected chain")?;
    Ok(())
}

/// Tests rendering shows the parsed grouping.
#[test]
fn display_shows_grouping() -> TestResult {
    let expr = parse_expression("a || b && c")?;
    ensure(expr.to_string() == "(a || (b && c))", "Expected && to bind tighter")?;
    let call = parse_expression("max(x, \"y\")")?;
    ensure(call.to_string() == "max(x, \"y\")", "Expected call rendering")?;
    Ok(())
}

/// Tests syntax errors carry positions.
#[test]
fn syntax_errors_report_positions() -> TestResult {
    ensure(parse_expression("   ") == Err(ParseError::EmptyInput), "Expected empty input")?;
    ensure(
        matches!(parse_expression("1 +"), Err(ParseError::UnexpectedToken { position: 3, .. })),
        "Expected unexpected end at offset 3",
    )?;
    ensure(
        matches!(parse_expression("\"open"), Err(ParseError::UnterminatedString { position: 0 })),
        "Expected unterminated string",
    )?;
    ensure(
        matches!(parse_expression("a b"), Err(ParseError::TrailingInput { position: 2 })),
        "Expected trailing input",
    )?;
    ensure(
        matches!(parse_expression("a = b"), Err(ParseError::UnexpectedToken { .. })),
        "Expected single = to be rejected",
    )?;
    Ok(())
}

/// Tests nesting and size limits.
#[test]
fn limits_are_enforced() -> TestResult {
    let deep = format!("{}1{}", "(".repeat(40), ")".repeat(40));
    ensure(
        matches!(parse_expression(&deep), Err(ParseError::NestingTooDeep { .. })),
        "Expected nesting limit",
    )?;
    let shallow = format!("{}1{}", "(".repeat(8), ")".repeat(8));
    ensure(parse_expression(&shallow).is_ok(), "Expected shallow nesting to parse")?;
    let large = "1".repeat(64 * 1024 + 1);
    ensure(
        matches!(parse_expression(&large), Err(ParseError::InputTooLarge { .. })),
        "Expected size limit",
    )?;
    Ok(())
}

/// Tests long operator chains are bounded by tree height rather than
/// parenthesis depth.
#[test]
fn long_operator_chains_are_height_limited() -> TestResult {
    let chain = format!("{}1", "1+".repeat(30_000));
    ensure(chain.len() < 64 * 1024, "Expected chain under the size limit")?;
    match parse_expression(&chain) {
        Err(ParseError::NestingTooDeep {
            max_depth,
            actual_depth,
            ..
        }) => {
            ensure(max_depth == MAX_EXPR_HEIGHT, "Expected tree height limit")?;
            ensure(actual_depth == MAX_EXPR_HEIGHT + 1, "Expected first level over the limit")?;
        }
        other => return Err(format!("Expected height error, got {other:?}").into()),
    }

    let mut runtime = Runtime::new();
    let limit = MAX_EXPR_HEIGHT - 1;
    let widest = format!("{}1", "1+".repeat(limit));
    ensure(eval(&mut runtime, &widest)? == Value::from(256.0), "Expected chain at the limit")?;
    let nested_calls = format!("{}1{}", "abs(".repeat(20), ")".repeat(20));
    ensure(eval(&mut runtime, &nested_calls)? == Value::from(1.0), "Expected nested calls")?;
    let negations = format!("{}1", "- ".repeat(31));
    ensure(parse_expression(&negations).is_ok(), "Expected prefix chain under the limit")?;
    Ok(())
}

// ========================================================================
// Evaluation
// ========================================================================

/// Tests strings concatenate and compare.
#[test]
fn strings_concatenate_and_compare() -> TestResult {
    let mut runtime = Runtime::new();
    runtime.set_variable("name", Value::from("ada"))?;
    ensure(
        eval(&mut runtime, "\"hi \" + name + 1")? == Value::from("hi ada1"),
        "Expected concatenation",
    )?;
    ensure(eval(&mut runtime, "\"a\" < \"b\"")? == Value::from(true), "Expected string order")?;
    ensure(eval(&mut runtime, "upper(name) == \"ADA\"")? == Value::from(true), "Expected upper")?;
    Ok(())
}

/// Tests short-circuit skips the right operand.
#[test]
fn short_circuit_skips_right_operand() -> TestResult {
    let mut runtime = Runtime::new();
    ensure(eval(&mut runtime, "false && missing")? == Value::from(false), "Expected && skip")?;
    ensure(eval(&mut runtime, "true || missing")? == Value::from(true), "Expected || skip")?;
    ensure(runtime.last_error().is_none(), "Expected no error recorded")?;
    Ok(())
}

/// Tests evaluation error kinds.
#[test]
fn evaluation_errors_have_kinds() -> TestResult {
    let mut runtime = Runtime::new();
    ensure(eval_error(&mut runtime, "missing + 1")? == ErrorKind::Undefined, "Undefined var")?;
    ensure(eval_error(&mut runtime, "true * 2")? == ErrorKind::Type, "Type mismatch")?;
    ensure(eval_error(&mut runtime, "1 / 0")? == ErrorKind::Domain, "Division by zero")?;
    ensure(eval_error(&mut runtime, "sqrt(-4)")? == ErrorKind::Domain, "Negative sqrt")?;
    ensure(eval_error(&mut runtime, "log(0)")? == ErrorKind::Domain, "Log of zero")?;
    ensure(eval_error(&mut runtime, "num(\"abc\")")? == ErrorKind::Type, "Unparsable num")?;
    ensure(eval_error(&mut runtime, "substr(\"abc\", 2, 5)")? == ErrorKind::Range, "Substr")?;
    ensure(eval_error(&mut runtime, "abs(1, 2)")? == ErrorKind::Argument, "Arity")?;
    ensure(eval_error(&mut runtime, "nothing()")? == ErrorKind::Undefined, "Unknown fn")?;
    Ok(())
}

/// Tests the standard library.
#[test]
fn standard_library_functions() -> TestResult {
    let mut runtime = Runtime::new();
    runtime.set_variable(
        "items",
        Value::List(vec![Value::from(3.0), Value::from("x"), Value::Null]),
    )?;
    let cases = [
        ("abs(-3)", Value::from(3.0)),
        ("min(4, 2, 9)", Value::from(2.0)),
        ("max(4, 2, 9)", Value::from(9.0)),
        ("floor(2.7) + ceil(2.1) + round(2.5)", Value::from(8.0)),
        ("pow(2, 10)", Value::from(1024.0)),
        ("len(\"héllo\")", Value::from(5.0)),
        ("len(items)", Value::from(3.0)),
        ("concat(\"a\", 1, true)", Value::from("a1true")),
        ("str(2.5)", Value::from("2.5")),
        ("num(\" 12 \")", Value::from(12.0)),
        ("type(items)", Value::from("list")),
        ("contains(\"decision\", \"cis\")", Value::from(true)),
        ("contains(items, \"x\")", Value::from(true)),
        ("substr(\"arbor\", 1, 3)", Value::from("rbo")),
        ("at(items, 0)", Value::from(3.0)),
        ("is_null(at(items, 2))", Value::from(true)),
        ("lower(\"MiXeD\")", Value::from("mixed")),
    ];
    for (source, expected) in cases {
        let actual = eval(&mut runtime, source)?;
        ensure(actual == expected, format!("Expected `{source}` to be {expected}, got {actual}"))?;
    }
    ensure(eval_error(&mut runtime, "at(items, 3)")? == ErrorKind::Range, "Expected at bounds")?;
    Ok(())
}

/// Records call notifications.
#[derive(Default)]
struct Recorder {
    /// Observed events.
    events: Vec<String>,
}

impl CallObserver for Recorder {
    fn on_call_start(&mut self, name: &str) {
        self.events.push(format!("start:{name}"));
    }

    fn on_call_end(&mut self, name: &str) {
        self.events.push(format!("end:{name}"));
    }
}

/// Tests call observers see nested calls in order.
#[test]
fn call_observer_sees_nested_calls() -> TestResult {
    let mut runtime = Runtime::new();
    let expr = parse_expression("abs(min(-1, 2))")?;
    let mut recorder = Recorder::default();
    let value = expr.evaluate_observed(&mut runtime, &mut recorder)?;
    ensure(value == Value::from(1.0), "Expected nested result")?;
    ensure(
        recorder.events == ["start:min", "end:min", "start:abs", "end:abs"],
        "Expected arguments evaluated before the outer call",
    )?;
    Ok(())
}
