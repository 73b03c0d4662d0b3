// crates/arbor-core/src/runtime/builtins.rs
// ============================================================================
// Module: Standard Library
// Description: Built-in function table consulted after host registrations.
// Purpose: Provide numeric, string, list, and type helpers for expressions.
// Dependencies: crate::{runtime, value}
// ============================================================================

//! ## Overview
//! Built-ins are pure functions over argument values. The runtime validates
//! arity against the table before dispatch, so implementations may assume the
//! argument count is within range.

// ============================================================================
// SECTION: Imports
// ============================================================================

use super::error::RuntimeError;
use super::functions::Arity;
use crate::value::Value;

// ============================================================================
// SECTION: Table
// ============================================================================

/// Signature of a built-in implementation.
pub type BuiltinFn = fn(&[Value]) -> Result<Value, RuntimeError>;

/// Built-in function descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    /// Function name.
    pub name: &'static str,
    /// Accepted argument counts.
    pub arity: Arity,
    /// One-line description.
    pub description: &'static str,
    /// Implementation.
    pub function: BuiltinFn,
}

/// Built-in functions in lookup order.
pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "abs",
        arity: Arity::exact(1),
        description: "absolute value",
        function: abs,
    },
    Builtin {
        name: "min",
        arity: Arity::at_least(1),
        description: "smallest number",
        function: min,
    },
    Builtin {
        name: "max",
        arity: Arity::at_least(1),
        description: "largest number",
        function: max,
    },
    Builtin {
        name: "floor",
        arity: Arity::exact(1),
        description: "round toward negative infinity",
        function: floor,
    },
    Builtin {
        name: "ceil",
        arity: Arity::exact(1),
        description: "round toward positive infinity",
        function: ceil,
    },
    Builtin {
        name: "round",
        arity: Arity::exact(1),
        description: "round half away from zero",
        function: round,
    },
    Builtin {
        name: "sqrt",
        arity: Arity::exact(1),
        description: "square root of a non-negative number",
        function: sqrt,
    },
    Builtin {
        name: "pow",
        arity: Arity::exact(2),
        description: "raise base to exponent",
        function: pow,
    },
    Builtin {
        name: "log",
        arity: Arity::exact(1),
        description: "natural logarithm of a positive number",
        function: log,
    },
    Builtin {
        name: "len",
        arity: Arity::exact(1),
        description: "length of a string or list",
        function: len,
    },
    Builtin {
        name: "upper",
        arity: Arity::exact(1),
        description: "uppercase a string",
        function: upper,
    },
    Builtin {
        name: "lower",
        arity: Arity::exact(1),
        description: "lowercase a string",
        function: lower,
    },
    Builtin {
        name: "concat",
        arity: Arity::at_least(0),
        description: "join the display form of every argument",
        function: concat,
    },
    Builtin {
        name: "str",
        arity: Arity::exact(1),
        description: "display form of a value",
        function: to_str,
    },
    Builtin {
        name: "num",
        arity: Arity::exact(1),
        description: "convert to a number",
        function: num,
    },
    Builtin {
        name: "type",
        arity: Arity::exact(1),
        description: "type name of a value",
        function: type_of,
    },
    Builtin {
        name: "contains",
        arity: Arity::exact(2),
        description: "substring or list membership test",
        function: contains,
    },
    Builtin {
        name: "substr",
        arity: Arity::exact(3),
        description: "substring by character start and length",
        function: substr,
    },
    Builtin {
        name: "at",
        arity: Arity::exact(2),
        description: "list element by index",
        function: at,
    },
    Builtin {
        name: "is_null",
        arity: Arity::exact(1),
        description: "test for null",
        function: is_null,
    },
];

/// Looks up a built-in by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

// ============================================================================
// SECTION: Argument Helpers
// ============================================================================

/// Shared null used for absent arguments.
static NULL: Value = Value::Null;

/// Returns argument `index`, or null when absent.
fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

/// Reads a numeric argument.
fn number(args: &[Value], index: usize, function: &str) -> Result<f64, RuntimeError> {
    let value = arg(args, index);
    value.as_number().ok_or_else(|| {
        RuntimeError::type_mismatch(format!(
            "{function}: argument {} must be a number, got {}",
            index + 1,
            value.type_name()
        ))
    })
}

/// Reads a string argument.
fn string<'a>(args: &'a [Value], index: usize, function: &str) -> Result<&'a str, RuntimeError> {
    let value = arg(args, index);
    value.as_str().ok_or_else(|| {
        RuntimeError::type_mismatch(format!(
            "{function}: argument {} must be a string, got {}",
            index + 1,
            value.type_name()
        ))
    })
}

/// Reads a non-negative integral index argument.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Value is checked to be a non-negative integer within u32 range."
)]
fn index(args: &[Value], position: usize, function: &str) -> Result<usize, RuntimeError> {
    let value = number(args, position, function)?;
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(RuntimeError::range(format!(
            "{function}: argument {} must be a non-negative integer, got {value}",
            position + 1
        )));
    }
    Ok(value as u32 as usize)
}

/// Converts a count into a numeric value.
fn count(value: usize) -> Value {
    Value::Number(f64::from(u32::try_from(value).unwrap_or(u32::MAX)))
}

// ============================================================================
// SECTION: Numeric
// ============================================================================

/// `abs(x)`.
fn abs(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Number(number(args, 0, "abs")?.abs()))
}

/// `min(x, ...)`.
fn min(args: &[Value]) -> Result<Value, RuntimeError> {
    let mut best = number(args, 0, "min")?;
    for position in 1 .. args.len() {
        best = best.min(number(args, position, "min")?);
    }
    Ok(Value::Number(best))
}

/// `max(x, ...)`.
fn max(args: &[Value]) -> Result<Value, RuntimeError> {
    let mut best = number(args, 0, "max")?;
    for position in 1 .. args.len() {
        best = best.max(number(args, position, "max")?);
    }
    Ok(Value::Number(best))
}

/// `floor(x)`.
fn floor(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Number(number(args, 0, "floor")?.floor()))
}

/// `ceil(x)`.
fn ceil(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Number(number(args, 0, "ceil")?.ceil()))
}

/// `round(x)`.
fn round(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Number(number(args, 0, "round")?.round()))
}

/// `sqrt(x)`.
fn sqrt(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = number(args, 0, "sqrt")?;
    if value < 0.0 {
        return Err(RuntimeError::domain(format!("sqrt: negative input {value}")));
    }
    Ok(Value::Number(value.sqrt()))
}

/// `pow(base, exponent)`.
fn pow(args: &[Value]) -> Result<Value, RuntimeError> {
    let base = number(args, 0, "pow")?;
    let exponent = number(args, 1, "pow")?;
    Ok(Value::Number(base.powf(exponent)))
}

/// `log(x)`.
fn log(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = number(args, 0, "log")?;
    if value <= 0.0 {
        return Err(RuntimeError::domain(format!("log: non-positive input {value}")));
    }
    Ok(Value::Number(value.ln()))
}

// ============================================================================
// SECTION: Strings and Lists
// ============================================================================

/// `len(s | list)`.
fn len(args: &[Value]) -> Result<Value, RuntimeError> {
    match arg(args, 0) {
        Value::String(text) => Ok(count(text.chars().count())),
        Value::List(items) => Ok(count(items.len())),
        other => Err(RuntimeError::type_mismatch(format!(
            "len: expected a string or list, got {}",
            other.type_name()
        ))),
    }
}

/// `upper(s)`.
fn upper(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::String(string(args, 0, "upper")?.to_uppercase()))
}

/// `lower(s)`.
fn lower(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::String(string(args, 0, "lower")?.to_lowercase()))
}

/// `concat(...)`.
fn concat(args: &[Value]) -> Result<Value, RuntimeError> {
    let mut out = String::new();
    for value in args {
        out.push_str(&value.to_string());
    }
    Ok(Value::String(out))
}

/// `contains(haystack, needle)`.
fn contains(args: &[Value]) -> Result<Value, RuntimeError> {
    match arg(args, 0) {
        Value::String(text) => {
            let needle = arg(args, 1).to_string();
            Ok(Value::Boolean(text.contains(needle.as_str())))
        }
        Value::List(items) => Ok(Value::Boolean(items.contains(arg(args, 1)))),
        other => Err(RuntimeError::type_mismatch(format!(
            "contains: expected a string or list, got {}",
            other.type_name()
        ))),
    }
}

/// `substr(s, start, length)`.
fn substr(args: &[Value]) -> Result<Value, RuntimeError> {
    let text = string(args, 0, "substr")?;
    let start = index(args, 1, "substr")?;
    let length = index(args, 2, "substr")?;
    let total = text.chars().count();
    let end = start.saturating_add(length);
    if start > total || end > total {
        return Err(RuntimeError::range(format!(
            "substr: range {start}..{end} exceeds length {total}"
        )));
    }
    Ok(Value::String(text.chars().skip(start).take(length).collect()))
}

/// `at(list, index)`.
fn at(args: &[Value]) -> Result<Value, RuntimeError> {
    let Value::List(items) = arg(args, 0) else {
        return Err(RuntimeError::type_mismatch(format!(
            "at: argument 1 must be a list, got {}",
            arg(args, 0).type_name()
        )));
    };
    let position = index(args, 1, "at")?;
    items.get(position).cloned().ok_or_else(|| {
        RuntimeError::range(format!("at: index {position} out of bounds for length {}", items.len()))
    })
}

// ============================================================================
// SECTION: Conversion
// ============================================================================

/// `str(x)`.
fn to_str(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::String(arg(args, 0).to_string()))
}

/// `num(x)`.
fn num(args: &[Value]) -> Result<Value, RuntimeError> {
    match arg(args, 0) {
        Value::Number(number) => Ok(Value::Number(*number)),
        Value::Boolean(flag) => Ok(Value::Number(if *flag { 1.0 } else { 0.0 })),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| RuntimeError::type_mismatch(format!("num: cannot parse `{text}`"))),
        other => Err(RuntimeError::type_mismatch(format!(
            "num: cannot convert {} to a number",
            other.type_name()
        ))),
    }
}

/// `type(x)`.
fn type_of(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::String(arg(args, 0).type_name().to_string()))
}

/// `is_null(x)`.
fn is_null(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(arg(args, 0).is_null()))
}
