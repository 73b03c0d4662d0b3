// crates/arbor-core/src/value.rs
// ============================================================================
// Module: Arbor Values
// Description: Tagged runtime values for variables, decisions, and reports.
// Purpose: Provide an owned, clonable value model with truthiness and formatting.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every value stored by the runtime (scope slots, history records, watch
//! snapshots) is an owned [`Value`]. Storing a value always clones it, so a
//! later mutation of a live variable cannot alter a recorded decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Value Type
// ============================================================================

/// Runtime value for the Arbor rule language.
///
/// # Invariants
/// - Values are plain data; cloning is a deep copy.
/// - Equality is structural (lists compare element-wise).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    /// Boolean truth value.
    Boolean(bool),
    /// Double-precision number.
    Number(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered list of values.
    List(Vec<Self>),
}

impl Value {
    /// Returns whether the value is considered true in a condition.
    ///
    /// Null, zero, NaN, the empty string, and the empty list are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(flag) => *flag,
            Self::Number(number) => *number != 0.0 && !number.is_nan(),
            Self::String(text) => !text.is_empty(),
            Self::List(items) => !items.is_empty(),
        }
    }

    /// Returns a stable type label used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
        }
    }

    /// Returns the numeric payload when the value is a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Returns the string payload when the value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the boolean payload when the value is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns whether the value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns an estimate of the heap bytes held by this value.
    #[must_use]
    pub fn heap_size(&self) -> usize {
        match self {
            Self::Null | Self::Boolean(_) | Self::Number(_) => 0,
            Self::String(text) => text.capacity(),
            Self::List(items) => {
                items.capacity() * size_of::<Self>()
                    + items.iter().map(Self::heap_size).sum::<usize>()
            }
        }
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Self>> for Value {
    fn from(value: Vec<Self>) -> Self {
        Self::List(value)
    }
}

// ============================================================================
// SECTION: Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(flag) => write!(f, "{flag}"),
            Self::Number(number) => format_number(*number, f),
            Self::String(text) => f.write_str(text),
            Self::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Writes a number without a trailing `.0` when it is integral.
fn format_number(number: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        write!(f, "{number:.0}")
    } else {
        write!(f, "{number}")
    }
}
