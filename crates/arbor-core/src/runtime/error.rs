// crates/arbor-core/src/runtime/error.rs
// ============================================================================
// Module: Runtime Errors
// Description: Error taxonomy and the runtime error value.
// Purpose: Give every runtime failure a stable kind, code, and message.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Runtime failures are classified by [`ErrorKind`]. The runtime keeps the
//! most recent failure in a single last-error slot; callers that need the
//! specific cause must read it before the next operation overwrites it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Error Kind
// ============================================================================

/// Classification of runtime failures.
///
/// # Invariants
/// - Variants and their numeric codes are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Wrong argument count or argument shape.
    Argument,
    /// Input outside the domain of a function (e.g. `sqrt(-1)`).
    Domain,
    /// Index or bounds violation.
    Range,
    /// Value type mismatch.
    Type,
    /// Allocation or resource exhaustion.
    Memory,
    /// Call depth exceeded the configured limit.
    Recursion,
    /// Unknown variable, function, or handler.
    Undefined,
}

impl ErrorKind {
    /// Returns the stable numeric error code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Argument => 1,
            Self::Domain => 2,
            Self::Range => 3,
            Self::Type => 4,
            Self::Memory => 5,
            Self::Recursion => 6,
            Self::Undefined => 7,
        }
    }

    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Argument => "argument",
            Self::Domain => "domain",
            Self::Range => "range",
            Self::Type => "type",
            Self::Memory => "memory",
            Self::Recursion => "recursion",
            Self::Undefined => "undefined",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Runtime Error
// ============================================================================

/// Runtime failure with a kind and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind} error: {message}")]
pub struct RuntimeError {
    /// Failure classification.
    kind: ErrorKind,
    /// Human-readable detail.
    message: String,
}

impl RuntimeError {
    /// Creates a runtime error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Argument, message)
    }

    /// Creates a domain error.
    pub fn domain(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Domain, message)
    }

    /// Creates a range error.
    pub fn range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Range, message)
    }

    /// Creates a type error.
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    /// Creates an undefined-name error.
    pub fn undefined(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Undefined, message)
    }

    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the stable numeric code of the kind.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.kind.code()
    }

    /// Returns the human-readable detail.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
