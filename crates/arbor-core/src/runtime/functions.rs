// crates/arbor-core/src/runtime/functions.rs
// ============================================================================
// Module: Function Registry
// Description: Host-registered functions with arity metadata.
// Purpose: Store immutable function entries looked up before the built-in table.
// Dependencies: crate::{runtime, value}
// ============================================================================

//! ## Overview
//! Functions registered by the host are stored as [`FunctionEntry`] values
//! keyed by name. Entries are immutable once registered; registering the same
//! name twice is rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::Runtime;
use super::error::RuntimeError;
use crate::value::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Callable signature of a host function.
///
/// The runtime is passed back in so functions can read variables, call other
/// functions, or record errors with [`Runtime::raise`].
pub type NativeFunction = Rc<dyn Fn(&mut Runtime, &[Value]) -> Result<Value, RuntimeError>>;

/// Accepted argument count range.
///
/// # Invariants
/// - `max`, when present, is `>= min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Minimum argument count.
    min: usize,
    /// Maximum argument count; `None` means unbounded.
    max: Option<usize>,
}

impl Arity {
    /// Exactly `count` arguments.
    #[must_use]
    pub const fn exact(count: usize) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    /// Between `min` and `max` arguments inclusive (bounds are reordered if swapped).
    #[must_use]
    pub const fn between(min: usize, max: usize) -> Self {
        if max < min {
            Self {
                min: max,
                max: Some(min),
            }
        } else {
            Self {
                min,
                max: Some(max),
            }
        }
    }

    /// At least `min` arguments.
    #[must_use]
    pub const fn at_least(min: usize) -> Self {
        Self {
            min,
            max: None,
        }
    }

    /// Returns the minimum argument count.
    #[must_use]
    pub const fn min(self) -> usize {
        self.min
    }

    /// Returns the maximum argument count, if bounded.
    #[must_use]
    pub const fn max(self) -> Option<usize> {
        self.max
    }

    /// Returns whether `count` arguments are accepted.
    #[must_use]
    pub const fn accepts(self, count: usize) -> bool {
        if count < self.min {
            return false;
        }
        match self.max {
            Some(max) => count <= max,
            None => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..{max}", self.min),
            None => write!(f, "{}+", self.min),
        }
    }
}

// ============================================================================
// SECTION: Function Entry
// ============================================================================

/// Registered host function.
#[derive(Clone)]
pub struct FunctionEntry {
    /// Function name.
    name: String,
    /// Accepted argument counts.
    arity: Arity,
    /// Optional description for help output.
    description: Option<String>,
    /// Callable.
    function: NativeFunction,
}

impl FunctionEntry {
    /// Creates an entry.
    pub fn new(
        name: impl Into<String>,
        arity: Arity,
        description: Option<String>,
        function: NativeFunction,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            description,
            function,
        }
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the accepted argument counts.
    #[must_use]
    pub const fn arity(&self) -> Arity {
        self.arity
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns a handle to the callable.
    #[must_use]
    pub fn function(&self) -> NativeFunction {
        Rc::clone(&self.function)
    }
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Name-keyed store of host functions.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    /// Entries by name.
    entries: HashMap<String, FunctionEntry>,
}

impl FunctionRegistry {
    /// Registers an entry.
    ///
    /// # Errors
    ///
    /// Returns an argument error when the name is empty or already registered.
    pub fn register(&mut self, entry: FunctionEntry) -> Result<(), RuntimeError> {
        if entry.name.is_empty() {
            return Err(RuntimeError::argument("function name must not be empty"));
        }
        if self.entries.contains_key(&entry.name) {
            return Err(RuntimeError::argument(format!(
                "function `{}` is already registered",
                entry.name
            )));
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Looks up an entry by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries.get(name)
    }

    /// Returns registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no functions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
