// crates/arbor-core/src/runtime/scope.rs
// ============================================================================
// Module: Variable Scopes
// Description: Single-owner variable bindings for one lexical level.
// Purpose: Hold owned clones of values and report a size estimate for GC.
// Dependencies: crate::value
// ============================================================================

//! ## Overview
//! A [`Scope`] owns its variables outright. The runtime keeps scopes on a
//! stack, so the parent relationship is positional and dropping a scope
//! never touches the scopes beneath it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use crate::value::Value;

// ============================================================================
// SECTION: Scope
// ============================================================================

/// One level of variable bindings.
///
/// # Invariants
/// - Stored values are owned clones independent of their source.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// Bindings owned by this scope.
    variables: HashMap<String, Value>,
}

impl Scope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the binding for `name` in this scope only.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Returns whether `name` is bound in this scope only.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Binds `name`, replacing any previous binding in this scope.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.variables.get_mut(name) {
            *slot = value;
        } else {
            self.variables.insert(name.to_string(), value);
        }
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns whether the scope has no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Returns bindings sorted by name.
    #[must_use]
    pub fn sorted_bindings(&self) -> Vec<(&str, &Value)> {
        let mut bindings: Vec<(&str, &Value)> =
            self.variables.iter().map(|(name, value)| (name.as_str(), value)).collect();
        bindings.sort_by(|a, b| a.0.cmp(b.0));
        bindings
    }

    /// Estimates the bytes held by this scope.
    #[must_use]
    pub fn footprint(&self) -> usize {
        let slots = self.variables.capacity() * (size_of::<String>() + size_of::<Value>());
        let owned: usize =
            self.variables.iter().map(|(name, value)| name.capacity() + value.heap_size()).sum();
        slots + owned
    }

    /// Drops every binding, keeping allocated capacity for reuse.
    pub(crate) fn clear(&mut self) {
        self.variables.clear();
    }

    /// Releases spare capacity and returns the estimated bytes released.
    pub(crate) fn shrink(&mut self) -> usize {
        let before = self.footprint();
        self.variables.shrink_to_fit();
        before.saturating_sub(self.footprint())
    }
}
