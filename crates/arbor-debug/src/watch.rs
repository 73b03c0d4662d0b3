// crates/arbor-debug/src/watch.rs
// ============================================================================
// Module: Watch Tracker
// Description: Re-evaluated expressions with structural change detection.
// Purpose: Report which watched values changed between debugger stops.
// Dependencies: arbor-core, serde
// ============================================================================

//! ## Overview
//! Each watch keeps its parsed expression and the last value it observed.
//! [`WatchTracker::check`] re-evaluates every watch and reports the ones
//! whose observation differs structurally from the previous one. Failed
//! evaluations are observed as [`Observation::Unavailable`], so a variable
//! going out of scope is itself a change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use arbor_core::Expr;
use arbor_core::ParseError;
use arbor_core::Runtime;
use arbor_core::Value;
use arbor_core::parse_expression;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Session-unique watch identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WatchId(u32);

impl WatchId {
    /// Creates an identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Result of evaluating a watch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Observation {
    /// Not evaluated yet.
    Unset,
    /// Evaluation failed (for example an undefined variable).
    Unavailable,
    /// Evaluated value.
    Value(Value),
}

impl Observation {
    /// Evaluates `expr` into an observation without touching the runtime's
    /// error state.
    fn of(expr: &Expr, runtime: &mut Runtime) -> Self {
        runtime.preserving_errors(|runtime| {
            expr.evaluate(runtime).map_or(Self::Unavailable, Self::Value)
        })
    }

    /// Returns whether two observations show the same value; `NaN` matches
    /// `NaN`.
    fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(left), Self::Value(right)) => same_value(left, right),
            _ => self == other,
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("<unset>"),
            Self::Unavailable => f.write_str("<unavailable>"),
            Self::Value(value) => value.fmt(f),
        }
    }
}

/// A watch whose observation changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchChange {
    /// Watch identifier.
    pub id: WatchId,
    /// Watch source text.
    pub source: String,
    /// Observation before the check.
    pub previous: Observation,
    /// Observation after the check.
    pub current: Observation,
}

impl fmt::Display for WatchChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch {} `{}`: {} -> {}", self.id, self.source, self.previous, self.current)
    }
}

/// One watched expression.
#[derive(Debug, Clone, PartialEq)]
struct Watch {
    /// Source text.
    source: String,
    /// Parsed expression.
    expr: Expr,
    /// Last observation recorded by `check`.
    last: Observation,
}

/// Structural value equality that treats `NaN` as equal to itself.
fn same_value(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_value(x, y))
        }
        _ => left == right,
    }
}

// ============================================================================
// SECTION: Tracker
// ============================================================================

/// Owner of all watch expressions.
#[derive(Debug, Clone)]
pub struct WatchTracker {
    /// Watches keyed by id.
    watches: BTreeMap<WatchId, Watch>,
    /// Next identifier to assign.
    next_id: u32,
}

impl Default for WatchTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            watches: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Adds a watch expression.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the source is not a valid expression.
    pub fn add(&mut self, source: &str) -> Result<WatchId, ParseError> {
        let expr = parse_expression(source)?;
        let id = WatchId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.watches.insert(
            id,
            Watch {
                source: source.trim().to_string(),
                expr,
                last: Observation::Unset,
            },
        );
        Ok(id)
    }

    /// Removes a watch; returns whether it existed.
    pub fn remove(&mut self, id: WatchId) -> bool {
        self.watches.remove(&id).is_some()
    }

    /// Removes every watch.
    pub fn clear(&mut self) {
        self.watches.clear();
    }

    /// Returns the number of watches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// Returns whether no watches exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Re-evaluates every watch and returns those whose observation changed.
    pub fn check(&mut self, runtime: &mut Runtime) -> Vec<WatchChange> {
        let mut changes = Vec::new();
        for (id, watch) in &mut self.watches {
            let current = Observation::of(&watch.expr, runtime);
            if !current.same_as(&watch.last) {
                let previous = std::mem::replace(&mut watch.last, current.clone());
                changes.push(WatchChange {
                    id: *id,
                    source: watch.source.clone(),
                    previous,
                    current,
                });
            }
        }
        changes
    }

    /// Evaluates every watch without touching the recorded observations.
    pub fn snapshot(&self, runtime: &mut Runtime) -> Vec<(WatchId, String, Observation)> {
        self.watches
            .iter()
            .map(|(id, watch)| (*id, watch.source.clone(), Observation::of(&watch.expr, runtime)))
            .collect()
    }

    /// Renders the watch list with current values.
    #[must_use]
    pub fn render(&self, runtime: &mut Runtime) -> String {
        if self.watches.is_empty() {
            return "No watches.\n".to_string();
        }
        let mut out = String::new();
        for (id, source, observation) in self.snapshot(runtime) {
            let _ = writeln!(out, "{id}: {source} = {observation}");
        }
        out
    }
}
