// crates/arbor-debug/src/breakpoint.rs
// ============================================================================
// Module: Breakpoint Manager
// Description: Conditional, temporary, and hit-limited node breakpoints.
// Purpose: Decide whether the debugger pauses before a node executes.
// Dependencies: arbor-core, serde
// ============================================================================

//! ## Overview
//! A [`BreakpointManager`] owns every breakpoint of a debugging session.
//! Breakpoints target node ids and may carry a condition expression, a hit
//! limit (auto-disable after the Nth trigger), and a temporary flag (removed
//! after the first trigger).
//!
//! Security posture: condition text is untrusted input and goes through the
//! bounded expression parser.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use arbor_core::Expr;
use arbor_core::NodeId;
use arbor_core::ParseError;
use arbor_core::Runtime;
use arbor_core::parse_expression;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Session-unique breakpoint identifier.
///
/// # Invariants
/// - Always >= 1; never reused within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakpointId(u32);

impl BreakpointId {
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

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Breakpoints
// ============================================================================

/// Parsed breakpoint condition with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakCondition {
    /// Condition text as entered.
    source: String,
    /// Parsed expression.
    expr: Expr,
}

impl BreakCondition {
    /// Parses condition text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the text is not a valid expression.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let expr = parse_expression(source)?;
        Ok(Self {
            source: source.trim().to_string(),
            expr,
        })
    }

    /// Returns the condition text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the parsed expression.
    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }
}

/// One breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    /// Identifier.
    id: BreakpointId,
    /// Target node.
    node: NodeId,
    /// Optional condition; absent means always pass.
    condition: Option<BreakCondition>,
    /// Whether the breakpoint is armed.
    enabled: bool,
    /// Number of triggers so far.
    hit_count: u64,
    /// Triggers before auto-disable; zero means unlimited.
    hit_limit: u64,
    /// Removed after the first trigger.
    temporary: bool,
}

impl Breakpoint {
    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> BreakpointId {
        self.id
    }

    /// Returns the target node.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Returns the condition, if any.
    #[must_use]
    pub const fn condition(&self) -> Option<&BreakCondition> {
        self.condition.as_ref()
    }

    /// Returns whether the breakpoint is armed.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the trigger count.
    #[must_use]
    pub const fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Returns the hit limit (zero means unlimited).
    #[must_use]
    pub const fn hit_limit(&self) -> u64 {
        self.hit_limit
    }

    /// Returns whether the breakpoint is removed after its first trigger.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Evaluates the condition; evaluation failures count as a miss and leave
    /// the runtime's error state untouched.
    fn passes(&self, runtime: &mut Runtime) -> bool {
        self.condition.as_ref().is_none_or(|condition| {
            runtime.preserving_errors(|runtime| {
                condition.expr.evaluate(runtime).is_ok_and(|value| value.is_truthy())
            })
        })
    }
}

// ============================================================================
// SECTION: Manager
// ============================================================================

/// Owner of all breakpoints in a session.
///
/// # Invariants
/// - At most one non-temporary breakpoint exists per node.
/// - Identifiers increase monotonically and are never reused.
#[derive(Debug, Clone)]
pub struct BreakpointManager {
    /// Breakpoints keyed by id.
    breakpoints: BTreeMap<BreakpointId, Breakpoint>,
    /// Next identifier to assign.
    next_id: u32,
}

impl Default for BreakpointManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakpointManager {
    /// Creates an empty manager.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            breakpoints: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Adds a breakpoint on `node`.
    ///
    /// A non-temporary breakpoint replaces any existing non-temporary
    /// breakpoint on the same node.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the condition text is invalid; nothing is
    /// added or replaced in that case.
    pub fn add(
        &mut self,
        node: NodeId,
        condition: Option<&str>,
        temporary: bool,
    ) -> Result<BreakpointId, ParseError> {
        let condition = condition.map(BreakCondition::parse).transpose()?;
        if !temporary {
            self.breakpoints.retain(|_, existing| existing.temporary || existing.node != node);
        }
        let id = BreakpointId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.breakpoints.insert(
            id,
            Breakpoint {
                id,
                node,
                condition,
                enabled: true,
                hit_count: 0,
                hit_limit: 0,
                temporary,
            },
        );
        Ok(id)
    }

    /// Removes a breakpoint; returns whether it existed.
    pub fn remove(&mut self, id: BreakpointId) -> bool {
        self.breakpoints.remove(&id).is_some()
    }

    /// Re-arms a breakpoint; returns whether it exists.
    pub fn enable(&mut self, id: BreakpointId) -> bool {
        self.set_enabled(id, true)
    }

    /// Disarms a breakpoint; returns whether it exists.
    pub fn disable(&mut self, id: BreakpointId) -> bool {
        self.set_enabled(id, false)
    }

    /// Updates the armed flag.
    fn set_enabled(&mut self, id: BreakpointId, enabled: bool) -> bool {
        let Some(breakpoint) = self.breakpoints.get_mut(&id) else {
            return false;
        };
        breakpoint.enabled = enabled;
        true
    }

    /// Replaces or removes a breakpoint condition; returns whether it exists.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the condition text is invalid.
    pub fn set_condition(
        &mut self,
        id: BreakpointId,
        condition: Option<&str>,
    ) -> Result<bool, ParseError> {
        let condition = condition.map(BreakCondition::parse).transpose()?;
        let Some(breakpoint) = self.breakpoints.get_mut(&id) else {
            return Ok(false);
        };
        breakpoint.condition = condition;
        Ok(true)
    }

    /// Sets the hit limit (zero means unlimited); returns whether it exists.
    pub fn set_hit_limit(&mut self, id: BreakpointId, limit: u64) -> bool {
        let Some(breakpoint) = self.breakpoints.get_mut(&id) else {
            return false;
        };
        breakpoint.hit_limit = limit;
        true
    }

    /// Removes every breakpoint. Identifiers keep increasing afterwards.
    pub fn clear(&mut self) {
        self.breakpoints.clear();
    }

    /// Returns a breakpoint by id.
    #[must_use]
    pub fn get(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.breakpoints.get(&id)
    }

    /// Returns all breakpoints sorted by id.
    pub fn list(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    /// Returns the number of breakpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    /// Returns whether no breakpoints exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Decides whether execution pauses before `node`.
    ///
    /// Enabled breakpoints on the node are checked in id order. The first one
    /// whose condition passes is hit: its count increments, it disables
    /// itself once the hit limit is reached, and a temporary breakpoint is
    /// removed.
    pub fn should_break(&mut self, node: NodeId, runtime: &mut Runtime) -> Option<BreakpointId> {
        let hit = self
            .breakpoints
            .values()
            .filter(|breakpoint| breakpoint.enabled && breakpoint.node == node)
            .find(|breakpoint| breakpoint.passes(runtime))
            .map(Breakpoint::id)?;
        let breakpoint = self.breakpoints.get_mut(&hit)?;
        breakpoint.hit_count = breakpoint.hit_count.saturating_add(1);
        if breakpoint.hit_limit > 0 && breakpoint.hit_count >= breakpoint.hit_limit {
            breakpoint.enabled = false;
        }
        if breakpoint.temporary {
            self.breakpoints.remove(&hit);
        }
        Some(hit)
    }

    /// Renders the breakpoint listing as a fixed-width table.
    #[must_use]
    pub fn render_table(&self) -> String {
        if self.breakpoints.is_empty() {
            return "No breakpoints.\n".to_string();
        }
        let mut out = table_row("ID", "State", "Hits", "Limit", "Node", "Condition");
        for breakpoint in self.breakpoints.values() {
            let id = if breakpoint.temporary {
                format!("{}(temp)", breakpoint.id)
            } else {
                breakpoint.id.to_string()
            };
            let state = if breakpoint.enabled { "enabled" } else { "disabled" };
            let limit = if breakpoint.hit_limit == 0 {
                "-".to_string()
            } else {
                breakpoint.hit_limit.to_string()
            };
            let condition = breakpoint.condition.as_ref().map_or("unconditional", BreakCondition::source);
            out.push_str(&table_row(
                &id,
                state,
                &breakpoint.hit_count.to_string(),
                &limit,
                &breakpoint.node.to_string(),
                condition,
            ));
        }
        out
    }
}

/// Formats one breakpoint table row.
fn table_row(id: &str, state: &str, hits: &str, limit: &str, node: &str, condition: &str) -> String {
    let mut row = String::new();
    let _ = writeln!(row, "{id:<3} {state:<9} {hits:<5} {limit:<6} {node:<9} {condition}");
    row
}
