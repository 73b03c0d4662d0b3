// crates/arbor-core/src/walker.rs
// ============================================================================
// Module: Stepping Tree Walker
// Description: Work-list evaluation of decision trees, one node per step.
// Purpose: Let debuggers pause before any node while plain callers run to completion.
// Dependencies: crate::{expr, runtime, tree, value}, thiserror
// ============================================================================

//! ## Overview
//! [`Walker`] evaluates a [`DecisionTree`] with an explicit stack of
//! enter/exit work items instead of native recursion. Each call to
//! [`Walker::step`] executes exactly one node and reports what happened to a
//! [`WalkObserver`].
//!
//! Semantics:
//! - Condition: truthy selects child 0, falsy selects child 1. Without an
//!   applicable child the condition is a dead end and the result is null.
//! - Action: the consequence executes, then every child runs in order.
//! - Outcome: the value becomes the walk result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use thiserror::Error;

use crate::expr::CallObserver;
use crate::runtime::Consequence;
use crate::runtime::Runtime;
use crate::runtime::RuntimeError;
use crate::tree::ConsequenceSpec;
use crate::tree::DecisionTree;
use crate::tree::NodeId;
use crate::tree::NodeKind;
use crate::value::Value;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tree evaluation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A node failed to evaluate.
    #[error("node {node}: {source}")]
    Node {
        /// Failing node.
        node: NodeId,
        /// Underlying runtime error.
        source: RuntimeError,
    },
    /// A work item referenced a node the tree does not contain.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}

impl EvalError {
    /// Returns the node the error is attributed to.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        match self {
            Self::Node {
                node, ..
            } => *node,
            Self::UnknownNode(node) => *node,
        }
    }
}

// ============================================================================
// SECTION: Observer
// ============================================================================

/// Hooks invoked while walking a tree.
///
/// Function calls made by node expressions arrive through the
/// [`CallObserver`] supertrait.
pub trait WalkObserver: CallObserver {
    /// Called before a node executes.
    fn on_enter(&mut self, _tree: &DecisionTree, _node: NodeId) {}

    /// Called after a node executes with its decision value and evaluation time.
    fn on_decision(
        &mut self,
        _tree: &DecisionTree,
        _node: NodeId,
        _value: &Value,
        _elapsed: Duration,
    ) {
    }

    /// Called when a condition selects a child.
    fn on_branch(&mut self, _from: NodeId, _to: NodeId) {}

    /// Called once a node and its selected subtree have finished.
    fn on_exit(&mut self, _tree: &DecisionTree, _node: NodeId) {}
}

/// Walk observer that ignores every notification.
///
/// # Invariants
/// - Zero-sized marker type; carries no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWalkObserver;

impl CallObserver for NoopWalkObserver {
    fn on_call_start(&mut self, _name: &str) {}

    fn on_call_end(&mut self, _name: &str) {}
}

impl WalkObserver for NoopWalkObserver {}

// ============================================================================
// SECTION: Walker
// ============================================================================

/// Pending unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkItem {
    /// Execute the node.
    Enter(NodeId),
    /// The node's subtree is complete.
    Exit(NodeId),
}

/// Stepping evaluator over one tree.
///
/// # Invariants
/// - After every step the top of the work list is an `Enter` item or the list
///   is empty.
#[derive(Debug, Clone, Default)]
pub struct Walker {
    /// Work list; the last item runs next.
    work: Vec<WorkItem>,
    /// Walk result (last outcome value, or null after a dead end).
    result: Option<Value>,
    /// Decision value of the most recently executed node.
    last_decision: Option<(NodeId, Value)>,
    /// Nodes executed so far.
    steps: u64,
}

impl Walker {
    /// Creates a walker positioned at the tree root.
    #[must_use]
    pub fn new(tree: &DecisionTree) -> Self {
        let mut walker = Self::default();
        if let Some(root) = tree.root() {
            walker.work.push(WorkItem::Enter(root));
        }
        walker
    }

    /// Returns the node the next step will execute.
    #[must_use]
    pub fn next_node(&self) -> Option<NodeId> {
        self.work.iter().rev().find_map(|item| match item {
            WorkItem::Enter(node) => Some(*node),
            WorkItem::Exit(_) => None,
        })
    }

    /// Returns whether no work remains.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.work.is_empty()
    }

    /// Returns the walk result so far.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the most recent decision.
    #[must_use]
    pub fn last_decision(&self) -> Option<(NodeId, &Value)> {
        self.last_decision.as_ref().map(|(node, value)| (*node, value))
    }

    /// Returns the number of nodes executed.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Returns how many entered nodes have not yet exited.
    #[must_use]
    pub fn open_nodes(&self) -> usize {
        self.work.iter().filter(|item| matches!(item, WorkItem::Exit(_))).count()
    }

    /// Executes exactly one node.
    ///
    /// Returns the executed node, or `None` when the walk is already finished.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] when the node fails; the walk is then abandoned.
    pub fn step(
        &mut self,
        tree: &mut DecisionTree,
        runtime: &mut Runtime,
        observer: &mut dyn WalkObserver,
    ) -> Result<Option<NodeId>, EvalError> {
        self.drain_exits(tree, observer);
        let Some(WorkItem::Enter(node)) = self.work.pop() else {
            return Ok(None);
        };
        match self.execute(node, tree, runtime, observer) {
            Ok(()) => {
                self.steps += 1;
                self.drain_exits(tree, observer);
                Ok(Some(node))
            }
            Err(error) => {
                self.work.clear();
                Err(error)
            }
        }
    }

    /// Runs until the walk finishes.
    ///
    /// # Errors
    ///
    /// Returns the first [`EvalError`] encountered.
    pub fn run(
        &mut self,
        tree: &mut DecisionTree,
        runtime: &mut Runtime,
        observer: &mut dyn WalkObserver,
    ) -> Result<Value, EvalError> {
        while self.step(tree, runtime, observer)?.is_some() {}
        Ok(self.result.clone().unwrap_or_default())
    }

    /// Executes one node and schedules its follow-up work.
    fn execute(
        &mut self,
        node: NodeId,
        tree: &mut DecisionTree,
        runtime: &mut Runtime,
        observer: &mut dyn WalkObserver,
    ) -> Result<(), EvalError> {
        let Some(current) = tree.get(node) else {
            return Err(EvalError::UnknownNode(node));
        };
        let kind = current.kind().clone();
        let children: Vec<NodeId> = current.children().to_vec();

        observer.on_enter(tree, node);
        tree.record_visit(node);
        let clock = runtime.clock();
        let started = clock.elapsed();
        let fail = |source: RuntimeError| EvalError::Node {
            node,
            source,
        };

        let value = match &kind {
            NodeKind::Condition(expr) => {
                let value = expr.evaluate_observed(runtime, &mut *observer).map_err(fail)?;
                let selected = if value.is_truthy() { children.first() } else { children.get(1) };
                self.work.push(WorkItem::Exit(node));
                if let Some(child) = selected {
                    self.work.push(WorkItem::Enter(*child));
                    observer.on_branch(node, *child);
                } else {
                    self.result = Some(Value::Null);
                }
                value
            }
            NodeKind::Action(spec) => {
                let consequence = build_consequence(spec, runtime, &mut *observer).map_err(fail)?;
                runtime.execute_consequence(&consequence).map_err(fail)?;
                self.work.push(WorkItem::Exit(node));
                for child in children.iter().rev() {
                    self.work.push(WorkItem::Enter(*child));
                }
                Value::String(consequence.to_string())
            }
            NodeKind::Outcome(expr) => {
                let value = expr.evaluate_observed(runtime, &mut *observer).map_err(fail)?;
                self.work.push(WorkItem::Exit(node));
                self.result = Some(value.clone());
                value
            }
        };

        let elapsed = clock.elapsed().saturating_sub(started);
        observer.on_decision(tree, node, &value, elapsed);
        self.last_decision = Some((node, value));
        Ok(())
    }

    /// Pops completed exit items.
    fn drain_exits(&mut self, tree: &DecisionTree, observer: &mut dyn WalkObserver) {
        while let Some(WorkItem::Exit(node)) = self.work.last().copied() {
            self.work.pop();
            observer.on_exit(tree, node);
        }
    }
}

/// Evaluates a consequence template into a concrete request.
fn build_consequence(
    spec: &ConsequenceSpec,
    runtime: &mut Runtime,
    observer: &mut dyn CallObserver,
) -> Result<Consequence, RuntimeError> {
    let args = spec
        .args
        .iter()
        .map(|arg| arg.evaluate_observed(runtime, &mut *observer))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Consequence::new(spec.kind, spec.target.clone(), args))
}

// ============================================================================
// SECTION: Convenience
// ============================================================================

/// Evaluates a tree to completion without instrumentation.
///
/// # Errors
///
/// Returns the first [`EvalError`] encountered.
pub fn evaluate_tree(tree: &mut DecisionTree, runtime: &mut Runtime) -> Result<Value, EvalError> {
    Walker::new(tree).run(tree, runtime, &mut NoopWalkObserver)
}
