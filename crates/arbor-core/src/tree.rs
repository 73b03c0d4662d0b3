// crates/arbor-core/src/tree.rs
// ============================================================================
// Module: Decision Tree Model
// Description: Arena-backed decision trees of condition, action, and outcome nodes.
// Purpose: Give evaluators and instrumentation a stable node identity and shape.
// Dependencies: crate::{expr, runtime}, serde, smallvec
// ============================================================================

//! ## Overview
//! A [`DecisionTree`] owns its nodes in an arena. Nodes refer to their parent
//! and children by [`NodeId`], so the parent link is a non-owning back
//! reference and dropping the tree frees every node exactly once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::expr::Expr;
use crate::expr::ParseError;
use crate::expr::parse_expression;
use crate::runtime::ConsequenceKind;

// ============================================================================
// SECTION: Node Identifier
// ============================================================================

/// Stable identifier of a node inside a [`DecisionTree`].
///
/// # Invariants
/// - Always >= 1; assigned sequentially in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a node identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the arena slot for this identifier.
    const fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Node Kinds
// ============================================================================

/// Consequence template attached to an action node.
///
/// # Invariants
/// - Argument expressions are evaluated each time the action executes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsequenceSpec {
    /// Consequence category used for handler dispatch.
    pub kind: ConsequenceKind,
    /// Target name (variable, channel, or metric) interpreted by the handler.
    pub target: String,
    /// Argument expressions.
    pub args: Vec<Expr>,
}

/// Node role inside a decision tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Branch on a boolean condition: child 0 when true, child 1 when false.
    Condition(Expr),
    /// Execute a consequence, then every child in order.
    Action(ConsequenceSpec),
    /// Produce the decision result.
    Outcome(Expr),
}

impl NodeKind {
    /// Parses a condition node from expression source.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the source is not a valid expression.
    pub fn condition(source: &str) -> Result<Self, ParseError> {
        parse_expression(source).map(Self::Condition)
    }

    /// Parses an outcome node from expression source.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the source is not a valid expression.
    pub fn outcome(source: &str) -> Result<Self, ParseError> {
        parse_expression(source).map(Self::Outcome)
    }

    /// Builds an action node from a kind, target, and argument sources.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when any argument is not a valid expression.
    pub fn action(
        kind: ConsequenceKind,
        target: impl Into<String>,
        args: &[&str],
    ) -> Result<Self, ParseError> {
        let args = args.iter().map(|source| parse_expression(source)).collect::<Result<_, _>>()?;
        Ok(Self::Action(ConsequenceSpec {
            kind,
            target: target.into(),
            args,
        }))
    }

    /// Returns a stable label for the node kind.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Condition(_) => "condition",
            Self::Action(_) => "action",
            Self::Outcome(_) => "outcome",
        }
    }
}

/// Decision tree node.
///
/// # Invariants
/// - `parent` is `None` only for roots.
/// - Every id in `children` names a node whose `parent` is this node.
#[derive(Debug, Clone)]
pub struct Node {
    /// Node identifier.
    id: NodeId,
    /// Node role and payload.
    kind: NodeKind,
    /// Optional human-readable label.
    label: Option<String>,
    /// Ordered children.
    children: SmallVec<[NodeId; 2]>,
    /// Non-owning parent link.
    parent: Option<NodeId>,
    /// Number of times an evaluator executed this node.
    visit_count: u64,
}

impl Node {
    /// Returns the node identifier.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the node kind.
    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns the optional label.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the ordered children.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the parent node, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns how many times the node was executed.
    #[must_use]
    pub const fn visit_count(&self) -> u64 {
        self.visit_count
    }

    /// Returns true for condition nodes.
    #[must_use]
    pub const fn is_condition(&self) -> bool {
        matches!(self.kind, NodeKind::Condition(_))
    }

    /// Returns true for nodes without children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// ============================================================================
// SECTION: Decision Tree
// ============================================================================

/// Arena of decision tree nodes.
///
/// # Invariants
/// - Node `n` lives at arena slot `n - 1`.
/// - The first inserted root is the evaluation entry point.
#[derive(Debug, Clone, Default)]
pub struct DecisionTree {
    /// Node arena in insertion order.
    nodes: Vec<Node>,
    /// Entry point for evaluation.
    root: Option<NodeId>,
}

impl DecisionTree {
    /// Creates an empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Builds the canonical three-node tree: a condition with a true and a false outcome.
    #[must_use]
    pub fn condition_tree(condition: Expr, when_true: Expr, when_false: Expr) -> Self {
        let mut tree = Self::new();
        let root = tree.add_root(NodeKind::Condition(condition));
        tree.add_child(root, NodeKind::Outcome(when_true));
        tree.add_child(root, NodeKind::Outcome(when_false));
        tree
    }

    /// Adds a parentless node. The first root added becomes the entry point.
    pub fn add_root(&mut self, kind: NodeKind) -> NodeId {
        let id = self.push(kind, None);
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// Adds a child under `parent`, returning `None` when the parent is unknown.
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.get(parent)?;
        let id = self.push(kind, Some(parent));
        self.nodes[parent.index()].children.push(id);
        Some(id)
    }

    /// Attaches a label to an existing node.
    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.label = Some(label.into());
        }
    }

    /// Returns the evaluation entry point.
    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Returns whether the node exists.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Returns the number of nodes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the tree has no nodes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Computes the depth of a node by walking parent links (root = 0).
    ///
    /// Returns `None` when the node is unknown.
    #[must_use]
    pub fn depth_of(&self, id: NodeId) -> Option<usize> {
        let mut node = self.get(id)?;
        let mut depth = 0;
        while let Some(parent) = node.parent {
            node = self.get(parent)?;
            depth += 1;
            if depth > self.nodes.len() {
                return None;
            }
        }
        Some(depth)
    }

    /// Increments the visit counter of a node.
    pub fn record_visit(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.visit_count += 1;
        }
    }

    /// Resets every visit counter to zero.
    pub fn reset_visits(&mut self) {
        for node in &mut self.nodes {
            node.visit_count = 0;
        }
    }

    /// Appends a node to the arena.
    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let raw = u32::try_from(self.nodes.len() + 1).unwrap_or(u32::MAX);
        let id = NodeId(raw);
        self.nodes.push(Node {
            id,
            kind,
            label: None,
            children: SmallVec::new(),
            parent,
            visit_count: 0,
        });
        id
    }
}
