// crates/arbor-debug/src/coverage.rs
// ============================================================================
// Module: Coverage Analyzer
// Description: Node and branch coverage over a decision tree.
// Purpose: Measure which nodes and condition branches a session exercised.
// Dependencies: arbor-core, serde, serde_json
// ============================================================================

//! ## Overview
//! [`CoverageData::from_tree`] registers every node and, for each condition
//! node with at least two children, exactly two branches: child 0 is the
//! true branch and child 1 the false branch. Traversals of unregistered
//! pairs are appended as dynamic branches that count as covered on
//! discovery.
//!
//! Merging two sessions is a union: counts sum, covered flags OR, and
//! totals grow only for keys the destination did not have.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::time::Duration;

use arbor_core::DecisionTree;
use arbor_core::NodeId;
use arbor_core::SharedClock;
use serde::Serialize;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Coverage of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeCoverage {
    /// Node identifier.
    pub id: NodeId,
    /// Recorded visits.
    pub visit_count: u64,
    /// Whether the node was visited at least once.
    pub covered: bool,
}

/// Coverage of one directed branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BranchCoverage {
    /// Source condition node.
    pub from: NodeId,
    /// Selected child.
    pub to: NodeId,
    /// Recorded traversals.
    pub traversal_count: u64,
    /// Whether the branch was traversed at least once.
    pub covered: bool,
}

/// Serializable coverage report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    /// Session duration in milliseconds.
    pub duration_ms: u64,
    /// Registered nodes.
    pub nodes_total: usize,
    /// Covered nodes.
    pub nodes_visited: usize,
    /// Node coverage percentage.
    pub node_percentage: f64,
    /// Registered branches, dynamic ones included.
    pub branches_total: usize,
    /// Covered branches.
    pub branches_visited: usize,
    /// Branch coverage percentage.
    pub branch_percentage: f64,
    /// Condition nodes in the tree.
    pub conditions_total: usize,
    /// Leaf nodes in the tree.
    pub leaves_total: usize,
    /// Per-node detail.
    pub nodes: Vec<NodeCoverage>,
    /// Per-branch detail.
    pub branches: Vec<BranchCoverage>,
}

// ============================================================================
// SECTION: Coverage Data
// ============================================================================

/// Coverage state of one session.
///
/// # Invariants
/// - `nodes_visited` equals the number of covered node records.
/// - `branches_visited` equals the number of covered branch records.
/// - `branches_total` equals the number of branch records.
#[derive(Clone)]
pub struct CoverageData {
    /// Node records keyed by id.
    nodes: BTreeMap<NodeId, NodeCoverage>,
    /// Branch records in registration order.
    branches: Vec<BranchCoverage>,
    /// Registered node count.
    nodes_total: usize,
    /// Covered node count.
    nodes_visited: usize,
    /// Registered branch count.
    branches_total: usize,
    /// Covered branch count.
    branches_visited: usize,
    /// Condition nodes seen by the static pass.
    conditions_total: usize,
    /// Leaf nodes seen by the static pass.
    leaves_total: usize,
    /// Session clock.
    clock: SharedClock,
    /// Clock reading when the session started.
    started_at: Duration,
}

impl fmt::Debug for CoverageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoverageData")
            .field("nodes_total", &self.nodes_total)
            .field("nodes_visited", &self.nodes_visited)
            .field("branches_total", &self.branches_total)
            .field("branches_visited", &self.branches_visited)
            .finish_non_exhaustive()
    }
}

impl CoverageData {
    /// Registers the node and branch universe of `tree`.
    #[must_use]
    pub fn from_tree(tree: &DecisionTree, clock: SharedClock) -> Self {
        let mut nodes = BTreeMap::new();
        let mut branches = Vec::new();
        let mut conditions_total = 0;
        let mut leaves_total = 0;
        for node in tree.iter() {
            nodes.insert(
                node.id(),
                NodeCoverage {
                    id: node.id(),
                    visit_count: 0,
                    covered: false,
                },
            );
            if node.is_leaf() {
                leaves_total += 1;
            }
            if node.is_condition() {
                conditions_total += 1;
                if let [when_true, when_false, ..] = node.children() {
                    for to in [*when_true, *when_false] {
                        branches.push(BranchCoverage {
                            from: node.id(),
                            to,
                            traversal_count: 0,
                            covered: false,
                        });
                    }
                }
            }
        }
        let started_at = clock.elapsed();
        Self {
            nodes_total: nodes.len(),
            branches_total: branches.len(),
            nodes,
            branches,
            nodes_visited: 0,
            branches_visited: 0,
            conditions_total,
            leaves_total,
            clock,
            started_at,
        }
    }

    /// Records a visit to a registered node; unknown nodes are ignored.
    pub fn record_node(&mut self, node: NodeId) {
        let Some(record) = self.nodes.get_mut(&node) else {
            return;
        };
        record.visit_count = record.visit_count.saturating_add(1);
        if !record.covered {
            record.covered = true;
            self.nodes_visited += 1;
        }
    }

    /// Records a branch traversal, appending unregistered pairs as covered.
    pub fn record_branch(&mut self, from: NodeId, to: NodeId) {
        if let Some(record) =
            self.branches.iter_mut().find(|branch| branch.from == from && branch.to == to)
        {
            record.traversal_count = record.traversal_count.saturating_add(1);
            if !record.covered {
                record.covered = true;
                self.branches_visited += 1;
            }
            return;
        }
        self.branches.push(BranchCoverage {
            from,
            to,
            traversal_count: 1,
            covered: true,
        });
        self.branches_total += 1;
        self.branches_visited += 1;
    }

    /// Returns a node record.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&NodeCoverage> {
        self.nodes.get(&node)
    }

    /// Returns a branch record.
    #[must_use]
    pub fn branch(&self, from: NodeId, to: NodeId) -> Option<&BranchCoverage> {
        self.branches.iter().find(|branch| branch.from == from && branch.to == to)
    }

    /// Returns the registered node count.
    #[must_use]
    pub const fn nodes_total(&self) -> usize {
        self.nodes_total
    }

    /// Returns the covered node count.
    #[must_use]
    pub const fn nodes_visited(&self) -> usize {
        self.nodes_visited
    }

    /// Returns the registered branch count.
    #[must_use]
    pub const fn branches_total(&self) -> usize {
        self.branches_total
    }

    /// Returns the covered branch count.
    #[must_use]
    pub const fn branches_visited(&self) -> usize {
        self.branches_visited
    }

    /// Returns the condition node count.
    #[must_use]
    pub const fn conditions_total(&self) -> usize {
        self.conditions_total
    }

    /// Returns the leaf node count.
    #[must_use]
    pub const fn leaves_total(&self) -> usize {
        self.leaves_total
    }

    /// Returns node coverage in percent (0 when no nodes are registered).
    #[must_use]
    pub fn node_percentage(&self) -> f64 {
        percentage(self.nodes_visited, self.nodes_total)
    }

    /// Returns branch coverage in percent (0 when no branches are registered).
    #[must_use]
    pub fn branch_percentage(&self) -> f64 {
        percentage(self.branches_visited, self.branches_total)
    }

    /// Returns registered nodes never visited, in id order.
    #[must_use]
    pub fn uncovered_nodes(&self) -> Vec<NodeId> {
        self.nodes.values().filter(|node| !node.covered).map(|node| node.id).collect()
    }

    /// Returns registered branches never traversed, in registration order.
    #[must_use]
    pub fn uncovered_branches(&self) -> Vec<(NodeId, NodeId)> {
        self.branches
            .iter()
            .filter(|branch| !branch.covered)
            .map(|branch| (branch.from, branch.to))
            .collect()
    }

    /// Folds `other` into this session.
    pub fn merge(&mut self, other: &Self) {
        for incoming in other.nodes.values() {
            let record = self.nodes.entry(incoming.id).or_insert_with(|| NodeCoverage {
                id: incoming.id,
                visit_count: 0,
                covered: false,
            });
            record.visit_count = record.visit_count.saturating_add(incoming.visit_count);
            record.covered |= incoming.covered;
        }
        for incoming in &other.branches {
            if let Some(record) = self
                .branches
                .iter_mut()
                .find(|branch| branch.from == incoming.from && branch.to == incoming.to)
            {
                record.traversal_count =
                    record.traversal_count.saturating_add(incoming.traversal_count);
                record.covered |= incoming.covered;
            } else {
                self.branches.push(*incoming);
            }
        }
        self.nodes_total = self.nodes.len();
        self.nodes_visited = self.nodes.values().filter(|node| node.covered).count();
        self.branches_total = self.branches.len();
        self.branches_visited = self.branches.iter().filter(|branch| branch.covered).count();
        self.conditions_total = self.conditions_total.max(other.conditions_total);
        self.leaves_total = self.leaves_total.max(other.leaves_total);
    }

    /// Zeroes counts and covered flags, keeps the registered universe, and
    /// restarts the session clock.
    pub fn reset(&mut self) {
        for node in self.nodes.values_mut() {
            node.visit_count = 0;
            node.covered = false;
        }
        for branch in &mut self.branches {
            branch.traversal_count = 0;
            branch.covered = false;
        }
        self.nodes_visited = 0;
        self.branches_visited = 0;
        self.started_at = self.clock.elapsed();
    }

    /// Returns the session duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.clock.elapsed().saturating_sub(self.started_at)
    }

    /// Builds the serializable report.
    #[must_use]
    pub fn summary(&self) -> CoverageSummary {
        CoverageSummary {
            duration_ms: u64::try_from(self.duration().as_millis()).unwrap_or(u64::MAX),
            nodes_total: self.nodes_total,
            nodes_visited: self.nodes_visited,
            node_percentage: self.node_percentage(),
            branches_total: self.branches_total,
            branches_visited: self.branches_visited,
            branch_percentage: self.branch_percentage(),
            conditions_total: self.conditions_total,
            leaves_total: self.leaves_total,
            nodes: self.nodes.values().copied().collect(),
            branches: self.branches.clone(),
        }
    }

    /// Renders the text report.
    #[must_use]
    pub fn render_text(&self) -> String {
        let summary = self.summary();
        let mut out = String::from("Coverage report\n");
        let _ = writeln!(out, "Duration: {} ms", summary.duration_ms);
        let _ = writeln!(
            out,
            "Nodes: {}/{} ({:.1}%)",
            summary.nodes_visited, summary.nodes_total, summary.node_percentage
        );
        let _ = writeln!(
            out,
            "Branches: {}/{} ({:.1}%)",
            summary.branches_visited, summary.branches_total, summary.branch_percentage
        );
        let _ = writeln!(out, "Conditions: {}", summary.conditions_total);
        let _ = writeln!(out, "Leaves: {}", summary.leaves_total);
        let nodes: Vec<String> = self.uncovered_nodes().iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "Uncovered nodes: {}", list_or_none(&nodes));
        let branches: Vec<String> =
            self.uncovered_branches().iter().map(|(from, to)| format!("{from}->{to}")).collect();
        let _ = writeln!(out, "Uncovered branches: {}", list_or_none(&branches));
        out
    }

    /// Renders the JSON report.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.summary()).unwrap_or(serde_json::Value::Null)
    }
}

/// Computes `part / whole * 100`, treating an empty whole as 0%.
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let part = f64::from(u32::try_from(part).unwrap_or(u32::MAX));
    let whole = f64::from(u32::try_from(whole).unwrap_or(u32::MAX));
    part / whole * 100.0
}

/// Joins items with commas, or returns `none`.
fn list_or_none(items: &[String]) -> String {
    if items.is_empty() { "none".to_string() } else { items.join(", ") }
}
