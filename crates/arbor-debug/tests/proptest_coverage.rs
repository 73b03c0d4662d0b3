// crates/arbor-debug/tests/proptest_coverage.rs
// ============================================================================
// Module: Coverage Property-Based Tests
// Description: Property tests for merging coverage sessions.
// Purpose: Check merge behaves as a set union over covered items.
// ============================================================================

//! Property-based tests for coverage merge invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;

use arbor_core::DecisionTree;
use arbor_core::ManualClock;
use arbor_core::NodeId;
use arbor_core::NodeKind;
use arbor_debug::CoverageData;
use proptest::prelude::*;

/// Builds a complete binary tree: conditions 1..=3, leaves 4..=7.
fn binary_tree() -> DecisionTree {
    let mut tree = DecisionTree::new();
    let root = tree.add_root(NodeKind::condition("a").unwrap());
    let left = tree.add_child(root, NodeKind::condition("b").unwrap()).unwrap();
    let right = tree.add_child(root, NodeKind::condition("c").unwrap()).unwrap();
    for parent in [left, right] {
        tree.add_child(parent, NodeKind::outcome("1").unwrap()).unwrap();
        tree.add_child(parent, NodeKind::outcome("0").unwrap()).unwrap();
    }
    tree
}

/// Static branch pairs of [`binary_tree`].
const BRANCHES: [(u32, u32); 6] = [(1, 2), (1, 3), (2, 4), (2, 5), (3, 6), (3, 7)];

/// Builds a session that visited `nodes` and traversed the selected branches.
fn session(tree: &DecisionTree, nodes: &BTreeSet<u32>, branches: &BTreeSet<usize>) -> CoverageData {
    let mut coverage = CoverageData::from_tree(tree, ManualClock::new().shared());
    for raw in nodes {
        coverage.record_node(NodeId::from_raw(*raw).unwrap());
    }
    for index in branches {
        let (from, to) = BRANCHES[*index];
        coverage.record_branch(NodeId::from_raw(from).unwrap(), NodeId::from_raw(to).unwrap());
    }
    coverage
}

proptest! {
    #[test]
    fn merge_is_union(
        left_nodes in prop::collection::btree_set(1_u32 ..= 7, 0 ..= 7),
        right_nodes in prop::collection::btree_set(1_u32 ..= 7, 0 ..= 7),
        left_branches in prop::collection::btree_set(0_usize .. 6, 0 ..= 6),
        right_branches in prop::collection::btree_set(0_usize .. 6, 0 ..= 6),
    ) {
        let tree = binary_tree();
        let mut merged = session(&tree, &left_nodes, &left_branches);
        let right = session(&tree, &right_nodes, &right_branches);
        merged.merge(&right);

        prop_assert_eq!(merged.nodes_total(), 7);
        prop_assert_eq!(merged.branches_total(), 6);
        prop_assert_eq!(merged.nodes_visited(), left_nodes.union(&right_nodes).count());
        prop_assert_eq!(merged.branches_visited(), left_branches.union(&right_branches).count());
        for raw in left_nodes.intersection(&right_nodes) {
            let record = merged.node(NodeId::from_raw(*raw).unwrap()).unwrap();
            prop_assert_eq!(record.visit_count, 2);
        }
    }

    #[test]
    fn merge_is_commutative(
        left_nodes in prop::collection::btree_set(1_u32 ..= 7, 0 ..= 7),
        right_nodes in prop::collection::btree_set(1_u32 ..= 7, 0 ..= 7),
        left_branches in prop::collection::btree_set(0_usize .. 6, 0 ..= 6),
        right_branches in prop::collection::btree_set(0_usize .. 6, 0 ..= 6),
    ) {
        let tree = binary_tree();
        let left = session(&tree, &left_nodes, &left_branches);
        let right = session(&tree, &right_nodes, &right_branches);
        let mut forward = left.clone();
        forward.merge(&right);
        let mut backward = right.clone();
        backward.merge(&left);

        prop_assert_eq!(forward.nodes_visited(), backward.nodes_visited());
        prop_assert_eq!(forward.branches_visited(), backward.branches_visited());
        prop_assert_eq!(forward.uncovered_nodes(), backward.uncovered_nodes());
        let mut forward_gaps = forward.uncovered_branches();
        let mut backward_gaps = backward.uncovered_branches();
        forward_gaps.sort();
        backward_gaps.sort();
        prop_assert_eq!(forward_gaps, backward_gaps);
    }

    #[test]
    fn merge_with_self_keeps_coverage_flags(
        nodes in prop::collection::btree_set(1_u32 ..= 7, 0 ..= 7),
        branches in prop::collection::btree_set(0_usize .. 6, 0 ..= 6),
    ) {
        let tree = binary_tree();
        let mut coverage = session(&tree, &nodes, &branches);
        let snapshot = coverage.clone();
        coverage.merge(&snapshot);

        prop_assert_eq!(coverage.nodes_visited(), nodes.len());
        prop_assert_eq!(coverage.branches_visited(), branches.len());
        prop_assert_eq!(coverage.node_percentage(), snapshot.node_percentage());
    }
}
