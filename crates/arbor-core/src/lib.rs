// crates/arbor-core/src/lib.rs
// ============================================================================
// Module: Arbor Core Library
// Description: Public API surface for the Arbor rule runtime.
// Purpose: Expose values, trees, expressions, the runtime, and the walker.
// Dependencies: crate::{clock, expr, memory, runtime, tree, value, walker}
// ============================================================================

//! ## Overview
//! Arbor core evaluates decision trees of condition, action, and outcome
//! nodes against a scoped [`Runtime`]. Evaluation is single-threaded and
//! synchronous; time and allocation counters are injected through
//! [`Clock`] and [`MemoryProbe`] so instrumentation stays deterministic.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod clock;
pub mod expr;
pub mod memory;
pub mod runtime;
pub mod tree;
pub mod value;
pub mod walker;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::MonotonicClock;
pub use clock::SharedClock;
pub use expr::CallObserver;
pub use expr::Expr;
pub use expr::MAX_EXPR_HEIGHT;
pub use expr::NoopCallObserver;
pub use expr::ParseError;
pub use expr::parse_expression;
pub use memory::CountingProbe;
pub use memory::MemoryProbe;
pub use memory::NullProbe;
pub use memory::SharedProbe;
pub use runtime::Arity;
pub use runtime::Consequence;
pub use runtime::ConsequenceKind;
pub use runtime::ErrorKind;
pub use runtime::HandlerType;
pub use runtime::OptionValue;
pub use runtime::Runtime;
pub use runtime::RuntimeConfig;
pub use runtime::RuntimeError;
pub use runtime::RuntimeOption;
pub use runtime::RuntimeStats;
pub use tree::ConsequenceSpec;
pub use tree::DecisionTree;
pub use tree::Node;
pub use tree::NodeId;
pub use tree::NodeKind;
pub use value::Value;
pub use walker::EvalError;
pub use walker::NoopWalkObserver;
pub use walker::WalkObserver;
pub use walker::Walker;
pub use walker::evaluate_tree;
