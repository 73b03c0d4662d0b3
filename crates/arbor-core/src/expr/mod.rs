// crates/arbor-core/src/expr/mod.rs
// ============================================================================
// Module: Condition Expressions
// Description: Expression tree, rendering, and evaluation against a runtime.
// Purpose: Evaluate conditions, outcomes, breakpoint guards, and watch expressions.
// Dependencies: crate::{runtime, value}
// ============================================================================

//! ## Overview
//! Expressions are the small language used inside condition and outcome
//! nodes, breakpoint conditions, and watch expressions. Evaluation reads
//! variables through the [`Runtime`] scope chain and dispatches calls through
//! [`Runtime::call_function`], reporting each call to a [`CallObserver`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod parser;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::runtime::ErrorKind;
use crate::runtime::Runtime;
use crate::runtime::RuntimeError;
use crate::value::Value;

pub use parser::MAX_EXPR_HEIGHT;
pub use parser::ParseError;
pub use parser::parse_expression;

// ============================================================================
// SECTION: Operators
// ============================================================================

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation (`!`, `not`).
    Not,
    /// Arithmetic negation (`-`).
    Negate,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+` (numeric add or string concatenation).
    Add,
    /// `-`.
    Sub,
    /// `*`.
    Mul,
    /// `/`.
    Div,
    /// `%`.
    Rem,
    /// `==`.
    Eq,
    /// `!=`.
    Ne,
    /// `<`.
    Lt,
    /// `<=`.
    Le,
    /// `>`.
    Gt,
    /// `>=`.
    Ge,
    /// Short-circuit `&&`.
    And,
    /// Short-circuit `||`.
    Or,
}

impl BinaryOp {
    /// Returns the source symbol of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

// ============================================================================
// SECTION: Expression Tree
// ============================================================================

/// Parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value.
    Literal(Value),
    /// Variable read through the scope chain.
    Variable(String),
    /// Prefix operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Self>,
    },
    /// Infix operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Self>,
        /// Right operand.
        rhs: Box<Self>,
    },
    /// Function call.
    Call {
        /// Function name.
        name: String,
        /// Argument expressions.
        args: Vec<Self>,
    },
}

impl Expr {
    /// Creates a literal expression.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Creates a variable reference.
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Creates a binary expression.
    #[must_use]
    pub fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluates the expression without observing function calls.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] on undefined names, type mismatches, or failed calls.
    pub fn evaluate(&self, runtime: &mut Runtime) -> Result<Value, RuntimeError> {
        self.evaluate_observed(runtime, &mut NoopCallObserver)
    }

    /// Evaluates the expression, reporting every function call to `observer`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] on undefined names, type mismatches, or failed calls.
    pub fn evaluate_observed(
        &self,
        runtime: &mut Runtime,
        observer: &mut dyn CallObserver,
    ) -> Result<Value, RuntimeError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Variable(name) => runtime.get_variable(name),
            Self::Unary {
                op,
                operand,
            } => {
                let value = operand.evaluate_observed(runtime, observer)?;
                apply_unary(runtime, *op, &value)
            }
            Self::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => {
                if !lhs.evaluate_observed(runtime, observer)?.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(rhs.evaluate_observed(runtime, observer)?.is_truthy()))
            }
            Self::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } => {
                if lhs.evaluate_observed(runtime, observer)?.is_truthy() {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(rhs.evaluate_observed(runtime, observer)?.is_truthy()))
            }
            Self::Binary {
                op,
                lhs,
                rhs,
            } => {
                let left = lhs.evaluate_observed(runtime, observer)?;
                let right = rhs.evaluate_observed(runtime, observer)?;
                apply_binary(runtime, *op, &left, &right)
            }
            Self::Call {
                name,
                args,
            } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.evaluate_observed(runtime, observer)?);
                }
                observer.on_call_start(name);
                let result = runtime.call_function(name, &values);
                observer.on_call_end(name);
                result
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(Value::String(text)) => write!(f, "\"{text}\""),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Variable(name) => f.write_str(name),
            Self::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "!{operand}"),
            Self::Unary {
                op: UnaryOp::Negate,
                operand,
            } => write!(f, "-{operand}"),
            Self::Binary {
                op,
                lhs,
                rhs,
            } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Self::Call {
                name,
                args,
            } => {
                write!(f, "{name}(")?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

// ============================================================================
// SECTION: Call Observation
// ============================================================================

/// Hook notified around every function call made during evaluation.
pub trait CallObserver {
    /// Called before the runtime dispatches `name`.
    fn on_call_start(&mut self, name: &str);

    /// Called after the runtime returns from `name`, whether or not it failed.
    fn on_call_end(&mut self, name: &str);
}

/// Call observer that ignores every notification.
///
/// # Invariants
/// - Zero-sized marker type; carries no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallObserver;

impl CallObserver for NoopCallObserver {
    fn on_call_start(&mut self, _name: &str) {}

    fn on_call_end(&mut self, _name: &str) {}
}

// ============================================================================
// SECTION: Operator Semantics
// ============================================================================

/// Applies a prefix operator.
fn apply_unary(runtime: &mut Runtime, op: UnaryOp, value: &Value) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
        UnaryOp::Negate => match value {
            Value::Number(number) => Ok(Value::Number(-number)),
            other => Err(runtime.raise(RuntimeError::new(
                ErrorKind::Type,
                format!("cannot negate a {}", other.type_name()),
            ))),
        },
    }
}

/// Applies an infix operator other than the short-circuit pair.
fn apply_binary(
    runtime: &mut Runtime,
    op: BinaryOp,
    left: &Value,
    right: &Value,
) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Eq => return Ok(Value::Boolean(left == right)),
        BinaryOp::Ne => return Ok(Value::Boolean(left != right)),
        BinaryOp::Add => {
            if let (Value::String(_), _) | (_, Value::String(_)) = (left, right) {
                return Ok(Value::String(format!("{left}{right}")));
            }
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            if let (Value::String(a), Value::String(b)) = (left, right) {
                return Ok(Value::Boolean(compare(op, a.cmp(b))));
            }
        }
        _ => {}
    }

    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(runtime.raise(RuntimeError::new(
            ErrorKind::Type,
            format!(
                "operator `{}` not supported for {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
        )));
    };
    let (a, b) = (*a, *b);
    match op {
        BinaryOp::Add => Ok(Value::Number(a + b)),
        BinaryOp::Sub => Ok(Value::Number(a - b)),
        BinaryOp::Mul => Ok(Value::Number(a * b)),
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => Err(runtime
            .raise(RuntimeError::new(ErrorKind::Domain, "division by zero".to_string()))),
        BinaryOp::Div => Ok(Value::Number(a / b)),
        BinaryOp::Rem => Ok(Value::Number(a % b)),
        _ => {
            let ordering = a.partial_cmp(&b);
            Ok(Value::Boolean(ordering.is_some_and(|ordering| compare(op, ordering))))
        }
    }
}

/// Maps an ordering onto a comparison operator.
const fn compare(op: BinaryOp, ordering: std::cmp::Ordering) -> bool {
    match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => false,
    }
}
