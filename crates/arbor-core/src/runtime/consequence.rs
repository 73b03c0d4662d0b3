// crates/arbor-core/src/runtime/consequence.rs
// ============================================================================
// Module: Consequences
// Description: Side-effect requests and the typed handler registry entries.
// Purpose: Dispatch update, notify, log, and calculate effects to host handlers.
// Dependencies: crate::{runtime, value}, serde
// ============================================================================

//! ## Overview
//! A [`Consequence`] is a typed side-effect request produced by an action
//! node. Handlers are tried in registration order; the first whose
//! [`HandlerType`] matches and which reports `Ok(true)` wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use super::Runtime;
use super::error::RuntimeError;
use crate::value::Value;

// ============================================================================
// SECTION: Kinds
// ============================================================================

/// Consequence category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsequenceKind {
    /// Assign a value to a target.
    Update,
    /// Notify an external channel.
    Notify,
    /// Emit a log line.
    Log,
    /// Compute a derived value.
    Calculate,
}

impl ConsequenceKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Notify => "notify",
            Self::Log => "log",
            Self::Calculate => "calculate",
        }
    }
}

impl fmt::Display for ConsequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsequenceKind {
    type Err = RuntimeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "update" => Ok(Self::Update),
            "notify" => Ok(Self::Notify),
            "log" => Ok(Self::Log),
            "calculate" => Ok(Self::Calculate),
            other => Err(RuntimeError::argument(format!("unknown consequence kind `{other}`"))),
        }
    }
}

/// Handler filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerType {
    /// Accepts every consequence kind.
    Any,
    /// Accepts [`ConsequenceKind::Update`].
    Update,
    /// Accepts [`ConsequenceKind::Notify`].
    Notify,
    /// Accepts [`ConsequenceKind::Log`].
    Log,
    /// Accepts [`ConsequenceKind::Calculate`].
    Calculate,
}

impl HandlerType {
    /// Returns whether a handler of this type should see `kind`.
    #[must_use]
    pub const fn accepts(self, kind: ConsequenceKind) -> bool {
        matches!(
            (self, kind),
            (Self::Any, _)
                | (Self::Update, ConsequenceKind::Update)
                | (Self::Notify, ConsequenceKind::Notify)
                | (Self::Log, ConsequenceKind::Log)
                | (Self::Calculate, ConsequenceKind::Calculate)
        )
    }
}

// ============================================================================
// SECTION: Consequence
// ============================================================================

/// Evaluated side-effect request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consequence {
    /// Category used for handler dispatch.
    pub kind: ConsequenceKind,
    /// Target interpreted by the handler.
    pub target: String,
    /// Evaluated arguments.
    pub args: Vec<Value>,
}

impl Consequence {
    /// Creates a consequence.
    pub fn new(kind: ConsequenceKind, target: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            kind,
            target: target.into(),
            args,
        }
    }
}

impl fmt::Display for Consequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.kind, self.target)?;
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handler callable: `Ok(true)` handled, `Ok(false)` declined, `Err` failed.
pub type HandlerFn = Rc<dyn Fn(&mut Runtime, &Consequence) -> Result<bool, RuntimeError>>;

/// Registered consequence handler.
#[derive(Clone)]
pub struct ConsequenceHandler {
    /// Kind filter.
    handler_type: HandlerType,
    /// Handler name for diagnostics.
    name: String,
    /// Callable.
    handler: HandlerFn,
}

impl ConsequenceHandler {
    /// Creates a handler entry.
    pub fn new(handler_type: HandlerType, name: impl Into<String>, handler: HandlerFn) -> Self {
        Self {
            handler_type,
            name: name.into(),
            handler,
        }
    }

    /// Returns the kind filter.
    #[must_use]
    pub const fn handler_type(&self) -> HandlerType {
        self.handler_type
    }

    /// Returns the handler name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a handle to the callable.
    #[must_use]
    pub fn handler(&self) -> HandlerFn {
        Rc::clone(&self.handler)
    }
}

impl fmt::Debug for ConsequenceHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsequenceHandler")
            .field("handler_type", &self.handler_type)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
