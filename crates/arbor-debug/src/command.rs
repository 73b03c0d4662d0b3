// crates/arbor-debug/src/command.rs
// ============================================================================
// Module: Debugger Commands
// Description: Closed command set parsed once from operator text.
// Purpose: Replace string dispatch with a typed command enum.
// Dependencies: arbor-core, thiserror
// ============================================================================

//! ## Overview
//! [`Command`] is the complete debugger vocabulary. Text is parsed once with
//! [`str::parse`]; verbs are case-insensitive and accept the usual short
//! aliases (`s`, `n`, `c`, `b`, `p`, `q`). Expression arguments stay as text
//! and are parsed by the subsystem that owns them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use arbor_core::EvalError;
use arbor_core::NodeId;
use arbor_core::OptionValue;
use arbor_core::ParseError;
use arbor_core::RuntimeError;
use arbor_core::RuntimeOption;
use thiserror::Error;

use crate::breakpoint::BreakpointId;
use crate::watch::WatchId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Debugger session failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebuggerError {
    /// No tree has been loaded.
    #[error("no decision tree loaded")]
    NoTree,
    /// The command needs a walk in progress.
    #[error("the tree is not being evaluated; use `run` first")]
    NotRunning,
    /// Tree evaluation failed.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Command parse and execution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Blank input.
    #[error("empty command")]
    Empty,
    /// Unrecognized verb.
    #[error("unknown command `{0}`; try `help`")]
    Unknown(String),
    /// A required argument was missing.
    #[error("`{command}` requires {argument}")]
    MissingArgument {
        /// Verb.
        command: &'static str,
        /// Description of the missing argument.
        argument: &'static str,
    },
    /// An argument failed to parse.
    #[error("`{command}`: invalid {argument} `{value}`")]
    InvalidArgument {
        /// Verb.
        command: &'static str,
        /// Description of the argument.
        argument: &'static str,
        /// Offending text.
        value: String,
    },
    /// Breakpoint id not found.
    #[error("no breakpoint {0}")]
    UnknownBreakpoint(BreakpointId),
    /// Watch id not found.
    #[error("no watch {0}")]
    UnknownWatch(WatchId),
    /// Node id not in the loaded tree.
    #[error("node {0} is not in the loaded tree")]
    UnknownNode(NodeId),
    /// History index out of range.
    #[error("no history record at index {0}")]
    UnknownRecord(usize),
    /// Expression syntax error.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Runtime error while evaluating or configuring.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    /// Session state error.
    #[error(transparent)]
    Debugger(#[from] DebuggerError),
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// `info` subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoTopic {
    /// Breakpoint table.
    Breakpoints,
    /// Watch list with current values.
    Watches,
    /// Runtime statistics.
    Stats,
}

/// Debugger command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start evaluation from the root.
    Run,
    /// Execute exactly one node.
    Step,
    /// Execute the current node and its subtree.
    Next,
    /// Resume until a breakpoint or completion.
    Continue,
    /// Add a breakpoint.
    Break {
        /// Target node.
        node: NodeId,
        /// Optional condition text.
        condition: Option<String>,
        /// Remove after the first trigger.
        temporary: bool,
    },
    /// Remove a breakpoint.
    Delete(BreakpointId),
    /// Re-arm a breakpoint.
    Enable(BreakpointId),
    /// Disarm a breakpoint.
    Disable(BreakpointId),
    /// Replace or remove a breakpoint condition.
    Condition {
        /// Breakpoint.
        id: BreakpointId,
        /// New condition text; `None` removes it.
        condition: Option<String>,
    },
    /// Set a breakpoint hit limit (0 removes it).
    Limit {
        /// Breakpoint.
        id: BreakpointId,
        /// Hit limit.
        limit: u64,
    },
    /// Show session information.
    Info(InfoTopic),
    /// Add a watch expression.
    Watch(String),
    /// Remove a watch expression.
    Unwatch(WatchId),
    /// Evaluate and print an expression.
    Print(String),
    /// Set a runtime option.
    Set {
        /// Option.
        option: RuntimeOption,
        /// Parsed value.
        value: OptionValue,
    },
    /// Bind a variable in the current scope.
    Let {
        /// Variable name.
        name: String,
        /// Expression text.
        expr: String,
    },
    /// Show the coverage report.
    Coverage(ReportFormat),
    /// Show the decision history.
    History(ReportFormat),
    /// Show the root-to-node path ending at a history index.
    Path(usize),
    /// Show the profiler report.
    Profile(ReportFormat),
    /// Reset coverage, history, and profiler data.
    Reset,
    /// Show command help.
    Help,
    /// End the session.
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));
        match verb.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "run" | "r" => Ok(Self::Run),
            "step" | "s" => Ok(Self::Step),
            "next" | "n" => Ok(Self::Next),
            "continue" | "c" => Ok(Self::Continue),
            "break" | "b" => parse_break("break", rest, false),
            "tbreak" => parse_break("tbreak", rest, true),
            "delete" | "d" => Ok(Self::Delete(breakpoint_id("delete", rest)?)),
            "enable" => Ok(Self::Enable(breakpoint_id("enable", rest)?)),
            "disable" => Ok(Self::Disable(breakpoint_id("disable", rest)?)),
            "condition" => {
                let (id, condition) = split_word(rest);
                Ok(Self::Condition {
                    id: breakpoint_id("condition", id)?,
                    condition: (!condition.is_empty()).then(|| condition.to_string()),
                })
            }
            "limit" => {
                let (id, limit) = split_word(rest);
                let id = breakpoint_id("limit", id)?;
                let limit = required("limit", "a hit count", limit)?;
                let limit = limit.parse().map_err(|_| invalid("limit", "hit count", limit))?;
                Ok(Self::Limit {
                    id,
                    limit,
                })
            }
            "info" | "i" => match rest.to_ascii_lowercase().as_str() {
                "breakpoints" | "break" | "b" => Ok(Self::Info(InfoTopic::Breakpoints)),
                "watches" | "watch" | "w" => Ok(Self::Info(InfoTopic::Watches)),
                "stats" | "s" => Ok(Self::Info(InfoTopic::Stats)),
                "" => Err(CommandError::MissingArgument {
                    command: "info",
                    argument: "a topic (breakpoints, watches, stats)",
                }),
                _ => Err(invalid("info", "topic", rest)),
            },
            "watch" => Ok(Self::Watch(required("watch", "an expression", rest)?.to_string())),
            "unwatch" => {
                let raw = required("unwatch", "a watch id", rest)?;
                raw.parse::<u32>()
                    .ok()
                    .and_then(WatchId::from_raw)
                    .map(Self::Unwatch)
                    .ok_or_else(|| invalid("unwatch", "watch id", raw))
            }
            "print" | "p" => Ok(Self::Print(required("print", "an expression", rest)?.to_string())),
            "set" => {
                let (option, value) = split_word(rest);
                let option: RuntimeOption = required("set", "an option name", option)?.parse()?;
                let value = OptionValue::parse_for(option, required("set", "a value", value)?)?;
                Ok(Self::Set {
                    option,
                    value,
                })
            }
            "let" => {
                let Some((name, expr)) = rest.split_once('=') else {
                    return Err(CommandError::MissingArgument {
                        command: "let",
                        argument: "`<name> = <expr>`",
                    });
                };
                let name = name.trim();
                if !is_identifier(name) {
                    return Err(invalid("let", "variable name", name));
                }
                Ok(Self::Let {
                    name: name.to_string(),
                    expr: required("let", "an expression", expr.trim())?.to_string(),
                })
            }
            "coverage" | "cov" => Ok(Self::Coverage(report_format("coverage", rest)?)),
            "history" | "hist" => Ok(Self::History(report_format("history", rest)?)),
            "profile" | "prof" => Ok(Self::Profile(report_format("profile", rest)?)),
            "path" => {
                let raw = required("path", "a history index", rest)?;
                raw.parse().map(Self::Path).map_err(|_| invalid("path", "history index", raw))
            }
            "reset" => Ok(Self::Reset),
            "help" | "h" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(verb.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Help
// ============================================================================

/// Command summary shown by `help`.
pub const HELP_TEXT: &str = "\
Commands:
  run | r                      start evaluating from the root
  step | s                     execute one node
  next | n                     execute the current node and its subtree
  continue | c                 resume until a breakpoint or completion
  break | b <node> [if <expr>] set a breakpoint
  tbreak <node> [if <expr>]    set a one-shot breakpoint
  delete | d <id>              remove a breakpoint
  enable <id> / disable <id>   arm or disarm a breakpoint
  condition <id> [expr]        replace or clear a breakpoint condition
  limit <id> <n>               auto-disable after n hits (0 = unlimited)
  info breakpoints|watches|stats
  watch <expr> / unwatch <id>  manage watch expressions
  print | p <expr>             evaluate an expression
  set <option> <value>         golf, max_recursion, tracing, explanations, gc_threshold
  let <name> = <expr>          bind a variable in the current scope
  coverage [json]              coverage report
  history [json]               decision history
  path <index>                 root-to-node path for a history record
  profile [json]               profiler report
  reset                        clear coverage, history, and profiler data
  help | h                     this text
  quit | exit | q              end the session
";

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses `<node> [if <expr>]`.
fn parse_break(command: &'static str, rest: &str, temporary: bool) -> Result<Command, CommandError> {
    let (raw, tail) = split_word(rest);
    let raw = required(command, "a node id", raw)?;
    let node = raw
        .parse::<u32>()
        .ok()
        .and_then(NodeId::from_raw)
        .ok_or_else(|| invalid(command, "node id", raw))?;
    let condition = if tail.is_empty() {
        None
    } else {
        let (keyword, expr) = split_word(tail);
        if !keyword.eq_ignore_ascii_case("if") {
            return Err(invalid(command, "condition clause", tail));
        }
        Some(required(command, "a condition after `if`", expr)?.to_string())
    };
    Ok(Command::Break {
        node,
        condition,
        temporary,
    })
}

/// Parses a breakpoint id argument.
fn breakpoint_id(command: &'static str, raw: &str) -> Result<BreakpointId, CommandError> {
    let raw = required(command, "a breakpoint id", raw)?;
    raw.parse::<u32>()
        .ok()
        .and_then(BreakpointId::from_raw)
        .ok_or_else(|| invalid(command, "breakpoint id", raw))
}

/// Parses an optional `json` format flag.
fn report_format(command: &'static str, rest: &str) -> Result<ReportFormat, CommandError> {
    match rest.to_ascii_lowercase().as_str() {
        "" | "text" => Ok(ReportFormat::Text),
        "json" => Ok(ReportFormat::Json),
        _ => Err(invalid(command, "format", rest)),
    }
}

/// Splits off the first whitespace-delimited word.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    text.split_once(char::is_whitespace).map_or((text, ""), |(word, rest)| (word, rest.trim()))
}

/// Rejects an empty argument.
fn required<'a>(
    command: &'static str,
    argument: &'static str,
    value: &'a str,
) -> Result<&'a str, CommandError> {
    if value.is_empty() {
        Err(CommandError::MissingArgument {
            command,
            argument,
        })
    } else {
        Ok(value)
    }
}

/// Builds an invalid-argument error.
fn invalid(command: &'static str, argument: &'static str, value: &str) -> CommandError {
    CommandError::InvalidArgument {
        command,
        argument,
        value: value.to_string(),
    }
}

/// Returns whether `name` is a valid variable name.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|rest| rest.is_ascii_alphanumeric() || rest == '_')
}
