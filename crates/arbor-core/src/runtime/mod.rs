// crates/arbor-core/src/runtime/mod.rs
// ============================================================================
// Module: Arbor Runtime Environment
// Description: Scope chain, function and consequence dispatch, errors, stats.
// Purpose: Provide the execution environment every evaluator and debugger shares.
// Dependencies: crate::{clock, memory, value}, serde
// ============================================================================

//! ## Overview
//! The [`Runtime`] owns a stack of [`Scope`]s (the root is never popped), the
//! host function registry, the consequence handler list, the call stack used
//! for recursion guarding, the configuration, a single last-error slot, and
//! running statistics.
//!
//! Every fallible operation returns `Result` and also records the failure in
//! the last-error slot, overwriting any previous error.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod builtins;
pub mod config;
pub mod consequence;
pub mod error;
pub mod functions;
pub mod scope;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;

use crate::clock::MonotonicClock;
use crate::clock::SharedClock;
use crate::memory::NullProbe;
use crate::memory::SharedProbe;
use crate::value::Value;

pub use builtins::BUILTINS;
pub use builtins::Builtin;
pub use config::OptionValue;
pub use config::RuntimeConfig;
pub use config::RuntimeOption;
pub use consequence::Consequence;
pub use consequence::ConsequenceHandler;
pub use consequence::ConsequenceKind;
pub use consequence::HandlerFn;
pub use consequence::HandlerType;
pub use error::ErrorKind;
pub use error::RuntimeError;
pub use functions::Arity;
pub use functions::FunctionEntry;
pub use functions::FunctionRegistry;
pub use functions::NativeFunction;
pub use scope::Scope;

// ============================================================================
// SECTION: Statistics
// ============================================================================

/// Snapshot of runtime counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RuntimeStats {
    /// Successful variable writes.
    pub variables_set: u64,
    /// Successful variable reads.
    pub variables_read: u64,
    /// Function invocations (host and built-in).
    pub functions_called: u64,
    /// Consequences handled successfully.
    pub consequences_executed: u64,
    /// Consequences that failed or found no handler.
    pub consequences_failed: u64,
    /// Errors recorded in the last-error slot.
    pub errors: u64,
    /// Call-stack high-water mark.
    pub max_recursion_reached: usize,
    /// Current number of scopes, root included.
    pub scope_depth: usize,
    /// Completed GC runs.
    pub gc_runs: u64,
    /// Bytes reported freed across all GC runs.
    pub bytes_freed_total: u64,
    /// Milliseconds since the runtime was created.
    pub uptime_ms: u64,
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Execution environment for decision trees and expressions.
///
/// # Invariants
/// - `scopes` is never empty; index 0 is the root scope.
/// - `call_stack.len() <= config.max_recursion`.
pub struct Runtime {
    /// Scope stack, root first.
    scopes: Vec<Scope>,
    /// Retired scopes kept for reuse until the next GC.
    scope_pool: Vec<Scope>,
    /// Estimated bytes held by `scope_pool`.
    retired_bytes: usize,
    /// Host-registered functions.
    functions: FunctionRegistry,
    /// Consequence handlers in registration order.
    handlers: Vec<ConsequenceHandler>,
    /// Names of functions currently executing.
    call_stack: Vec<String>,
    /// Active configuration.
    config: RuntimeConfig,
    /// Most recent error.
    last_error: Option<RuntimeError>,
    /// Running counters (scope depth and uptime are filled on snapshot).
    stats: RuntimeStats,
    /// Lines emitted by the default log handler.
    log: Vec<String>,
    /// Time source.
    clock: SharedClock,
    /// Allocation counters.
    probe: SharedProbe,
    /// Clock reading at creation.
    started_at: Duration,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scopes", &self.scopes)
            .field("functions", &self.functions)
            .field("handlers", &self.handlers)
            .field("call_stack", &self.call_stack)
            .field("config", &self.config)
            .field("last_error", &self.last_error)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Creates a runtime with default configuration and a root scope.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates a runtime with the given configuration.
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        let clock = MonotonicClock::shared();
        let started_at = clock.elapsed();
        Self {
            scopes: vec![Scope::new()],
            scope_pool: Vec::new(),
            retired_bytes: 0,
            functions: FunctionRegistry::default(),
            handlers: Vec::new(),
            call_stack: Vec::new(),
            config,
            last_error: None,
            stats: RuntimeStats::default(),
            log: Vec::new(),
            clock,
            probe: NullProbe::shared(),
            started_at,
        }
    }

    /// Replaces the time source and restarts the uptime counter.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.started_at = clock.elapsed();
        self.clock = clock;
        self
    }

    /// Replaces the allocation probe.
    #[must_use]
    pub fn with_probe(mut self, probe: SharedProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Installs the default `update` and `log` consequence handlers.
    ///
    /// `update` assigns `target = args[0]` in the current scope; `log` appends
    /// `target: args...` to the buffer read by [`Runtime::take_log`].
    #[must_use]
    pub fn with_default_handlers(mut self) -> Self {
        self.register_handler(HandlerType::Update, "default-update", |runtime, consequence| {
            let value = consequence.args.first().cloned().unwrap_or_default();
            runtime.set_variable(&consequence.target, value)?;
            Ok(true)
        });
        self.register_handler(HandlerType::Log, "default-log", |runtime, consequence| {
            let parts: Vec<String> = consequence.args.iter().map(ToString::to_string).collect();
            runtime.log_message(format!("{}: {}", consequence.target, parts.join(" ")));
            Ok(true)
        });
        self
    }

    /// Returns a handle to the time source.
    #[must_use]
    pub fn clock(&self) -> SharedClock {
        Rc::clone(&self.clock)
    }

    /// Returns a handle to the allocation probe.
    #[must_use]
    pub fn probe(&self) -> SharedProbe {
        Rc::clone(&self.probe)
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the current value of an option.
    #[must_use]
    pub fn option(&self, option: RuntimeOption) -> OptionValue {
        self.config.get(option)
    }

    /// Sets an option.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the value does not fit the option.
    pub fn set_option(
        &mut self,
        option: RuntimeOption,
        value: OptionValue,
    ) -> Result<(), RuntimeError> {
        self.config.set(option, value).map_err(|error| self.raise(error))
    }

    // ------------------------------------------------------------------------
    // Variables and scopes
    // ------------------------------------------------------------------------

    /// Binds `name` in the current scope. Outer bindings are never modified.
    ///
    /// # Errors
    ///
    /// Returns an argument error for an empty name.
    pub fn set_variable(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        if name.is_empty() {
            return Err(self.raise(RuntimeError::argument("variable name must not be empty")));
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.set(name, value);
            self.stats.variables_set += 1;
        }
        Ok(())
    }

    /// Reads `name` from the nearest enclosing scope that binds it.
    ///
    /// # Errors
    ///
    /// Returns an undefined error when no scope binds `name`.
    pub fn get_variable(&mut self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(value) = self.lookup(name).cloned() {
            self.stats.variables_read += 1;
            return Ok(value);
        }
        Err(self.raise(RuntimeError::undefined(format!("undefined variable `{name}`"))))
    }

    /// Reads `name` without touching counters or the error slot.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Returns whether any scope binds `name`.
    #[must_use]
    pub fn variable_exists(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Enters a new innermost scope.
    pub fn push_scope(&mut self) {
        let scope = self.scope_pool.pop().unwrap_or_default();
        self.retired_bytes = self.retired_bytes.saturating_sub(scope.footprint());
        self.scopes.push(scope);
    }

    /// Leaves the innermost scope, dropping its bindings.
    ///
    /// Returns `false` (and does nothing) when only the root scope remains.
    pub fn pop_scope(&mut self) -> bool {
        if self.scopes.len() <= 1 {
            return false;
        }
        if let Some(mut scope) = self.scopes.pop() {
            scope.clear();
            self.retired_bytes = self.retired_bytes.saturating_add(scope.footprint());
            self.scope_pool.push(scope);
        }
        if self.retired_bytes > self.config.gc_threshold {
            self.gc();
        }
        true
    }

    /// Returns the number of scopes, root included.
    #[must_use]
    pub const fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Returns scopes from innermost to root.
    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter().rev()
    }

    // ------------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------------

    /// Registers a host function.
    ///
    /// # Errors
    ///
    /// Returns an argument error for an empty or duplicate name.
    pub fn register_function<F>(
        &mut self,
        name: &str,
        arity: Arity,
        description: Option<&str>,
        function: F,
    ) -> Result<(), RuntimeError>
    where
        F: Fn(&mut Self, &[Value]) -> Result<Value, RuntimeError> + 'static,
    {
        let entry =
            FunctionEntry::new(name, arity, description.map(str::to_string), Rc::new(function));
        self.functions.register(entry).map_err(|error| self.raise(error))
    }

    /// Returns whether `name` resolves to a host function or a built-in.
    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.get(name).is_some() || builtins::lookup(name).is_some()
    }

    /// Returns every callable name, host functions first, each group sorted.
    #[must_use]
    pub fn function_names(&self) -> Vec<String> {
        let mut host: Vec<String> = self.functions.names().map(str::to_string).collect();
        host.sort();
        let mut builtin: Vec<String> = BUILTINS
            .iter()
            .filter(|builtin| self.functions.get(builtin.name).is_none())
            .map(|builtin| builtin.name.to_string())
            .collect();
        builtin.sort();
        host.extend(builtin);
        host
    }

    /// Calls a function by name.
    ///
    /// Host registrations shadow built-ins. Errors returned by host functions
    /// are recorded in the last-error slot unless the function already
    /// recorded that same error through [`Runtime::raise`].
    ///
    /// # Errors
    ///
    /// Returns an undefined error for unknown names, an argument error on arity
    /// mismatch, a recursion error when the call stack is full, or the error
    /// produced by the function itself.
    pub fn call_function(&mut self, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let target = if let Some(entry) = self.functions.get(name) {
            Callable::Host(entry.arity(), entry.function())
        } else if let Some(builtin) = builtins::lookup(name) {
            Callable::Builtin(builtin)
        } else {
            return Err(self.raise(RuntimeError::undefined(format!("undefined function `{name}`"))));
        };

        let arity = target.arity();
        if !arity.accepts(args.len()) {
            return Err(self.raise(RuntimeError::argument(format!(
                "function `{name}` expects {arity} argument(s), got {}",
                args.len()
            ))));
        }
        if self.call_stack.len() >= self.config.max_recursion {
            return Err(self.raise(RuntimeError::new(
                ErrorKind::Recursion,
                format!(
                    "maximum recursion depth {} exceeded calling `{name}`",
                    self.config.max_recursion
                ),
            )));
        }

        self.call_stack.push(name.to_string());
        self.stats.max_recursion_reached =
            self.stats.max_recursion_reached.max(self.call_stack.len());
        self.stats.functions_called += 1;
        let errors_before = self.stats.errors;
        let result = match target {
            Callable::Host(_, function) => {
                function(self, args).map_err(|error| self.record_once(errors_before, error))
            }
            Callable::Builtin(builtin) => (builtin.function)(args).map_err(|error| self.raise(error)),
        };
        self.call_stack.pop();
        result
    }

    /// Returns the names of functions currently executing, outermost first.
    #[must_use]
    pub fn call_stack(&self) -> &[String] {
        &self.call_stack
    }

    // ------------------------------------------------------------------------
    // Consequences
    // ------------------------------------------------------------------------

    /// Appends a consequence handler.
    pub fn register_handler<F>(&mut self, handler_type: HandlerType, name: &str, handler: F)
    where
        F: Fn(&mut Self, &Consequence) -> Result<bool, RuntimeError> + 'static,
    {
        self.handlers.push(ConsequenceHandler::new(handler_type, name, Rc::new(handler)));
    }

    /// Returns registered handlers in dispatch order.
    #[must_use]
    pub fn handlers(&self) -> &[ConsequenceHandler] {
        &self.handlers
    }

    /// Dispatches a consequence to the first matching handler that accepts it.
    ///
    /// A handler error is recorded in the last-error slot unless the handler
    /// already recorded that same error.
    ///
    /// # Errors
    ///
    /// Returns the handler's error, or an undefined error when no handler
    /// reports the consequence as handled.
    pub fn execute_consequence(&mut self, consequence: &Consequence) -> Result<(), RuntimeError> {
        let candidates: Vec<HandlerFn> = self
            .handlers
            .iter()
            .filter(|handler| handler.handler_type().accepts(consequence.kind))
            .map(ConsequenceHandler::handler)
            .collect();
        for handler in candidates {
            let errors_before = self.stats.errors;
            match handler(self, consequence) {
                Ok(true) => {
                    self.stats.consequences_executed += 1;
                    return Ok(());
                }
                Ok(false) => {}
                Err(error) => {
                    self.stats.consequences_failed += 1;
                    return Err(self.record_once(errors_before, error));
                }
            }
        }
        self.stats.consequences_failed += 1;
        Err(self.raise(RuntimeError::undefined(format!(
            "no handler accepted {} consequence for `{}`",
            consequence.kind, consequence.target
        ))))
    }

    /// Appends a line to the runtime log buffer.
    pub fn log_message(&mut self, message: impl Into<String>) {
        self.log.push(message.into());
    }

    /// Drains the runtime log buffer.
    pub fn take_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log)
    }

    // ------------------------------------------------------------------------
    // Errors and statistics
    // ------------------------------------------------------------------------

    /// Records `error` in the last-error slot and returns it.
    pub fn raise(&mut self, error: RuntimeError) -> RuntimeError {
        self.stats.errors += 1;
        self.last_error = Some(error.clone());
        error
    }

    /// Records an error surfaced by host code, unless that code already
    /// raised the same error after the counter stood at `errors_before`.
    fn record_once(&mut self, errors_before: u64, error: RuntimeError) -> RuntimeError {
        let already_recorded =
            self.stats.errors > errors_before && self.last_error.as_ref() == Some(&error);
        if already_recorded { error } else { self.raise(error) }
    }

    /// Runs `f`, then restores the last-error slot and the error counter.
    ///
    /// Breakpoint conditions and watch expressions evaluate through this.
    pub fn preserving_errors<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let last_error = self.last_error.clone();
        let errors = self.stats.errors;
        let result = f(self);
        self.last_error = last_error;
        self.stats.errors = errors;
        result
    }

    /// Returns the most recent error.
    #[must_use]
    pub const fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    /// Empties the last-error slot; the error counter is kept.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Returns a statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> RuntimeStats {
        let uptime = self.clock.elapsed().saturating_sub(self.started_at);
        RuntimeStats {
            scope_depth: self.scopes.len(),
            uptime_ms: u64::try_from(uptime.as_millis()).unwrap_or(u64::MAX),
            ..self.stats
        }
    }

    // ------------------------------------------------------------------------
    // Garbage collection
    // ------------------------------------------------------------------------

    /// Returns the estimated bytes held by retired scopes.
    #[must_use]
    pub const fn retired_bytes(&self) -> usize {
        self.retired_bytes
    }

    /// Releases retired scopes and spare capacity of intermediate scopes.
    ///
    /// The root and current scopes are never touched. Returns the freed-byte
    /// estimate plus any release reported by the memory probe.
    pub fn gc(&mut self) -> u64 {
        let probe_before = self.probe.freed_bytes();
        let mut freed = self.retired_bytes;
        self.scope_pool.clear();
        self.scope_pool.shrink_to_fit();
        self.retired_bytes = 0;

        let intermediate = self.scopes.len().saturating_sub(2);
        for scope in self.scopes.iter_mut().skip(1).take(intermediate) {
            freed = freed.saturating_add(scope.shrink());
        }

        let probe_delta = self.probe.freed_bytes().saturating_sub(probe_before);
        let total = u64::try_from(freed).unwrap_or(u64::MAX).saturating_add(probe_delta);
        self.stats.gc_runs += 1;
        self.stats.bytes_freed_total = self.stats.bytes_freed_total.saturating_add(total);
        total
    }
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Resolved call target.
enum Callable {
    /// Host registration with its arity.
    Host(Arity, NativeFunction),
    /// Built-in table entry.
    Builtin(&'static Builtin),
}

impl Callable {
    /// Returns the accepted argument counts.
    const fn arity(&self) -> Arity {
        match self {
            Self::Host(arity, _) => *arity,
            Self::Builtin(builtin) => builtin.arity,
        }
    }
}
