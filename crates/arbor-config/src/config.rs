// crates/arbor-config/src/config.rs
// ============================================================================
// Module: Arbor Configuration
// Description: Configuration loading and validation for Arbor sessions.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: arbor-core, arbor-debug, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys and out-of-range values fail the load; nothing is silently
//! clamped. A validated [`ArborConfig`] converts into the runtime's
//! [`RuntimeConfig`] and the debugger's [`DebuggerSettings`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use arbor_core::Runtime;
use arbor_core::RuntimeConfig;
use arbor_debug::Debugger;
use arbor_debug::DebuggerSettings;
use arbor_debug::FileTraceSink;
use arbor_debug::NoopTraceSink;
use arbor_debug::StderrTraceSink;
use arbor_debug::TraceSink;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "arbor.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ARBOR_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Largest accepted recursion limit.
const MAX_RECURSION_LIMIT: usize = 100_000;
/// Smallest accepted GC threshold in bytes.
const MIN_GC_THRESHOLD: usize = 1024;
/// Largest accepted profiler report limit.
const MAX_REPORT_LIMIT: usize = 1_000;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArborConfig {
    /// Runtime option defaults.
    #[serde(default)]
    pub runtime: RuntimeSection,
    /// Debugger session settings.
    #[serde(default)]
    pub debugger: DebuggerSection,
}

/// `[runtime]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSection {
    /// Golf-mode flag.
    pub golf: bool,
    /// Maximum call depth.
    pub max_recursion: usize,
    /// Emit trace events.
    pub tracing: bool,
    /// Emit decision explanations.
    pub explanations: bool,
    /// Retired-scope byte estimate that triggers GC.
    pub gc_threshold: usize,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        let defaults = RuntimeConfig::default();
        Self {
            golf: defaults.golf_mode,
            max_recursion: defaults.max_recursion,
            tracing: defaults.tracing,
            explanations: defaults.explanations,
            gc_threshold: defaults.gc_threshold,
        }
    }
}

impl RuntimeSection {
    /// Validates runtime limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1 ..= MAX_RECURSION_LIMIT).contains(&self.max_recursion) {
            return Err(ConfigError::Invalid(format!(
                "runtime.max_recursion must be between 1 and {MAX_RECURSION_LIMIT}"
            )));
        }
        if self.gc_threshold < MIN_GC_THRESHOLD {
            return Err(ConfigError::Invalid(format!(
                "runtime.gc_threshold must be at least {MIN_GC_THRESHOLD} bytes"
            )));
        }
        Ok(())
    }
}

/// Destination for trace events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutput {
    /// Drop trace events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `debugger.trace_file`.
    File,
}

/// `[debugger]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebuggerSection {
    /// Record decision history.
    pub history: bool,
    /// Retain at most this many history records.
    pub history_capacity: Option<usize>,
    /// Sample the allocation probe while profiling.
    pub memory_tracking: bool,
    /// Rows in the text profiler report.
    pub report_limit: usize,
    /// Pause at the root when a run starts.
    pub break_on_entry: bool,
    /// Trace event destination.
    pub trace_output: TraceOutput,
    /// Trace file path for [`TraceOutput::File`].
    pub trace_file: Option<String>,
}

impl Default for DebuggerSection {
    fn default() -> Self {
        let defaults = DebuggerSettings::default();
        Self {
            history: defaults.history_enabled,
            history_capacity: defaults.history_capacity,
            memory_tracking: defaults.memory_tracking,
            report_limit: defaults.report_limit,
            break_on_entry: defaults.break_on_entry,
            trace_output: TraceOutput::None,
            trace_file: None,
        }
    }
}

impl DebuggerSection {
    /// Validates debugger settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "debugger.history_capacity must be at least 1".to_string(),
            ));
        }
        if !(1 ..= MAX_REPORT_LIMIT).contains(&self.report_limit) {
            return Err(ConfigError::Invalid(format!(
                "debugger.report_limit must be between 1 and {MAX_REPORT_LIMIT}"
            )));
        }
        match (&self.trace_output, &self.trace_file) {
            (TraceOutput::File, None) => Err(ConfigError::Invalid(
                "debugger.trace_file is required when trace_output = \"file\"".to_string(),
            )),
            (TraceOutput::File, Some(path)) => validate_path_string("debugger.trace_file", path),
            (_, Some(_)) => Err(ConfigError::Invalid(
                "debugger.trace_file requires trace_output = \"file\"".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

impl ArborConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// explicit path, then `ARBOR_CONFIG`, then `arbor.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.runtime.validate()?;
        self.debugger.validate()
    }

    /// Returns the runtime configuration.
    #[must_use]
    pub const fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            golf_mode: self.runtime.golf,
            max_recursion: self.runtime.max_recursion,
            tracing: self.runtime.tracing,
            explanations: self.runtime.explanations,
            gc_threshold: self.runtime.gc_threshold,
        }
    }

    /// Returns the debugger session settings.
    #[must_use]
    pub const fn debugger_settings(&self) -> DebuggerSettings {
        DebuggerSettings {
            history_enabled: self.debugger.history,
            history_capacity: self.debugger.history_capacity,
            memory_tracking: self.debugger.memory_tracking,
            report_limit: self.debugger.report_limit,
            break_on_entry: self.debugger.break_on_entry,
        }
    }

    /// Opens the configured trace sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the trace file cannot be opened.
    pub fn trace_sink(&self) -> Result<Arc<dyn TraceSink>, ConfigError> {
        match (self.debugger.trace_output, &self.debugger.trace_file) {
            (TraceOutput::File, Some(path)) => FileTraceSink::new(Path::new(path))
                .map(|sink| Arc::new(sink) as Arc<dyn TraceSink>)
                .map_err(|err| ConfigError::Io(err.to_string())),
            (TraceOutput::Stderr, _) => Ok(Arc::new(StderrTraceSink)),
            _ => Ok(Arc::new(NoopTraceSink)),
        }
    }

    /// Builds a runtime with the default consequence handlers installed.
    #[must_use]
    pub fn build_runtime(&self) -> Runtime {
        Runtime::with_config(self.runtime_config()).with_default_handlers()
    }

    /// Builds a debugger over a fresh runtime with the configured trace sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the trace file cannot be opened.
    pub fn build_debugger(&self) -> Result<Debugger, ConfigError> {
        let sink = self.trace_sink()?;
        Ok(Debugger::new(self.build_runtime(), self.debugger_settings()).with_trace_sink(sink))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn validate_path_string_rejects_blank() {
        let result = validate_path_string("field", "   ");
        assert!(result.is_err(), "blank path should fail");
    }

    #[test]
    fn validate_path_string_rejects_long_component() {
        let long = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        let result = validate_path_string("field", &format!("dir/{long}"));
        assert!(result.is_err_and(|err| err.to_string().contains("component too long")));
    }

    #[test]
    fn resolve_path_prefers_explicit_path() {
        let resolved = resolve_path(Some(Path::new("custom.toml")));
        assert!(resolved.is_ok_and(|path| path == Path::new("custom.toml")));
    }
}
