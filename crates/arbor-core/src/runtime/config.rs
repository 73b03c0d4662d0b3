// crates/arbor-core/src/runtime/config.rs
// ============================================================================
// Module: Runtime Configuration
// Description: The closed set of runtime options and their values.
// Purpose: Provide typed get/set over golf mode, recursion, tracing, explanations, GC.
// Dependencies: crate::runtime::error, serde
// ============================================================================

//! ## Overview
//! Only five options are recognised. Names are parsed once into
//! [`RuntimeOption`]; values are checked against the option's type before
//! they are applied, so an invalid `set` leaves the configuration unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use super::error::RuntimeError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum call depth.
pub const DEFAULT_MAX_RECURSION: usize = 1_000;
/// Default retired-scope byte threshold that triggers an automatic GC.
pub const DEFAULT_GC_THRESHOLD: usize = 1024 * 1024;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Runtime configuration.
///
/// # Invariants
/// - `max_recursion >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Opaque golf-mode flag consumed by front ends.
    pub golf_mode: bool,
    /// Maximum call-stack length before calls fail with a recursion error.
    pub max_recursion: usize,
    /// Emit trace events to the configured trace sink.
    pub tracing: bool,
    /// Emit decision explanations to the configured explanation sink.
    pub explanations: bool,
    /// Retired-scope byte estimate that triggers an automatic GC.
    pub gc_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            golf_mode: false,
            max_recursion: DEFAULT_MAX_RECURSION,
            tracing: false,
            explanations: false,
            gc_threshold: DEFAULT_GC_THRESHOLD,
        }
    }
}

impl RuntimeConfig {
    /// Returns the current value of an option.
    #[must_use]
    pub fn get(&self, option: RuntimeOption) -> OptionValue {
        match option {
            RuntimeOption::GolfMode => OptionValue::Flag(self.golf_mode),
            RuntimeOption::MaxRecursion => OptionValue::Count(to_u64(self.max_recursion)),
            RuntimeOption::Tracing => OptionValue::Flag(self.tracing),
            RuntimeOption::Explanations => OptionValue::Flag(self.explanations),
            RuntimeOption::GcThreshold => OptionValue::Count(to_u64(self.gc_threshold)),
        }
    }

    /// Sets an option.
    ///
    /// # Errors
    ///
    /// Returns a type error when the value kind does not match the option, and
    /// a range error for a zero recursion limit.
    pub fn set(&mut self, option: RuntimeOption, value: OptionValue) -> Result<(), RuntimeError> {
        match (option, value) {
            (RuntimeOption::GolfMode, OptionValue::Flag(flag)) => self.golf_mode = flag,
            (RuntimeOption::Tracing, OptionValue::Flag(flag)) => self.tracing = flag,
            (RuntimeOption::Explanations, OptionValue::Flag(flag)) => self.explanations = flag,
            (RuntimeOption::MaxRecursion, OptionValue::Count(0)) => {
                return Err(RuntimeError::range("max_recursion must be at least 1"));
            }
            (RuntimeOption::MaxRecursion, OptionValue::Count(count)) => {
                self.max_recursion = to_usize(count);
            }
            (RuntimeOption::GcThreshold, OptionValue::Count(count)) => {
                self.gc_threshold = to_usize(count);
            }
            (option, value) => {
                return Err(RuntimeError::type_mismatch(format!(
                    "option `{option}` does not accept {}",
                    value.kind_label()
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Recognised runtime options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeOption {
    /// Golf mode (flag).
    GolfMode,
    /// Maximum recursion depth (count).
    MaxRecursion,
    /// Trace events (flag).
    Tracing,
    /// Decision explanations (flag).
    Explanations,
    /// GC threshold in bytes (count).
    GcThreshold,
}

impl RuntimeOption {
    /// Every recognised option, in display order.
    pub const ALL: [Self; 5] =
        [Self::GolfMode, Self::MaxRecursion, Self::Tracing, Self::Explanations, Self::GcThreshold];

    /// Returns the canonical option name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GolfMode => "golf",
            Self::MaxRecursion => "max_recursion",
            Self::Tracing => "tracing",
            Self::Explanations => "explanations",
            Self::GcThreshold => "gc_threshold",
        }
    }

    /// Returns true when the option takes a flag value.
    #[must_use]
    pub const fn is_flag(self) -> bool {
        matches!(self, Self::GolfMode | Self::Tracing | Self::Explanations)
    }
}

impl fmt::Display for RuntimeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RuntimeOption {
    type Err = RuntimeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let normalized = text.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "golf" | "golf_mode" => Ok(Self::GolfMode),
            "max_recursion" | "recursion" => Ok(Self::MaxRecursion),
            "tracing" | "trace" => Ok(Self::Tracing),
            "explanations" | "explain" => Ok(Self::Explanations),
            "gc_threshold" | "gc" => Ok(Self::GcThreshold),
            _ => Err(RuntimeError::argument(format!("unknown option `{text}`"))),
        }
    }
}

// ============================================================================
// SECTION: Option Values
// ============================================================================

/// Typed option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// On/off flag.
    Flag(bool),
    /// Non-negative count.
    Count(u64),
}

impl OptionValue {
    /// Parses textual input for the given option (`on`/`off`/`true`/`false`/`1`/`0` or a count).
    ///
    /// # Errors
    ///
    /// Returns a type error when the text does not fit the option.
    pub fn parse_for(option: RuntimeOption, text: &str) -> Result<Self, RuntimeError> {
        let text = text.trim();
        if option.is_flag() {
            return match text.to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" | "1" => Ok(Self::Flag(true)),
                "off" | "false" | "no" | "0" => Ok(Self::Flag(false)),
                _ => Err(RuntimeError::type_mismatch(format!(
                    "option `{option}` expects on/off, got `{text}`"
                ))),
            };
        }
        text.parse::<u64>().map(Self::Count).map_err(|_| {
            RuntimeError::type_mismatch(format!("option `{option}` expects a count, got `{text}`"))
        })
    }

    /// Returns a label describing the value kind.
    const fn kind_label(self) -> &'static str {
        match self {
            Self::Flag(_) => "a flag",
            Self::Count(_) => "a count",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(true) => f.write_str("on"),
            Self::Flag(false) => f.write_str("off"),
            Self::Count(count) => count.fmt(f),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Widens a `usize` to `u64`, saturating on exotic targets.
fn to_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Narrows a `u64` to `usize`, saturating on 32-bit targets.
fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}
