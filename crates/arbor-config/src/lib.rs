// crates/arbor-config/src/lib.rs
// ============================================================================
// Module: Arbor Config Library
// Description: Canonical config model and validation for Arbor sessions.
// Purpose: Single source of truth for arbor.toml semantics.
// Dependencies: arbor-core, arbor-debug, serde, toml
// ============================================================================

//! ## Overview
//! `arbor-config` defines the `arbor.toml` model. Loading is strict and
//! fail-closed; a validated config yields runtime options, debugger settings,
//! and a trace sink.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ArborConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::DebuggerSection;
pub use config::MAX_CONFIG_FILE_SIZE;
pub use config::RuntimeSection;
pub use config::TraceOutput;
