// crates/arbor-core/src/clock.rs
// ============================================================================
// Module: Clocks
// Description: Injectable time sources for uptime, profiling, and history.
// Purpose: Keep timing deterministic under test while defaulting to real time.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every component that measures time reads it through [`Clock`]. Production
//! code uses [`MonotonicClock`]; tests use [`ManualClock`] and advance it
//! explicitly so durations are exact.
//!
//! Two readings are exposed: a monotonic elapsed duration used for intervals,
//! and a wall-clock offset from the Unix epoch used for record timestamps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

// ============================================================================
// SECTION: Clock Trait
// ============================================================================

/// Time source.
pub trait Clock {
    /// Returns monotonic time elapsed since the clock was created.
    fn elapsed(&self) -> Duration;

    /// Returns wall-clock time as an offset from the Unix epoch.
    fn unix_time(&self) -> Duration;
}

/// Shared clock handle.
pub type SharedClock = Rc<dyn Clock>;

// ============================================================================
// SECTION: Monotonic Clock
// ============================================================================

/// Clock backed by [`Instant`] and [`SystemTime`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    /// Creation instant.
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Creates a shared clock handle.
    #[must_use]
    pub fn shared() -> SharedClock {
        Rc::new(Self::new())
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    fn unix_time(&self) -> Duration {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Manual Clock
// ============================================================================

/// Clock advanced explicitly by the caller.
///
/// # Invariants
/// - Clones share the same reading.
/// - `unix_time` is `epoch_offset + elapsed`.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    /// Current elapsed reading.
    elapsed: Rc<Cell<Duration>>,
    /// Wall-clock offset corresponding to elapsed zero.
    epoch_offset: Duration,
}

impl ManualClock {
    /// Creates a clock at elapsed zero anchored at the Unix epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock whose elapsed zero corresponds to `unix` wall-clock time.
    #[must_use]
    pub fn starting_at(unix: Duration) -> Self {
        Self {
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
            epoch_offset: unix,
        }
    }

    /// Advances the clock.
    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get().saturating_add(by));
    }

    /// Returns a shared handle reading the same time.
    #[must_use]
    pub fn shared(&self) -> SharedClock {
        Rc::new(self.clone())
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    fn unix_time(&self) -> Duration {
        self.epoch_offset.saturating_add(self.elapsed.get())
    }
}
