// crates/arbor-core/src/memory.rs
// ============================================================================
// Module: Memory Probes
// Description: Injectable allocation counters.
// Purpose: Feed the GC hook and profiler memory tracking without global state.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A [`MemoryProbe`] reports cumulative allocated and freed byte counts. The
//! default [`NullProbe`] reports zero; [`CountingProbe`] is a shared counter
//! that hosts (or tests) advance explicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;

// ============================================================================
// SECTION: Probe Trait
// ============================================================================

/// Source of allocation counters.
pub trait MemoryProbe {
    /// Returns cumulative bytes allocated.
    fn allocated_bytes(&self) -> u64;

    /// Returns cumulative bytes freed.
    fn freed_bytes(&self) -> u64;

    /// Returns bytes currently live.
    fn live_bytes(&self) -> u64 {
        self.allocated_bytes().saturating_sub(self.freed_bytes())
    }
}

/// Shared probe handle.
pub type SharedProbe = Rc<dyn MemoryProbe>;

// ============================================================================
// SECTION: Null Probe
// ============================================================================

/// Probe that always reports zero.
///
/// # Invariants
/// - Zero-sized marker type; carries no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProbe;

impl NullProbe {
    /// Creates a shared handle.
    #[must_use]
    pub fn shared() -> SharedProbe {
        Rc::new(Self)
    }
}

impl MemoryProbe for NullProbe {
    fn allocated_bytes(&self) -> u64 {
        0
    }

    fn freed_bytes(&self) -> u64 {
        0
    }
}

// ============================================================================
// SECTION: Counting Probe
// ============================================================================

/// Explicitly driven allocation counter.
///
/// # Invariants
/// - Clones share the same counters.
#[derive(Debug, Default, Clone)]
pub struct CountingProbe {
    /// Cumulative allocated bytes.
    allocated: Rc<Cell<u64>>,
    /// Cumulative freed bytes.
    freed: Rc<Cell<u64>>,
}

impl CountingProbe {
    /// Creates a probe with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an allocation.
    pub fn allocate(&self, bytes: u64) {
        self.allocated.set(self.allocated.get().saturating_add(bytes));
    }

    /// Records a release.
    pub fn free(&self, bytes: u64) {
        self.freed.set(self.freed.get().saturating_add(bytes));
    }

    /// Returns a shared handle over the same counters.
    #[must_use]
    pub fn shared(&self) -> SharedProbe {
        Rc::new(self.clone())
    }
}

impl MemoryProbe for CountingProbe {
    fn allocated_bytes(&self) -> u64 {
        self.allocated.get()
    }

    fn freed_bytes(&self) -> u64 {
        self.freed.get()
    }
}
