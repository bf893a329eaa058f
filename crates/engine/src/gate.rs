//! Severity threshold and console echo flag
//!
//! Both are single scalars read on every record. They are stored in relaxed
//! atomics: configure before spawning writers. Concurrent reconfiguration is
//! tolerated, but not ordered with respect to records already in flight.

use stagelog_core::Severity;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Process-wide filter state consulted by the dispatcher.
#[derive(Debug)]
pub struct LevelGate {
    threshold: AtomicU8,
    console: AtomicBool,
}

impl Default for LevelGate {
    fn default() -> Self {
        Self::new(Severity::default(), true)
    }
}

impl LevelGate {
    /// Create a gate with the given threshold and console flag.
    pub fn new(threshold: Severity, console: bool) -> Self {
        LevelGate {
            threshold: AtomicU8::new(threshold.rank()),
            console: AtomicBool::new(console),
        }
    }

    /// Set the minimum severity that is emitted.
    pub fn set_level(&self, level: Severity) {
        self.threshold.store(level.rank(), Ordering::Relaxed);
    }

    /// Current minimum severity.
    pub fn level(&self) -> Severity {
        Severity::from_rank(self.threshold.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Enable or disable echoing records to the console.
    pub fn set_console(&self, enabled: bool) {
        self.console.store(enabled, Ordering::Relaxed);
    }

    /// Whether console echo is enabled.
    pub fn console(&self) -> bool {
        self.console.load(Ordering::Relaxed)
    }

    /// Whether a record at `level` passes the threshold.
    #[inline]
    pub fn allows(&self, level: Severity) -> bool {
        level >= self.level()
    }
}
