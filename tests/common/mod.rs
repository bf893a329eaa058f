//! Shared test utilities for the facade test suite.
//!
//! The facade is process-wide, so every test that touches it takes
//! [`facade_lock`] first and resets the facade to a known state.

#![allow(dead_code)]

use parking_lot::{Mutex, MutexGuard};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use stagelog::{FormatFlags, Logger, LoggerOptions, Severity, SeverityCounters};

static FACADE: Mutex<()> = parking_lot::const_mutex(());

/// Serialize access to the process-wide facade and reset it.
///
/// Console echo is disabled, the level reset to DEBUG, metrics replaced by
/// fresh counters and the active logger closed.
pub fn facade_lock() -> (MutexGuard<'static, ()>, Arc<SeverityCounters>) {
    let guard = FACADE.lock();
    stagelog::close();
    stagelog::set_console(false);
    stagelog::set_level(Severity::Debug);
    let counters = Arc::new(SeverityCounters::new());
    stagelog::set_metrics(counters.clone());
    (guard, counters)
}

/// Read a file to a string, empty if missing.
pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// Poll until `cond` holds or five seconds pass.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
