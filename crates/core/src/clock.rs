//! Time source
//!
//! Rotation compares local calendar days, and headers carry wall-clock time.
//! Both read from a [`Clock`] so tests can step across midnight without
//! waiting for one.

use chrono::{DateTime, Duration, Local, NaiveDate};
use parking_lot::Mutex;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;

    /// Current local calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    /// Start at `now`.
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Start at the current system time.
    pub fn starting_now() -> Self {
        Self::new(Local::now())
    }

    /// Jump to `now`.
    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock() = now;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock()
    }
}
