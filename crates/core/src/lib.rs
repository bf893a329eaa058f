//! Core types for stagelog
//!
//! This crate defines the foundational types shared by the sink and the
//! dispatcher:
//! - Severity: Ordered log levels (ALL..OFF)
//! - FormatFlags / LineFormat: Line header rendering (date, time, file:line)
//! - Clock: Time source, swappable for deterministic rotation tests
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod error;
pub mod format;
pub mod level;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LogError, Result};
pub use format::{short_file, FormatFlags, LineFormat};
pub use level::{level_desc, Severity};

/// One kibibyte, for size-based rotation limits.
pub const KB: u64 = 1 << 10;
/// One mebibyte.
pub const MB: u64 = 1 << 20;
/// One gibibyte.
pub const GB: u64 = 1 << 30;
/// One tebibyte.
pub const TB: u64 = 1 << 40;
