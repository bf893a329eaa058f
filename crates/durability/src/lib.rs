//! Durability layer for stagelog
//!
//! This crate handles everything that touches disk:
//!
//! - RollingFile: the active log file, line-buffered output and in-place
//!   rotation (daily, or by size with a cyclic suffix)
//! - MmapStager: memory-mapped staging region fed through a bounded queue and
//!   drained into a [`FlushTarget`] by a single background thread
//! - Crash recovery: content left in a staging file is replayed into the log
//!   file the next time the stager opens

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod rolling; // Active log file and rotation
pub mod staging; // Memory-mapped staging buffer
pub mod target; // Flush destination abstraction

pub use rolling::{RollingFile, RotationPolicy};
pub use staging::{page_size, MmapStager, StagingConfig, DEFAULT_STAGING_PAGES};
pub use target::FlushTarget;
