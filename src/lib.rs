//! stagelog - Rotation-aware leveled log sink
//!
//! A process-wide logging facility that accepts leveled records from any
//! number of threads, filters them by severity, and persists them to a
//! rolling file, either directly or through a memory-mapped staging buffer
//! drained by a background writer.
//!
//! # Quick Start
//!
//! ```no_run
//! use stagelog::Severity;
//!
//! stagelog::set_level(Severity::Info);
//! stagelog::logger_set_rolling_daily("./logs", "app.log", Some("app.log.mmap"));
//!
//! stagelog::info!("server started on port", 8080);
//! stagelog::warn!("cache miss ratio", 0.42);
//!
//! stagelog::close();
//! ```
//!
//! # Architecture
//!
//! - `stagelog-core`: severities, header formatting, clocks, errors
//! - `stagelog-durability`: rolling file and mmap staging buffer
//! - `stagelog-engine`: dispatcher, loggers, metrics, config, facade
//!
//! Everything public lives in the engine and is re-exported here.

pub use stagelog_engine::*;

/// Lower layers, for callers that build their own sinks.
pub mod durability {
    pub use stagelog_durability::*;
}
