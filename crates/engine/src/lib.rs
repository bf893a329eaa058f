//! Logging engine for stagelog
//!
//! This crate wires the lower layers into a usable log sink:
//! - LevelGate: severity threshold and console flag
//! - Dispatcher: metrics hook, filtering, rendering, panic boundary
//! - Logger: rolling file with an optional staging buffer in front
//! - LogConfig: `stagelog.toml` loading and installation
//! - Process-wide facade: free functions and `info!`-style macros
//!
//! The engine is the only component that knows about:
//! - The active process-wide logger
//! - Metrics reporting
//! - Console echo

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatcher;
pub mod gate;
pub mod global;
pub mod logger;
mod macros;
pub mod metrics;

pub use config::{LogConfig, RotationConfig, RotationMode, CONFIG_FILE_NAME};
pub use dispatcher::Dispatcher;
pub use gate::LevelGate;
pub use global::{
    all, close, debug, dispatcher, error, fatal, flush, get_level, info, install_logger, log,
    logger_set_rolling_daily, logger_set_rolling_file, set_console, set_level, set_metrics,
    set_rolling_daily, warn,
};
pub use logger::{new_logger, Logger, LoggerOptions};
pub use metrics::{MetricsHook, NoopMetrics, PrometheusMetrics, SeverityCounters};

pub use stagelog_core::{
    level_desc, Clock, FormatFlags, LineFormat, LogError, ManualClock, Result, Severity,
    SystemClock, GB, KB, MB, TB,
};
pub use stagelog_durability::{MmapStager, RollingFile, RotationPolicy, StagingConfig};
