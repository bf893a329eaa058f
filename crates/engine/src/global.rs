//! Process-wide logging facade
//!
//! A single lazily-initialized [`Dispatcher`] backs the free functions in
//! this module and the `info!`-style macros. Configure it once at startup,
//! before spawning writer threads:
//!
//! ```no_run
//! use stagelog_engine::{self as log, Severity};
//!
//! log::set_level(Severity::Info);
//! log::set_console(false);
//! log::logger_set_rolling_daily("./logs", "app.log", Some("app.log.mmap"));
//!
//! log::info(&[&"listening on", &8080]);
//! log::close();
//! ```

use crate::dispatcher::Dispatcher;
use crate::logger::{Logger, LoggerOptions};
use crate::metrics::MetricsHook;
use once_cell::sync::Lazy;
use stagelog_core::{FormatFlags, Severity};
use stagelog_durability::RotationPolicy;
use std::fmt::Display;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;

static DISPATCHER: Lazy<Dispatcher> = Lazy::new(Dispatcher::new);

/// The process-wide dispatcher.
pub fn dispatcher() -> &'static Dispatcher {
    &DISPATCHER
}

/// Enable or disable echoing records to stderr.
pub fn set_console(enabled: bool) {
    DISPATCHER.set_console(enabled);
}

/// Set the minimum severity that is emitted.
pub fn set_level(level: Severity) {
    DISPATCHER.set_level(level);
}

/// Current minimum severity.
pub fn get_level() -> Severity {
    DISPATCHER.level()
}

/// Install the metrics hook called for every record above INFO.
pub fn set_metrics(hook: Arc<dyn MetricsHook>) {
    DISPATCHER.set_metrics(hook);
}

/// Replace the process-wide logger, closing the one it replaces.
pub fn install_logger(logger: Logger) {
    if let Some(previous) = DISPATCHER.set_logger(Some(Arc::new(logger))) {
        previous.close();
    }
}

fn open_or_panic(options: LoggerOptions) -> Logger {
    match Logger::open(options) {
        Ok(logger) => logger,
        Err(e) => panic!("cannot configure process-wide logger: {}", e),
    }
}

fn process_options(
    dir: impl Into<PathBuf>,
    filename: impl Into<String>,
    staging: Option<&str>,
) -> LoggerOptions {
    let options = LoggerOptions::new(dir, filename).with_flags(FormatFlags::FLAG_NORMAL);
    match staging {
        Some(name) => options.with_staging_file(name),
        None => options,
    }
}

/// Log to `<dir>/<filename>`, rotated daily to `<filename>.<YYYY-MM-DD>`.
///
/// With `staging`, records go through a memory-mapped staging file of that
/// name inside `dir`.
///
/// # Panics
///
/// Panics if the log or staging file cannot be opened.
pub fn logger_set_rolling_daily(
    dir: impl Into<PathBuf>,
    filename: impl Into<String>,
    staging: Option<&str>,
) {
    install_logger(open_or_panic(process_options(dir, filename, staging)));
}

/// Unstaged [`logger_set_rolling_daily`].
///
/// # Panics
///
/// Panics if the log file cannot be opened.
pub fn set_rolling_daily(dir: impl Into<PathBuf>, filename: impl Into<String>) {
    logger_set_rolling_daily(dir, filename, None);
}

/// Log to `<dir>/<filename>`, rotated to `<filename>.<1..=max_count>` each
/// time it reaches `max_size` bytes.
///
/// # Panics
///
/// Panics if the log or staging file cannot be opened.
pub fn logger_set_rolling_file(
    dir: impl Into<PathBuf>,
    filename: impl Into<String>,
    staging: Option<&str>,
    max_count: u32,
    max_size: u64,
) {
    let options = process_options(dir, filename, staging).with_policy(RotationPolicy::BySize {
        max_size,
        max_count,
    });
    install_logger(open_or_panic(options));
}

/// Emit one record with a prefix.
#[track_caller]
pub fn log(level: Severity, prefix: &str, args: &[&dyn Display]) {
    DISPATCHER.log(level, prefix, Location::caller(), args);
}

/// Emit at ALL.
#[track_caller]
pub fn all(args: &[&dyn Display]) {
    DISPATCHER.log(Severity::All, "", Location::caller(), args);
}

/// Emit at DEBUG.
#[track_caller]
pub fn debug(args: &[&dyn Display]) {
    DISPATCHER.log(Severity::Debug, "", Location::caller(), args);
}

/// Emit at INFO.
#[track_caller]
pub fn info(args: &[&dyn Display]) {
    DISPATCHER.log(Severity::Info, "", Location::caller(), args);
}

/// Emit at WARN.
#[track_caller]
pub fn warn(args: &[&dyn Display]) {
    DISPATCHER.log(Severity::Warn, "", Location::caller(), args);
}

/// Emit at ERROR.
#[track_caller]
pub fn error(args: &[&dyn Display]) {
    DISPATCHER.log(Severity::Error, "", Location::caller(), args);
}

/// Emit at FATAL. Does not terminate the process.
#[track_caller]
pub fn fatal(args: &[&dyn Display]) {
    DISPATCHER.log(Severity::Fatal, "", Location::caller(), args);
}

/// Drain pending staged records into the log file and flush it.
pub fn flush() {
    DISPATCHER.flush();
}

/// Release the process-wide staging resources, if in use.
///
/// Records logged afterwards go to the log file directly.
pub fn close() {
    DISPATCHER.close();
}
