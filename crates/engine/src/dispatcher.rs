//! Record dispatch
//!
//! The `Dispatcher` is the single emission path. For every record it:
//!
//! 1. Reports records above INFO to the metrics hook, filtered or not
//! 2. Drops records below the threshold
//! 3. Runs the active logger's rotation check
//! 4. Renders `NAME prefix args...` and echoes it to the console if enabled
//! 5. Hands the line to the active logger
//!
//! Steps 3 to 5 run behind a panic boundary: a panicking `Display` impl or a
//! failure inside the sink is reported through `tracing` and never reaches
//! the caller.

use crate::gate::LevelGate;
use crate::logger::Logger;
use crate::metrics::{MetricsHook, NoopMetrics};
use parking_lot::{Mutex, RwLock};
use stagelog_core::{short_file, Clock, Severity, SystemClock};
use std::fmt::{self, Display, Write as _};
use std::io::{self, Write};
use std::panic::{catch_unwind, AssertUnwindSafe, Location};
use std::sync::Arc;
use tracing::{error, warn};

/// Console timestamp, `2009/01/23 01:23:23`.
const CONSOLE_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Owned logging configuration and emission path.
pub struct Dispatcher {
    gate: LevelGate,
    metrics: RwLock<Arc<dyn MetricsHook>>,
    logger: RwLock<Option<Arc<Logger>>>,
    console: Mutex<Box<dyn Write + Send>>,
    clock: Arc<dyn Clock>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher with threshold DEBUG, console echo to stderr, no metrics
    /// and no active logger.
    pub fn new() -> Self {
        Dispatcher {
            gate: LevelGate::default(),
            metrics: RwLock::new(Arc::new(NoopMetrics)),
            logger: RwLock::new(None),
            console: Mutex::new(Box::new(io::stderr())),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the console writer (builder pattern).
    pub fn with_console_writer(self, writer: Box<dyn Write + Send>) -> Self {
        *self.console.lock() = writer;
        self
    }

    /// Replace the clock used for console timestamps (builder pattern).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Threshold and console flag.
    pub fn gate(&self) -> &LevelGate {
        &self.gate
    }

    /// Set the minimum severity that is emitted.
    pub fn set_level(&self, level: Severity) {
        self.gate.set_level(level);
    }

    /// Current minimum severity.
    pub fn level(&self) -> Severity {
        self.gate.level()
    }

    /// Enable or disable the console echo.
    pub fn set_console(&self, enabled: bool) {
        self.gate.set_console(enabled);
    }

    /// Install the metrics hook.
    pub fn set_metrics(&self, hook: Arc<dyn MetricsHook>) {
        *self.metrics.write() = hook;
    }

    /// Install `logger` as the active logger, returning the previous one.
    ///
    /// The previous logger is not closed; that is up to the caller.
    pub fn set_logger(&self, logger: Option<Arc<Logger>>) -> Option<Arc<Logger>> {
        std::mem::replace(&mut *self.logger.write(), logger)
    }

    /// The active logger, if any.
    pub fn logger(&self) -> Option<Arc<Logger>> {
        self.logger.read().clone()
    }

    /// Emit one record.
    pub fn log(
        &self,
        level: Severity,
        prefix: &str,
        location: &Location<'_>,
        args: &[&dyn Display],
    ) {
        if level > Severity::Info {
            self.metrics.read().increment(level.name());
        }
        if !self.gate.allows(level) {
            return;
        }

        let logger = self.logger();

        if let Some(logger) = &logger {
            if catch_unwind(AssertUnwindSafe(|| logger.rotate_if_due())).is_err() {
                error!("log rotation check panicked");
            }
        }

        let emitted = catch_unwind(AssertUnwindSafe(|| {
            let line = render(level, prefix, args);
            if self.gate.console() {
                self.echo(location, &line);
            }
            if let Some(logger) = &logger {
                logger.output(Some(location), &line);
            }
        }));
        if let Err(panic) = emitted {
            error!(
                "log record dropped, emission panicked: {}",
                panic_message(panic.as_ref())
            );
        }
    }

    /// Flush the active logger.
    pub fn flush(&self) {
        if let Some(logger) = self.logger() {
            logger.flush();
        }
        if let Err(e) = self.console.lock().flush() {
            warn!(error = %e, "console flush failed");
        }
    }

    /// Release the active logger's staging resources.
    ///
    /// The logger stays installed; later records are written to its file
    /// directly.
    pub fn close(&self) {
        if let Some(logger) = self.logger() {
            logger.close();
        }
    }

    fn echo(&self, location: &Location<'_>, line: &str) {
        let mut out = String::with_capacity(line.len() + 48);
        let _ = write!(
            out,
            "{} {}:{} ",
            self.clock.now().format(CONSOLE_TIME_FORMAT),
            short_file(location.file()),
            location.line()
        );
        out.push_str(line);
        if let Err(e) = self.console.lock().write_all(out.as_bytes()) {
            warn!(error = %e, "console echo failed");
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("gate", &self.gate)
            .field("logger", &*self.logger.read())
            .finish()
    }
}

/// `NAME prefix a b c\n`
fn render(level: Severity, prefix: &str, args: &[&dyn Display]) -> String {
    let mut line = String::with_capacity(64);
    line.push_str(level.name());
    line.push(' ');
    line.push_str(prefix);
    line.push(' ');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        let _ = write!(line, "{}", arg);
    }
    line.push('\n');
    line
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}
