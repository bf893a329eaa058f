//! Logger handle
//!
//! A `Logger` pairs a [`RollingFile`] with an optional [`MmapStager`] in
//! front of it. Without staging, every line is rendered and written by the
//! calling thread. With staging, the calling thread renders the line and
//! enqueues it; the stager's consumer thread writes it to the file.

use stagelog_core::{Clock, FormatFlags, LineFormat, Result, SystemClock};
use stagelog_durability::{FlushTarget, MmapStager, RollingFile, RotationPolicy, StagingConfig};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// Everything needed to open a [`Logger`].
#[derive(Clone)]
pub struct LoggerOptions {
    /// Directory holding the active and rotated files
    pub dir: PathBuf,
    /// Active file name
    pub filename: String,
    /// Staging file name inside `dir`; `None` writes directly
    pub staging_filename: Option<String>,
    /// Rotation policy of the active file
    pub policy: RotationPolicy,
    /// Line prefix and header flags
    pub format: LineFormat,
    /// Staging buffer parameters
    pub staging: StagingConfig,
    /// Time source for headers and daily rotation
    pub clock: Arc<dyn Clock>,
}

impl LoggerOptions {
    /// Daily-rotated, unstaged logger writing `<dir>/<filename>` with the
    /// [`FormatFlags::FLAG_NORMAL`] header.
    pub fn new(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        LoggerOptions {
            dir: dir.into(),
            filename: filename.into(),
            staging_filename: None,
            policy: RotationPolicy::Daily,
            format: LineFormat::new("", FormatFlags::FLAG_NORMAL),
            staging: StagingConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Stage lines through `<dir>/<filename>` (builder pattern).
    pub fn with_staging_file(mut self, filename: impl Into<String>) -> Self {
        self.staging_filename = Some(filename.into());
        self
    }

    /// Set the rotation policy (builder pattern).
    pub fn with_policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the header flags (builder pattern).
    pub fn with_flags(mut self, flags: FormatFlags) -> Self {
        self.format.flags = flags;
        self
    }

    /// Set the line prefix (builder pattern).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.format.prefix = prefix.into();
        self
    }

    /// Set the staging parameters (builder pattern).
    pub fn with_staging_config(mut self, config: StagingConfig) -> Self {
        self.staging = config;
        self
    }

    /// Set the time source (builder pattern).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for LoggerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerOptions")
            .field("dir", &self.dir)
            .field("filename", &self.filename)
            .field("staging_filename", &self.staging_filename)
            .field("policy", &self.policy)
            .field("format", &self.format)
            .field("staging", &self.staging)
            .finish()
    }
}

/// An open log stream: rolling file plus optional staging buffer.
pub struct Logger {
    file: Arc<RollingFile>,
    stager: Option<MmapStager>,
}

impl Logger {
    /// Open the rolling file and, if configured, the staging buffer in
    /// front of it.
    ///
    /// # Errors
    ///
    /// Returns [`stagelog_core::LogError::OpenFile`] if the log file cannot
    /// be opened, or [`stagelog_core::LogError::Staging`] if the staging
    /// file cannot be set up.
    pub fn open(options: LoggerOptions) -> Result<Self> {
        let LoggerOptions {
            dir,
            filename,
            staging_filename,
            policy,
            format,
            staging,
            clock,
        } = options;

        let file = Arc::new(RollingFile::open(&dir, filename, policy, format, clock)?);

        let stager = match staging_filename {
            Some(name) => {
                let target: Arc<dyn FlushTarget> = file.clone();
                Some(MmapStager::open(dir.join(name), staging, target)?)
            }
            None => None,
        };

        debug!(
            path = %file.path().display(),
            staged = stager.is_some(),
            "logger opened"
        );
        Ok(Logger { file, stager })
    }

    /// Write one line with this logger's header.
    ///
    /// With staging, the fully rendered line is enqueued and may block while
    /// the queue is full.
    pub fn output(&self, location: Option<&Location<'_>>, msg: &str) {
        match &self.stager {
            Some(stager) if !stager.is_stopped() => {
                let line = self
                    .file
                    .format()
                    .render(self.file.clock().now(), location, msg);
                stager.write(line);
            }
            _ => self.file.output(location, msg),
        }
    }

    /// Rotate the active file if its policy says so.
    ///
    /// Staged content is drained into the current file first, so lines are
    /// not moved across the rotation boundary.
    pub fn rotate_if_due(&self) -> bool {
        if !self.file.should_rotate() {
            return false;
        }
        // Wait for queued lines too, not only what is already in the region
        if let Some(stager) = &self.stager {
            stager.sync();
        }
        self.file.rotate_if_due()
    }

    /// Push everything written so far down to the OS.
    pub fn flush(&self) {
        if let Some(stager) = &self.stager {
            stager.sync();
        }
        if let Err(e) = self.file.flush() {
            error!(path = %self.file.path().display(), error = %e, "log flush failed");
        }
    }

    /// Stop the staging buffer (draining it) and flush the file.
    ///
    /// Idempotent. Lines output after close go straight to the file.
    pub fn close(&self) {
        if let Some(stager) = &self.stager {
            stager.close();
        }
        if let Err(e) = self.file.flush() {
            error!(path = %self.file.path().display(), error = %e, "log flush failed");
        }
    }

    /// Whether lines go through a staging buffer.
    pub fn is_staged(&self) -> bool {
        self.stager.as_ref().map_or(false, |s| !s.is_stopped())
    }

    /// The underlying rolling file.
    pub fn file(&self) -> &Arc<RollingFile> {
        &self.file
    }

    /// The staging buffer, if any.
    pub fn stager(&self) -> Option<&MmapStager> {
        self.stager.as_ref()
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("file", &self.file)
            .field("stager", &self.stager)
            .finish()
    }
}

/// Open a daily-rotated logger, panicking if it cannot be opened.
///
/// `staging` names a staging file inside `dir`.
///
/// # Panics
///
/// Panics if the log or staging file cannot be set up.
pub fn new_logger(
    dir: impl Into<PathBuf>,
    filename: impl Into<String>,
    staging: Option<&str>,
    flags: FormatFlags,
) -> Logger {
    let mut options = LoggerOptions::new(dir, filename).with_flags(flags);
    if let Some(name) = staging {
        options = options.with_staging_file(name);
    }
    match Logger::open(options) {
        Ok(logger) => logger,
        Err(e) => panic!("cannot open logger: {}", e),
    }
}
