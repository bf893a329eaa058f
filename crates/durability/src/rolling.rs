//! Active log file with in-place rotation.
//!
//! A [`RollingFile`] owns `<dir>/<filename>` and a line-buffered writer on
//! it. Normal output takes the state lock shared, so concurrent writers only
//! serialize on the writer itself; rotation takes it exclusively and swaps
//! the handle.
//!
//! # Layout
//!
//! | Policy | Rotated file |
//! |--------|--------------|
//! | Daily | `<filename>.<YYYY-MM-DD>` (the day the content was written) |
//! | BySize | `<filename>.<N>`, `N` cycling through `1..=max_count` |

use crate::target::FlushTarget;
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use stagelog_core::{Clock, LineFormat, LogError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Date format used in daily-rotated file names.
const DATE_SUFFIX_FORMAT: &str = "%Y-%m-%d";

/// When the active file is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationPolicy {
    /// Rotate when the local calendar day changes
    #[default]
    Daily,
    /// Rotate when the active file reaches `max_size` bytes, keeping at most
    /// `max_count` rotated files. A `max_count` of 1 or less disables rotation.
    BySize {
        /// Size threshold in bytes
        max_size: u64,
        /// Number of suffix slots
        max_count: u32,
    },
}

struct RollingState {
    /// None after a failed reopen; output is dropped until the next rotation
    writer: Option<Mutex<LineWriter<File>>>,
    /// Day the active file's content belongs to
    date: NaiveDate,
    /// Last suffix slot used
    suffix: u32,
}

/// The active log file of one log stream.
pub struct RollingFile {
    dir: PathBuf,
    filename: String,
    path: PathBuf,
    policy: RotationPolicy,
    format: LineFormat,
    clock: Arc<dyn Clock>,
    state: RwLock<RollingState>,
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl RollingFile {
    /// Open (or create) `<dir>/<filename>` for appending.
    ///
    /// The directory is created if missing. With [`RotationPolicy::BySize`],
    /// an existing file already over the limit is rotated immediately.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::OpenFile`] if the directory or file cannot be
    /// created.
    pub fn open(
        dir: impl Into<PathBuf>,
        filename: impl Into<String>,
        policy: RotationPolicy,
        format: LineFormat,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let dir = dir.into();
        let filename = filename.into();
        let path = dir.join(&filename);

        fs::create_dir_all(&dir).map_err(|source| LogError::OpenFile {
            path: path.clone(),
            source,
        })?;
        let file = open_append(&path).map_err(|source| LogError::OpenFile {
            path: path.clone(),
            source,
        })?;

        let state = RollingState {
            writer: Some(Mutex::new(LineWriter::new(file))),
            date: clock.today(),
            suffix: 0,
        };
        let rolling = RollingFile {
            dir,
            filename,
            path,
            policy,
            format,
            clock,
            state: RwLock::new(state),
        };

        rolling.rotate_if_due();
        Ok(rolling)
    }

    /// Whether the rotation predicate currently holds.
    pub fn should_rotate(&self) -> bool {
        let state = self.state.read();
        self.is_due(&state)
    }

    fn is_due(&self, state: &RollingState) -> bool {
        match self.policy {
            RotationPolicy::Daily => self.clock.today() > state.date,
            RotationPolicy::BySize {
                max_size,
                max_count,
            } => max_count > 1 && self.file_size() >= max_size,
        }
    }

    fn file_size(&self) -> u64 {
        match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot stat log file");
                0
            }
        }
    }

    /// Rotate if the predicate holds. Returns `true` if a rotation ran.
    ///
    /// Blocks every concurrent writer for the duration of the rotation.
    pub fn rotate_if_due(&self) -> bool {
        if !self.should_rotate() {
            return false;
        }
        let mut state = self.state.write();
        // Another caller may have rotated while we waited for the lock
        if !self.is_due(&state) {
            return false;
        }
        match self.policy {
            RotationPolicy::Daily => self.rotate_daily(&mut state),
            RotationPolicy::BySize { max_count, .. } => self.rotate_by_size(&mut state, max_count),
        }
        true
    }

    fn rotate_daily(&self, state: &mut RollingState) {
        let today = self.clock.today();
        let dated = self.dated_path(state.date);
        if dated.exists() {
            warn!(
                path = %dated.display(),
                "rotated log file already exists, continuing in active file"
            );
            state.date = today;
            return;
        }

        Self::close_writer(state);
        if let Err(e) = fs::rename(&self.path, &dated) {
            error!(
                from = %self.path.display(),
                to = %dated.display(),
                error = %e,
                "log rotation rename failed"
            );
        } else {
            debug!(to = %dated.display(), "rotated log file");
        }
        state.date = today;
        self.reopen(state);
    }

    fn rotate_by_size(&self, state: &mut RollingState, max_count: u32) {
        state.suffix = state.suffix % max_count + 1;
        Self::close_writer(state);

        let slot = self.suffixed_path(state.suffix);
        if slot.exists() {
            if let Err(e) = fs::remove_file(&slot) {
                warn!(path = %slot.display(), error = %e, "cannot remove stale rotated log file");
            }
        }
        if let Err(e) = fs::rename(&self.path, &slot) {
            error!(
                from = %self.path.display(),
                to = %slot.display(),
                error = %e,
                "log rotation rename failed"
            );
        } else {
            debug!(to = %slot.display(), "rotated log file");
        }
        self.reopen(state);
    }

    fn close_writer(state: &mut RollingState) {
        if let Some(writer) = state.writer.take() {
            if let Err(e) = writer.into_inner().flush() {
                error!(error = %e, "flush before rotation failed");
            }
        }
    }

    fn reopen(&self, state: &mut RollingState) {
        match open_append(&self.path) {
            Ok(file) => state.writer = Some(Mutex::new(LineWriter::new(file))),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "cannot reopen log file after rotation");
                state.writer = None;
            }
        }
    }

    /// Render `msg` with this file's [`LineFormat`] and append it.
    ///
    /// Write failures are reported through `tracing` and swallowed.
    pub fn output(&self, location: Option<&Location<'_>>, msg: &str) {
        let line = self.format.render(self.clock.now(), location, msg);
        if let Err(e) = self.write_raw(line.as_bytes()) {
            error!(path = %self.path.display(), error = %e, "log write failed");
        }
    }

    /// Append `bytes` verbatim.
    pub fn write_raw(&self, bytes: &[u8]) -> io::Result<()> {
        let state = self.state.read();
        match &state.writer {
            Some(writer) => writer.lock().write_all(bytes),
            None => Ok(()),
        }
    }

    /// Flush buffered output to the OS.
    pub fn flush(&self) -> io::Result<()> {
        let state = self.state.read();
        match &state.writer {
            Some(writer) => writer.lock().flush(),
            None => Ok(()),
        }
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the active and rotated files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name of the active file.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Rotation policy.
    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Line format applied by [`output`](Self::output).
    pub fn format(&self) -> &LineFormat {
        &self.format
    }

    /// Clock used for headers and the daily predicate.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Day the active file's content belongs to.
    pub fn current_date(&self) -> NaiveDate {
        self.state.read().date
    }

    /// Last suffix slot used by size rotation (0 before the first rotation).
    pub fn current_suffix(&self) -> u32 {
        self.state.read().suffix
    }

    /// Path a daily rotation for `date` renames the active file to.
    pub fn dated_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!(
            "{}.{}",
            self.filename,
            date.format(DATE_SUFFIX_FORMAT)
        ))
    }

    /// Path of size-rotation slot `n`.
    pub fn suffixed_path(&self, n: u32) -> PathBuf {
        self.dir.join(format!("{}.{}", self.filename, n))
    }
}

impl FlushTarget for RollingFile {
    fn write_flushed(&self, bytes: &[u8]) -> io::Result<()> {
        self.write_raw(bytes)?;
        // Truncated chunks may not end in a newline
        self.flush()
    }
}

impl Drop for RollingFile {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl std::fmt::Debug for RollingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingFile")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field("format", &self.format)
            .finish()
    }
}
