//! Memory-mapped staging buffer
//!
//! Decouples caller latency from disk I/O. Producers enqueue rendered lines
//! onto a bounded queue; a single consumer thread copies them into a region
//! mapped onto a backing file and periodically drains the region into a
//! [`FlushTarget`] with one write.
//!
//! # Thread Lifecycle
//!
//! - Exactly one consumer thread per stager; it is the only writer of the
//!   region and the only reader of the queue.
//! - [`MmapStager::close`] stops intake, signals the consumer and joins it.
//!   The consumer drains whatever is already queued, flushes, unmaps and exits.
//! - `Drop` runs the same protocol.
//!
//! # Region format
//!
//! The region holds raw text starting at offset 0. The first zero byte marks
//! the end of content, so staged text must not contain NUL; intake replaces
//! it with U+FFFD. Each flush zeroes the drained prefix and resets the cursor,
//! so the region is reused from the start rather than wrapping.
//!
//! # Crash recovery
//!
//! The mapping is shared with the backing file. Content staged but not yet
//! flushed when the process dies survives in that file and is replayed into
//! the target the next time a stager opens on it.
//!
//! # Data-loss window
//!
//! Up to one flush interval, or half the region, of staged lines.

use crate::target::FlushTarget;
use crossbeam_channel::{at, bounded, select, Receiver, Sender};
use memmap2::{MmapMut, MmapOptions};
use parking_lot::Mutex;
use stagelog_core::{LogError, Result};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

/// Region size, in pages, when none (or less than a page) is configured.
pub const DEFAULT_STAGING_PAGES: usize = 10;

/// Bounded queue capacity between producers and the consumer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Interval of the unconditional periodic flush.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Platform memory page size.
pub fn page_size() -> usize {
    #[cfg(unix)]
    {
        // SAFETY: sysconf has no preconditions
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as usize;
        }
    }
    FALLBACK_PAGE_SIZE
}

/// Staging buffer parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingConfig {
    /// Requested region size in bytes, rounded down to whole pages
    pub size: usize,
    /// Periodic flush interval
    pub flush_interval: Duration,
    /// Capacity of the intake queue
    pub queue_capacity: usize,
}

impl Default for StagingConfig {
    fn default() -> Self {
        StagingConfig {
            size: page_size() * DEFAULT_STAGING_PAGES,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl StagingConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requested region size (builder pattern).
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set the periodic flush interval (builder pattern).
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the intake queue capacity (builder pattern).
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Effective region size: `size` rounded down to a page multiple, or
    /// [`DEFAULT_STAGING_PAGES`] pages if that is zero.
    pub fn region_size(&self) -> usize {
        let page = page_size();
        let rounded = (self.size / page) * page;
        if rounded == 0 {
            page * DEFAULT_STAGING_PAGES
        } else {
            rounded
        }
    }
}

enum Chunk {
    Line(String),
    Sync(Sender<()>),
}

struct Region {
    /// None once unmapped
    map: Option<MmapMut>,
    cursor: usize,
    size: usize,
}

impl Region {
    /// Copy `bytes` at the cursor, truncating at the region end.
    fn write(&mut self, bytes: &[u8]) {
        let Some(map) = self.map.as_mut() else {
            return;
        };
        let start = self.cursor.min(self.size);
        let n = bytes.len().min(self.size - start);
        map[start..start + n].copy_from_slice(&bytes[..n]);
        self.cursor = self.cursor.saturating_add(bytes.len()).min(self.size);
    }

    /// Drain `[0, first zero)` into `target`, zero it and rewind.
    fn flush(&mut self, target: &dyn FlushTarget) {
        let Some(map) = self.map.as_mut() else {
            return;
        };
        let end = map.iter().position(|&b| b == 0).unwrap_or(map.len());
        if end > 0 {
            if let Err(e) = target.write_flushed(&map[..end]) {
                error!(bytes = end, error = %e, "staging flush write failed");
            }
            map[..end].fill(0);
        }
        self.cursor = 0;
    }
}

struct Shared {
    region: Mutex<Region>,
    stopped: AtomicBool,
    target: Arc<dyn FlushTarget>,
    path: PathBuf,
}

impl Shared {
    fn handle(&self, chunk: Chunk) {
        match chunk {
            Chunk::Line(line) => {
                let mut region = self.region.lock();
                if region.cursor + line.len() > region.size / 2 {
                    region.flush(self.target.as_ref());
                }
                region.write(line.as_bytes());
            }
            Chunk::Sync(ack) => {
                self.flush();
                let _ = ack.send(());
            }
        }
    }

    fn flush(&self) {
        self.region.lock().flush(self.target.as_ref());
    }
}

/// Memory-mapped staging buffer with a single background consumer.
pub struct MmapStager {
    shared: Arc<Shared>,
    tx: Sender<Chunk>,
    stop_tx: Sender<()>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    size: usize,
}

impl MmapStager {
    /// Open a stager on the backing file at `path`, draining into `target`.
    ///
    /// Content left in the backing file by a previous run is replayed into
    /// `target` first. The file is then zeroed, sized to
    /// [`StagingConfig::region_size`] and mapped, and the consumer thread
    /// started.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Staging`] if the file cannot be read, created,
    /// sized or mapped, or the consumer thread cannot be spawned.
    pub fn open(
        path: impl Into<PathBuf>,
        config: StagingConfig,
        target: Arc<dyn FlushTarget>,
    ) -> Result<Self> {
        let path = path.into();
        let size = config.region_size();
        let staging_err = |source: io::Error| LogError::Staging {
            path: path.clone(),
            source,
        };

        replay(&path, target.as_ref()).map_err(staging_err)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(staging_err)?;
        file.set_len(0).map_err(staging_err)?;
        file.set_len(size as u64).map_err(staging_err)?;

        // SAFETY: the backing file belongs to this stager. The mapping is
        // only written by the consumer thread, under the region mutex.
        let map = unsafe { MmapOptions::new().len(size).map_mut(&file) }.map_err(staging_err)?;

        let (tx, rx) = bounded(config.queue_capacity.max(1));
        let (stop_tx, stop_rx) = bounded(1);

        let shared = Arc::new(Shared {
            region: Mutex::new(Region {
                map: Some(map),
                cursor: 0,
                size,
            }),
            stopped: AtomicBool::new(false),
            target,
            path: path.clone(),
        });

        let consumer_shared = Arc::clone(&shared);
        let interval = config.flush_interval;
        let handle = thread::Builder::new()
            .name("stagelog-stager".to_string())
            .spawn(move || consume(&consumer_shared, rx, stop_rx, interval))
            .map_err(staging_err)?;

        Ok(MmapStager {
            shared,
            tx,
            stop_tx,
            consumer: Mutex::new(Some(handle)),
            size,
        })
    }

    /// Enqueue a rendered line.
    ///
    /// Blocks while the queue is full. Dropped silently once the stager is
    /// stopped.
    pub fn write(&self, line: impl Into<String>) {
        if self.is_stopped() {
            return;
        }
        let mut line = line.into();
        if line.contains('\0') {
            line = line.replace('\0', "\u{FFFD}");
        }
        if self.tx.send(Chunk::Line(line)).is_err() {
            trace!("staging consumer gone, line dropped");
        }
    }

    /// Flush everything enqueued so far and wait until it reached the target.
    pub fn sync(&self) {
        if self.is_stopped() {
            return;
        }
        let (ack_tx, ack_rx) = bounded(1);
        if self.tx.send(Chunk::Sync(ack_tx)).is_ok() {
            // Err means the consumer exited; it flushed on the way out
            let _ = ack_rx.recv();
        }
    }

    /// Drain the region into the target now, without waiting for the queue.
    pub fn flush(&self) {
        self.shared.flush();
    }

    /// Stop intake, let the consumer drain the queue, flush and unmap.
    ///
    /// Idempotent. Blocks until the consumer thread has exited.
    pub fn close(&self) {
        let Some(handle) = self.consumer.lock().take() else {
            return;
        };
        self.shared.stopped.store(true, Ordering::Release);
        let _ = self.stop_tx.send(());
        if handle.join().is_err() {
            error!(path = %self.shared.path.display(), "staging consumer panicked");
        }
    }

    /// Current write offset into the region.
    pub fn cursor(&self) -> usize {
        self.shared.region.lock().cursor
    }

    /// Region size in bytes.
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// Whether intake has stopped.
    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Acquire)
    }

    /// Whether the region is still mapped.
    pub fn is_mapped(&self) -> bool {
        self.shared.region.lock().map.is_some()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }
}

impl Drop for MmapStager {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for MmapStager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapStager")
            .field("path", &self.shared.path)
            .field("size", &self.size)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Move content left in the backing file into `target`.
fn replay(path: &Path, target: &dyn FlushTarget) -> io::Result<()> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    if end > 0 {
        target.write_flushed(&data[..end])?;
        info!(path = %path.display(), bytes = end, "replayed staged log content");
    }
    Ok(())
}

/// Consumer loop. Runs until stopped, then drains, flushes and unmaps.
fn consume(shared: &Shared, rx: Receiver<Chunk>, stop_rx: Receiver<()>, interval: Duration) {
    debug!(path = %shared.path.display(), "staging consumer started");
    let mut deadline = Instant::now() + interval;

    loop {
        select! {
            recv(rx) -> msg => match msg {
                Ok(chunk) => shared.handle(chunk),
                Err(_) => break,
            },
            recv(stop_rx) -> _ => break,
            recv(at(deadline)) -> _ => {
                shared.flush();
                deadline = Instant::now() + interval;
            }
        }
    }

    shared.stopped.store(true, Ordering::Release);
    while let Ok(chunk) = rx.try_recv() {
        shared.handle(chunk);
    }

    let mut region = shared.region.lock();
    region.flush(shared.target.as_ref());
    region.map = None;
    debug!(path = %shared.path.display(), "staging consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn memory_target() -> Arc<Mutex<Vec<u8>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn contents(target: &Mutex<Vec<u8>>) -> String {
        String::from_utf8(target.lock().clone()).unwrap()
    }

    fn quiet_config() -> StagingConfig {
        // Long interval: flushes only happen when a test asks for them
        StagingConfig::new().with_flush_interval(Duration::from_secs(3600))
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_region_size_rounds_down_to_pages() {
        let page = page_size();
        assert_eq!(
            StagingConfig::new().with_size(page * 3 + 17).region_size(),
            page * 3
        );
        assert_eq!(
            StagingConfig::new().with_size(0).region_size(),
            page * DEFAULT_STAGING_PAGES
        );
        assert_eq!(
            StagingConfig::new().with_size(page - 1).region_size(),
            page * DEFAULT_STAGING_PAGES
        );
    }

    #[test]
    fn test_default_config() {
        let config = StagingConfig::default();
        assert_eq!(config.region_size(), page_size() * DEFAULT_STAGING_PAGES);
        assert_eq!(config.flush_interval, Duration::from_secs(1));
        assert_eq!(config.queue_capacity, 100);
    }

    #[test]
    fn test_open_sizes_backing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.mmap");
        let stager = MmapStager::open(&path, quiet_config(), memory_target()).unwrap();
        assert_eq!(
            fs::metadata(&path).unwrap().len(),
            stager.capacity() as u64
        );
        assert!(stager.is_mapped());
        assert_eq!(stager.cursor(), 0);
    }

    #[test]
    fn test_sync_delivers_lines_in_order() {
        let temp = TempDir::new().unwrap();
        let target = memory_target();
        let stager =
            MmapStager::open(temp.path().join("app.mmap"), quiet_config(), target.clone()).unwrap();

        let mut expected = String::new();
        for i in 0..20 {
            let line = format!("INFO  line {}\n", i);
            expected.push_str(&line);
            stager.write(line);
        }
        stager.sync();

        assert_eq!(contents(&target), expected);
        assert_eq!(stager.cursor(), 0);
    }

    #[test]
    fn test_oversized_chunk_is_truncated_at_region_end() {
        let temp = TempDir::new().unwrap();
        let target = memory_target();
        let stager =
            MmapStager::open(temp.path().join("app.mmap"), quiet_config(), target.clone()).unwrap();

        let capacity = stager.capacity();
        stager.write("x".repeat(capacity + 100));
        stager.sync();

        let flushed = target.lock().clone();
        assert_eq!(flushed.len(), capacity);
        assert!(flushed.iter().all(|&b| b == b'x'));
        assert_eq!(stager.cursor(), 0);
    }

    #[test]
    fn test_half_capacity_triggers_flush_before_write() {
        let temp = TempDir::new().unwrap();
        let target = memory_target();
        let stager =
            MmapStager::open(temp.path().join("app.mmap"), quiet_config(), target.clone()).unwrap();

        let first = "a".repeat(stager.capacity() / 2 - 10);
        let second = "b".repeat(20);
        stager.write(first.clone());
        stager.write(second.clone());

        assert!(wait_until(|| target.lock().len() == first.len()));
        assert!(wait_until(|| stager.cursor() == second.len()));
        assert_eq!(contents(&target), first);

        stager.sync();
        assert_eq!(contents(&target), format!("{}{}", first, second));
    }

    #[test]
    fn test_periodic_flush_without_sync() {
        let temp = TempDir::new().unwrap();
        let target = memory_target();
        let config = StagingConfig::new().with_flush_interval(Duration::from_millis(20));
        let stager = MmapStager::open(temp.path().join("app.mmap"), config, target.clone()).unwrap();

        stager.write("tick\n");
        assert!(wait_until(|| contents(&target) == "tick\n"));
        assert!(wait_until(|| stager.cursor() == 0));
    }

    #[test]
    fn test_replays_leftover_content_on_open() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.mmap");
        let mut leftover = b"left over\n".to_vec();
        leftover.extend_from_slice(&[0u8; 64]);
        fs::write(&path, &leftover).unwrap();

        let target = memory_target();
        let stager = MmapStager::open(&path, quiet_config(), target.clone()).unwrap();

        assert_eq!(contents(&target), "left over\n");
        // The backing file is zeroed after replay, nothing is replayed twice
        stager.close();
        drop(stager);
        let again = memory_target();
        let _stager = MmapStager::open(&path, quiet_config(), again.clone()).unwrap();
        assert!(again.lock().is_empty());
    }

    #[test]
    fn test_close_drains_queue_and_unmaps() {
        let temp = TempDir::new().unwrap();
        let target = memory_target();
        let stager =
            MmapStager::open(temp.path().join("app.mmap"), quiet_config(), target.clone()).unwrap();

        for i in 0..50 {
            stager.write(format!("line {}\n", i));
        }
        stager.close();

        assert_eq!(contents(&target).lines().count(), 50);
        assert!(stager.is_stopped());
        assert!(!stager.is_mapped());

        stager.write("after close\n");
        stager.sync();
        stager.close();
        assert!(!contents(&target).contains("after close"));
    }

    #[test]
    fn test_nul_bytes_are_replaced() {
        let temp = TempDir::new().unwrap();
        let target = memory_target();
        let stager =
            MmapStager::open(temp.path().join("app.mmap"), quiet_config(), target.clone()).unwrap();

        stager.write("a\0b\n");
        stager.write("c\n");
        stager.sync();

        assert_eq!(contents(&target), "a\u{FFFD}b\nc\n");
    }

    #[test]
    fn test_backpressure_with_tiny_queue_loses_nothing() {
        let temp = TempDir::new().unwrap();
        let target = memory_target();
        let config = quiet_config().with_queue_capacity(1);
        let stager = Arc::new(
            MmapStager::open(temp.path().join("app.mmap"), config, target.clone()).unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let stager = Arc::clone(&stager);
                thread::spawn(move || {
                    for i in 0..200 {
                        stager.write(format!("t{} n{}\n", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        stager.sync();

        assert_eq!(contents(&target).lines().count(), 800);
    }
}
