//! Flush destination abstraction
//!
//! The staging buffer does not know what file it drains into. Whatever sits
//! behind a [`FlushTarget`] receives already-rendered bytes, verbatim.

use parking_lot::Mutex;
use std::io;

/// Destination for bytes drained out of a staging buffer.
pub trait FlushTarget: Send + Sync {
    /// Append `bytes` verbatim.
    fn write_flushed(&self, bytes: &[u8]) -> io::Result<()>;
}

/// In-memory target, used for tests and for capturing output.
impl FlushTarget for Mutex<Vec<u8>> {
    fn write_flushed(&self, bytes: &[u8]) -> io::Result<()> {
        self.lock().extend_from_slice(bytes);
        Ok(())
    }
}
