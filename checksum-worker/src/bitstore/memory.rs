use super::{BitstreamStore, RetrieveError};
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Entry {
    Bytes(Vec<u8>),
    /// Opens fine, fails on first read
    Unreadable,
}

/// In-memory byte store
///
/// Counts every successful open so callers can assert that a bitstream
/// was (or was not) read.
#[derive(Debug, Default)]
pub struct MemoryBitstreamStore {
    entries: Mutex<HashMap<u64, Entry>>,
    opened: AtomicUsize,
}

impl MemoryBitstreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bitstream_id: u64, bytes: impl Into<Vec<u8>>) {
        self.lock().insert(bitstream_id, Entry::Bytes(bytes.into()));
    }

    /// Register a bitstream whose stream errors on read
    pub fn insert_unreadable(&self, bitstream_id: u64) {
        self.lock().insert(bitstream_id, Entry::Unreadable);
    }

    pub fn remove(&self, bitstream_id: u64) {
        self.lock().remove(&bitstream_id);
    }

    /// Number of streams handed out so far
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Entry>> {
        // a poisoned map is still a valid map
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct UnreadableStream;

impl Read for UnreadableStream {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("stream unreadable"))
    }
}

impl BitstreamStore for MemoryBitstreamStore {
    fn retrieve(&self, bitstream_id: u64) -> Result<Box<dyn Read + '_>, RetrieveError> {
        let entry = self
            .lock()
            .get(&bitstream_id)
            .cloned()
            .ok_or(RetrieveError::NotFound(bitstream_id))?;

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(match entry {
            Entry::Bytes(bytes) => Box::new(Cursor::new(bytes)),
            Entry::Unreadable => Box::new(UnreadableStream),
        })
    }
}
