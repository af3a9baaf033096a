//! Log buffer
//!
//! Fixed-capacity ring buffer for live log entries. The stream driver owns
//! the only [`LogBuffer`]; everyone else reads through a [`LogBufferReader`],
//! which hands out snapshots and never mutates.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use warden_core::domain::log::LogEntry;

struct Inner {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    total_received: u64,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writer half of the log ring buffer
pub struct LogBuffer {
    inner: Arc<Mutex<Inner>>,
}

impl LogBuffer {
    /// Creates an empty buffer holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                capacity,
                total_received: 0,
            })),
        }
    }

    /// Appends an entry, evicting the oldest one when full
    pub fn push(&self, entry: LogEntry) {
        let mut inner = lock(&self.inner);
        if inner.capacity == 0 {
            return;
        }

        if inner.entries.len() == inner.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(entry);
        inner.total_received += 1;
    }

    pub fn reader(&self) -> LogBufferReader {
        LogBufferReader {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Read-only view of the log ring buffer
#[derive(Clone)]
pub struct LogBufferReader {
    inner: Arc<Mutex<Inner>>,
}

impl LogBufferReader {
    /// Current entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        lock(&self.inner).entries.iter().cloned().collect()
    }

    /// The most recent `count` entries, oldest first
    pub fn tail(&self, count: usize) -> Vec<LogEntry> {
        let inner = lock(&self.inner);
        let skip = inner.entries.len().saturating_sub(count);
        inner.entries.iter().skip(skip).cloned().collect()
    }

    /// Entries accepted after the first `seen`, oldest first, plus the new total
    ///
    /// Pass the returned total back in on the next call. Entries evicted
    /// before they could be read are skipped.
    pub fn entries_since(&self, seen: u64) -> (u64, Vec<LogEntry>) {
        let inner = lock(&self.inner);
        let fresh = inner.total_received.saturating_sub(seen);
        let fresh = usize::try_from(fresh).unwrap_or(usize::MAX);
        let skip = inner.entries.len().saturating_sub(fresh);

        (
            inner.total_received,
            inner.entries.iter().skip(skip).cloned().collect(),
        )
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        lock(&self.inner).capacity
    }

    /// Entries accepted since the buffer was created, evicted ones included
    pub fn total_received(&self) -> u64 {
        lock(&self.inner).total_received
    }
}
