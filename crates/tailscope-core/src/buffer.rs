use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use tailscope_types::{ArcLogRecord, LogRecord};

/// Default capacity of the live tail buffer
pub const TAIL_BUFFER_CAPACITY: usize = 200;

/// Bounded, arrival-ordered window of the most recent log records.
///
/// The buffer is owned by the [`Tailer`](crate::Tailer); everything else
/// only ever sees immutable snapshots. Records are stored as
/// `Arc<LogRecord>` so a snapshot is a handful of pointer copies, and a
/// reader mid-iteration never observes a partially evicted list.
#[derive(Clone)]
pub struct TailBuffer {
    entries: Arc<RwLock<VecDeque<ArcLogRecord>>>,
    capacity: usize,
}

impl TailBuffer {
    /// Create a buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append a batch of records in arrival order, evicting from the
    /// front once the capacity is exceeded
    pub fn extend(&self, records: Vec<LogRecord>) {
        if records.is_empty() {
            return;
        }
        let mut entries = self.entries.write();
        for record in records {
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(Arc::new(record));
        }
    }

    /// Immutable snapshot of the current window, oldest first
    pub fn snapshot(&self) -> Vec<ArcLogRecord> {
        self.entries.read().iter().cloned().collect()
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all records
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for TailBuffer {
    fn default() -> Self {
        Self::new(TAIL_BUFFER_CAPACITY)
    }
}
