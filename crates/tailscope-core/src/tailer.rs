use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tailscope_api::LogApi;
use tailscope_types::ArcLogRecord;

use crate::buffer::{TAIL_BUFFER_CAPACITY, TailBuffer};

/// How often the tailer polls the stream endpoint
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Records requested on the seeding fetch (cursor = None)
const INITIAL_FETCH_LIMIT: u64 = 100;

/// Upper bound on records requested per tick
const TICK_FETCH_LIMIT: u64 = 200;

/// Polls the remote log stream and merges new records into the bounded
/// tail buffer.
///
/// The cursor (timestamp of the last accepted record) only ever moves
/// forward; a failed tick leaves cursor and buffer untouched and the
/// next tick simply tries again. At most one fetch is outstanding at a
/// time: the poll loop awaits each fetch inline and missed interval
/// ticks are skipped, not queued.
pub struct Tailer {
    api: Arc<dyn LogApi>,
    buffer: TailBuffer,
    cursor: Arc<RwLock<Option<DateTime<Utc>>>>,
    interval: Duration,

    /// Cancellation token for stopping the poll loop
    cancel: CancellationToken,

    /// Active poll task handle
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Tailer {
    /// Create a tailer polling at the default interval
    pub fn new(api: Arc<dyn LogApi>) -> Self {
        Self::with_interval(api, DEFAULT_POLL_INTERVAL)
    }

    /// Create a tailer with a custom poll interval
    pub fn with_interval(api: Arc<dyn LogApi>, interval: Duration) -> Self {
        Self {
            api,
            buffer: TailBuffer::new(TAIL_BUFFER_CAPACITY),
            cursor: Arc::new(RwLock::new(None)),
            interval,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Immutable snapshot of the tail window, oldest first
    pub fn snapshot(&self) -> Vec<ArcLogRecord> {
        self.buffer.snapshot()
    }

    /// Timestamp of the most recently accepted record
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        *self.cursor.read()
    }

    /// Check if the poll loop is running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start polling. No-op if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let api = Arc::clone(&self.api);
        let buffer = self.buffer.clone();
        let cursor = Arc::clone(&self.cursor);
        let cancel = self.cancel.clone();
        let interval = self.interval;

        self.task = Some(tokio::spawn(async move {
            // Seed the buffer with the most recent records
            match api.stream_logs(None, INITIAL_FETCH_LIMIT).await {
                Ok(records) => {
                    if cancel.is_cancelled() {
                        return;
                    }
                    merge(&buffer, &cursor, records);
                }
                Err(err) => warn!(error = %err, "initial tail fetch failed"),
            }

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick fires immediately; the seed fetch
            // already covered it
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let since = *cursor.read();
                match api.stream_logs(since, TICK_FETCH_LIMIT).await {
                    Ok(records) => {
                        // A stop during the fetch discards the result
                        if cancel.is_cancelled() {
                            break;
                        }
                        if !records.is_empty() {
                            debug!(count = records.len(), "tail tick merged records");
                            merge(&buffer, &cursor, records);
                        }
                    }
                    Err(err) => {
                        // State preserved; the next tick tries again
                        warn!(error = %err, "tail tick failed");
                    }
                }
            }
        }));
    }

    /// Stop polling. The in-flight fetch (if any) completes but its
    /// result is discarded.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.task = None;
        // Fresh token so the tailer can be started again
        self.cancel = CancellationToken::new();
    }
}

impl Drop for Tailer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Append records to the buffer and advance the cursor, never rewinding it
fn merge(
    buffer: &TailBuffer,
    cursor: &RwLock<Option<DateTime<Utc>>>,
    records: Vec<tailscope_types::LogRecord>,
) {
    let Some(last) = records.last() else {
        return;
    };
    let mut cursor = cursor.write();
    if cursor.is_none_or(|current| last.timestamp > current) {
        *cursor = Some(last.timestamp);
    }
    buffer.extend(records);
}
