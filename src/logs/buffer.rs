use super::traits::LogStore;
use super::types::RequestLogRecord;
use crate::config::RequestLogConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::task::TaskTracker;

/// In-memory staging area between the HTTP middleware and the log store.
///
/// Holds at most `capacity` records. The push that fills it takes the whole
/// batch out under the lock and hands it to a background flush, so request
/// handling never waits on the database. A batch that fails or times out is
/// dropped and counted.
pub struct RequestLogBuffer {
    store: Arc<dyn LogStore>,
    pending: Mutex<Vec<RequestLogRecord>>,
    capacity: usize,
    flush_timeout: Duration,
    dropped: AtomicU64,
    flushes: TaskTracker,
}

impl RequestLogBuffer {
    pub fn new(store: Arc<dyn LogStore>, capacity: usize, flush_timeout: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            store,
            pending: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            flush_timeout,
            dropped: AtomicU64::new(0),
            flushes: TaskTracker::new(),
        }
    }

    pub fn from_config(store: Arc<dyn LogStore>, config: &RequestLogConfig) -> Self {
        Self::new(
            store,
            config.buffer_size,
            Duration::from_secs(config.flush_timeout_secs.max(1)),
        )
    }

    /// Queue one record, spawning a flush when the buffer is full.
    /// Must be called from within a tokio runtime.
    pub fn push(self: &Arc<Self>, record: RequestLogRecord) {
        let Some(batch) = self.take_if_full(record) else {
            return;
        };

        let buffer = Arc::clone(self);
        self.flushes.spawn(async move {
            buffer.flush(batch).await;
        });
    }

    fn take_if_full(&self, record: RequestLogRecord) -> Option<Vec<RequestLogRecord>> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.push(record);
        if pending.len() < self.capacity {
            return None;
        }
        Some(std::mem::replace(
            &mut *pending,
            Vec::with_capacity(self.capacity),
        ))
    }

    /// Write `batch` to the store. Returns the rows written (0 on failure).
    pub async fn flush(&self, batch: Vec<RequestLogRecord>) -> u64 {
        if batch.is_empty() {
            return 0;
        }

        let size = batch.len() as u64;
        match tokio::time::timeout(self.flush_timeout, self.store.insert_batch(&batch)).await {
            Ok(Ok(written)) => {
                tracing::debug!(written, "request log batch flushed");
                written
            }
            Ok(Err(e)) => {
                self.dropped.fetch_add(size, Ordering::Relaxed);
                tracing::warn!("Error flushing request logs ({size} dropped): {e}");
                0
            }
            Err(_) => {
                self.dropped.fetch_add(size, Ordering::Relaxed);
                tracing::warn!(
                    "Request log flush exceeded {:?} ({size} dropped)",
                    self.flush_timeout
                );
                0
            }
        }
    }

    /// Flush whatever is pending and wait for background flushes already
    /// handed off. Called on shutdown, before the store is closed.
    ///
    /// Returns the rows written from the pending remainder.
    pub async fn drain(&self) -> u64 {
        let batch = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *pending)
        };
        let written = self.flush(batch).await;

        self.flushes.close();
        self.flushes.wait().await;
        written
    }

    pub fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
