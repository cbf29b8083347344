//! The message-log write queue: a bounded, drop-oldest buffer that decouples
//! `PersistenceProvider::append_log` from the forwarding hot path.
//!
//! `push` is synchronous and cheap — a short mutex hold, never an await —
//! so the charger-read and upstream-read tasks never stall on a slow
//! database. A single background worker drains the queue and awaits the
//! persistence call; if the queue is full when a new record arrives, the
//! oldest queued record is dropped in its favor, matching `spec.md` §5's
//! "logs are observational; dropping is preferable to stalling forwarding".

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::warn;

use crate::domain::log::MessageLogRecord;
use crate::domain::persistence::PersistenceProvider;

pub struct LogQueue {
    inner: std::sync::Mutex<VecDeque<MessageLogRecord>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
}

impl LogQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: std::sync::Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue a record. Never blocks, never fails — worst case it evicts
    /// the oldest queued record and counts the drop.
    pub fn push(&self, record: MessageLogRecord) {
        let mut guard = self.inner.lock().expect("log queue mutex poisoned");
        if guard.len() >= self.capacity {
            guard.pop_front();
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped % 100 == 1 {
                warn!(dropped, "log queue full, dropping oldest record");
            }
        }
        guard.push_back(record);
        drop(guard);
        self.notify.notify_one();
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn pop(&self) -> Option<MessageLogRecord> {
        self.inner.lock().expect("log queue mutex poisoned").pop_front()
    }
}

/// Drain `queue` into `persistence` until `shutdown` fires. Persistence
/// failures are logged and otherwise ignored — §7's `Persistence` error
/// never propagates out of the log path.
pub async fn run_log_worker(
    queue: Arc<LogQueue>,
    persistence: Arc<dyn PersistenceProvider>,
    shutdown: crate::support::shutdown::ShutdownSignal,
) {
    loop {
        while let Some(record) = queue.pop() {
            if let Err(e) = persistence.append_log(record).await {
                warn!(error = %e, "failed to append message log record");
            }
        }
        if shutdown.is_triggered() {
            return;
        }
        tokio::select! {
            _ = queue.notify.notified() => {}
            _ = shutdown.wait() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(tag: &str) -> MessageLogRecord {
        MessageLogRecord::new("CP1", crate::domain::log::Direction::Upstream, json!({ "tag": tag }))
    }

    #[test]
    fn push_within_capacity_keeps_all() {
        let queue = LogQueue::new(4);
        queue.push(record("a"));
        queue.push(record("b"));
        assert_eq!(queue.pop().unwrap().payload["tag"], "a");
        assert_eq!(queue.pop().unwrap().payload["tag"], "b");
        assert!(queue.pop().is_none());
    }

    #[test]
    fn push_over_capacity_drops_oldest() {
        let queue = LogQueue::new(2);
        queue.push(record("a"));
        queue.push(record("b"));
        queue.push(record("c"));
        assert_eq!(queue.dropped_count(), 1);
        assert_eq!(queue.pop().unwrap().payload["tag"], "b");
        assert_eq!(queue.pop().unwrap().payload["tag"], "c");
    }
}
