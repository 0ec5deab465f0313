//! A bounded, timestamped, in-memory log buffer shared by every component,
//! mirrored to a rotating file on disk so the dashboard and the notifier
//! see the same history as the on-disk audit trail.

use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;

/// Default ring capacity: oldest entries are dropped once this is exceeded.
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub text: String,
}

pub struct LogRing {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
    file: Mutex<NonBlocking>,
    // Dropping this flushes the non-blocking writer's background thread.
    _guard: WorkerGuard,
}

impl LogRing {
    /// Builds a ring with [`DEFAULT_CAPACITY`], mirroring appends to a
    /// daily-rotating file named `{file_prefix}` under `log_dir`.
    pub fn new(log_dir: impl AsRef<Path>, file_prefix: &str) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, log_dir, file_prefix)
    }

    pub fn with_capacity(capacity: usize, log_dir: impl AsRef<Path>, file_prefix: &str) -> Self {
        let appender = rolling::daily(log_dir, file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            file: Mutex::new(non_blocking),
            _guard: guard,
        }
    }

    /// Appends one line, evicting the oldest entry if the ring is full, and
    /// mirrors the line to the rotating file. Never panics on a poisoned
    /// file writer lock — a dashboard/file hiccup must not take down the
    /// caller.
    pub fn append(&self, text: impl Into<String>) {
        let entry = LogEntry { timestamp: Utc::now().to_rfc3339(), text: text.into() };

        {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }

        let line = format!("[{}] {}\n", entry.timestamp, entry.text);
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
        }
    }

    /// Snapshot of the ring's current contents, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
