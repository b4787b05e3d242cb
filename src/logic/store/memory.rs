//! In-memory store
//!
//! Same contracts as `SqliteStore`, backed by vectors. Used by engine tests
//! and by hosts that feed telemetry directly. Failures and latency can be
//! injected per operation.

use std::time::Duration;

use chrono::NaiveDateTime;
use parking_lot::Mutex;

use crate::logic::snapshot::RawRecord;
use super::{Command, CommandQueue, StoreError, TelemetryStore};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<RawRecord>,
    commands: Vec<Command>,
    fail_fetch: bool,
    fail_pending: bool,
    fail_enqueue: bool,
    delay: Option<Duration>,
    enqueue_delay: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_snapshot(&self, details: impl Into<String>, timestamp: NaiveDateTime) {
        self.inner.lock().records.push(RawRecord::new(details, timestamp));
    }

    /// Every command ever enqueued, oldest first
    pub fn commands(&self) -> Vec<Command> {
        self.inner.lock().commands.clone()
    }

    /// Labels of every command ever enqueued, oldest first
    pub fn command_labels(&self) -> Vec<String> {
        self.inner.lock().commands.iter().map(|c| c.label.clone()).collect()
    }

    /// Actuation side: mark every queued command as delivered
    pub fn deliver_all(&self) {
        for cmd in self.inner.lock().commands.iter_mut() {
            cmd.pending = false;
        }
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.inner.lock().fail_fetch = fail;
    }

    pub fn set_fail_pending(&self, fail: bool) {
        self.inner.lock().fail_pending = fail;
    }

    pub fn set_fail_enqueue(&self, fail: bool) {
        self.inner.lock().fail_enqueue = fail;
    }

    /// Block every call for `delay` (simulates a slow database)
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.inner.lock().delay = delay;
    }

    /// Block only `enqueue` for `delay`, reads stay fast
    pub fn set_enqueue_delay(&self, delay: Option<Duration>) {
        self.inner.lock().enqueue_delay = delay;
    }

    fn pause(&self) {
        let delay = self.inner.lock().delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }
}

impl TelemetryStore for InMemoryStore {
    fn recent_snapshots(&self, limit: usize) -> Result<Vec<RawRecord>, StoreError> {
        self.pause();
        let inner = self.inner.lock();
        if inner.fail_fetch {
            return Err(StoreError::Unavailable("telemetry store offline".to_string()));
        }
        let start = inner.records.len().saturating_sub(limit);
        Ok(inner.records[start..].to_vec())
    }
}

impl CommandQueue for InMemoryStore {
    fn latest_pending(&self) -> Result<Option<Command>, StoreError> {
        self.pause();
        let inner = self.inner.lock();
        if inner.fail_pending {
            return Err(StoreError::Unavailable("command queue offline".to_string()));
        }
        Ok(inner.commands.iter().rev().find(|c| c.pending).cloned())
    }

    fn enqueue(&self, label: &str) -> Result<(), StoreError> {
        self.pause();
        let write_delay = self.inner.lock().enqueue_delay;
        if let Some(delay) = write_delay {
            std::thread::sleep(delay);
        }
        let mut inner = self.inner.lock();
        if inner.fail_enqueue {
            return Err(StoreError::Unavailable("command queue rejected write".to_string()));
        }
        inner.commands.push(Command::pending(label));
        Ok(())
    }
}
