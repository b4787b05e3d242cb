//! Store Module - Telemetry read + command queue contracts
//!
//! The engine only needs two narrow contracts from the outside world:
//! - "last N snapshots, ascending by time"
//! - "latest pending command" / "enqueue a pending command"
//!
//! Both are synchronous; the tick loop runs them on the blocking pool under
//! a time budget (`call_with_timeout`).

pub mod sqlite;
pub mod memory;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::snapshot::RawRecord;

pub use sqlite::SqliteStore;
pub use memory::InMemoryStore;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store call exceeded its {0:?} budget")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unreadable row: {0}")]
    InvalidRow(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }
}

// ============================================================================
// CONTRACTS
// ============================================================================

/// A command as seen in the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command text, e.g. `ALARM:GAS`
    pub label: String,
    /// Not yet delivered to the actuation layer
    pub pending: bool,
}

impl Command {
    pub fn pending(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pending: true,
        }
    }
}

/// Telemetry read side
pub trait TelemetryStore: Send + Sync {
    /// Last `limit` snapshots for the configured source, ascending by time.
    /// Zero rows is a valid answer.
    fn recent_snapshots(&self, limit: usize) -> Result<Vec<RawRecord>, StoreError>;
}

/// Command queue write side
pub trait CommandQueue: Send + Sync {
    /// Most recent command not yet delivered, if any
    fn latest_pending(&self) -> Result<Option<Command>, StoreError>;

    /// Insert a new command marked not-yet-delivered
    fn enqueue(&self, label: &str) -> Result<(), StoreError>;
}

// ============================================================================
// TIME BUDGET
// ============================================================================

/// Run a blocking store call on the blocking pool, bounded by `budget`.
///
/// On timeout the call is abandoned (the blocking thread may still finish
/// in the background; its result is dropped).
pub async fn call_with_timeout<T, F>(budget: Duration, call: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(budget, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(StoreError::Unavailable(format!("store task failed: {}", join_err))),
        Err(_) => Err(StoreError::Timeout(budget)),
    }
}
