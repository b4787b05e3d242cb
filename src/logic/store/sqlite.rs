//! SQLite store - `event_logs` + `command_queue`
//!
//! Same two tables the serial bridge writes to and the actuation layer reads
//! from. Every call opens its own short-lived connection, so a stuck call
//! abandoned by the tick loop never holds a lock the next tick needs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EVENT_SOURCE, DEFAULT_EVENT_STATUS};
use crate::logic::snapshot::RawRecord;
use super::{Command, CommandQueue, StoreError, TelemetryStore};

/// Timestamp format of `event_logs.event_timestamp`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Default busy timeout for each connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Schema SQL (idempotent)
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS event_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_timestamp TEXT NOT NULL,
    event_source TEXT NOT NULL,
    event_status TEXT NOT NULL,
    details TEXT
);

CREATE TABLE IF NOT EXISTS command_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    command TEXT NOT NULL,
    is_sent INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_event_logs_source ON event_logs(event_source, event_status, id);
CREATE INDEX IF NOT EXISTS idx_command_queue_pending ON command_queue(is_sent, id);
"#;

/// Row of `command_queue`, for hosts and the actuation side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedCommand {
    pub id: i64,
    pub command: String,
    pub is_sent: bool,
}

/// SQLite-backed telemetry store and command queue
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    event_source: String,
    event_status: String,
}

impl SqliteStore {
    /// Open (and create if needed) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self {
            path,
            event_source: DEFAULT_EVENT_SOURCE.to_string(),
            event_status: DEFAULT_EVENT_STATUS.to_string(),
        };
        store.run_migrations()?;

        log::info!("SQLite store ready at {:?}", store.path);
        Ok(store)
    }

    /// Read telemetry rows with these `event_source`/`event_status` values
    pub fn with_event_filter(mut self, source: impl Into<String>, status: impl Into<String>) -> Self {
        self.event_source = source.into();
        self.event_status = status.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Writer-side helpers (bridge / actuation layer / tests)
    // ------------------------------------------------------------------------

    /// Append a raw event row, returns its id
    pub fn append_event(
        &self,
        timestamp: NaiveDateTime,
        source: &str,
        status: &str,
        details: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO event_logs (event_timestamp, event_source, event_status, details) \
             VALUES (?1, ?2, ?3, ?4)",
            params![timestamp.format(TIMESTAMP_FORMAT).to_string(), source, status, details],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Append a sensor snapshot row under the configured source/status
    pub fn append_snapshot(&self, details: &str, timestamp: NaiveDateTime) -> Result<i64, StoreError> {
        self.append_event(timestamp, &self.event_source, &self.event_status, details)
    }

    /// Mark a queued command as delivered
    pub fn mark_sent(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.connect()?;
        let updated = conn.execute("UPDATE command_queue SET is_sent = 1 WHERE id = ?1", params![id])?;
        Ok(updated > 0)
    }

    /// Oldest pending command, the one the actuation layer delivers next
    pub fn next_to_deliver(&self) -> Result<Option<QueuedCommand>, StoreError> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT id, command, is_sent FROM command_queue WHERE is_sent = 0 ORDER BY id ASC LIMIT 1",
                [],
                |row| {
                    Ok(QueuedCommand {
                        id: row.get(0)?,
                        command: row.get(1)?,
                        is_sent: row.get::<_, i64>(2)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Every queued command, oldest first
    pub fn list_commands(&self) -> Result<Vec<QueuedCommand>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT id, command, is_sent FROM command_queue ORDER BY id ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(QueuedCommand {
                    id: row.get(0)?,
                    command: row.get(1)?,
                    is_sent: row.get::<_, i64>(2)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl TelemetryStore for SqliteStore {
    fn recent_snapshots(&self, limit: usize) -> Result<Vec<RawRecord>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT details, event_timestamp FROM event_logs \
             WHERE event_source = ?1 AND event_status = ?2 \
             ORDER BY id DESC LIMIT ?3",
        )?;

        let rows = stmt
            .query_map(
                params![self.event_source, self.event_status, limit as i64],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        // An unreadable row fails the whole read, never shortens the window
        let mut records = rows
            .into_iter()
            .map(|(details, ts)| {
                parse_timestamp(&ts)
                    .map(|timestamp| RawRecord::new(details.unwrap_or_default(), timestamp))
                    .ok_or_else(|| StoreError::InvalidRow(format!("unreadable timestamp '{}'", ts)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Newest-first from the query, callers want ascending
        records.reverse();
        Ok(records)
    }
}

impl CommandQueue for SqliteStore {
    fn latest_pending(&self) -> Result<Option<Command>, StoreError> {
        let conn = self.connect()?;
        let label = conn
            .query_row(
                "SELECT command FROM command_queue WHERE is_sent = 0 ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(label.map(Command::pending))
    }

    fn enqueue(&self, label: &str) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO command_queue (command, is_sent) VALUES (?1, 0)",
            params![label],
        )?;
        Ok(())
    }
}

/// Parse a stored timestamp, accepting the common SQL/ISO spellings
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}
