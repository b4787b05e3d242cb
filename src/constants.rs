//! Central Configuration Constants
//!
//! Single source of truth for all engine defaults.
//! `EngineConfig` starts from these and layers file/env overrides on top.

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Smart Home AI Core";

/// Directory name under the platform data dir
pub const DATA_DIR_NAME: &str = "smart-home-ai";

/// Default SQLite database file name
pub const DEFAULT_DB_FILE: &str = "smart_home.db";

/// Default tick interval (milliseconds)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 2_000;

/// Default budget for a single blocking store call (milliseconds)
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 5_000;

/// Telemetry rows we read: `event_source` column value
pub const DEFAULT_EVENT_SOURCE: &str = "SENSORS";

/// Telemetry rows we read: `event_status` column value
pub const DEFAULT_EVENT_STATUS: &str = "ALL";

/// How many recent decisions the status history keeps
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Prefix of every command written to the queue
pub const COMMAND_PREFIX: &str = "ALARM:";

// ============================================
// Environment variable names
// ============================================

pub const ENV_CONFIG_FILE: &str = "SMART_HOME_CONFIG";
pub const ENV_DB_PATH: &str = "SMART_HOME_DB_PATH";
pub const ENV_MODEL_PATH: &str = "SMART_HOME_MODEL_PATH";
pub const ENV_MODEL_SHA256: &str = "SMART_HOME_MODEL_SHA256";
pub const ENV_TICK_MS: &str = "SMART_HOME_TICK_MS";
pub const ENV_TIMEOUT_MS: &str = "SMART_HOME_TIMEOUT_MS";

/// Prefix for per-class threshold overrides, e.g. `SMART_HOME_THRESHOLD_GAS=5`
pub const ENV_THRESHOLD_PREFIX: &str = "SMART_HOME_THRESHOLD_";

// ============================================
// Helper to read from env
// ============================================

/// Read a string variable, `None` when unset or blank
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
