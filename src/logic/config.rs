//! Engine Configuration
//!
//! Defaults (`constants.rs`) → optional JSON file → environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    env_string, DATA_DIR_NAME, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_DB_FILE, DEFAULT_EVENT_SOURCE,
    DEFAULT_EVENT_STATUS, DEFAULT_HISTORY_CAPACITY, DEFAULT_TICK_INTERVAL_MS, ENV_CONFIG_FILE,
    ENV_DB_PATH, ENV_MODEL_PATH, ENV_MODEL_SHA256, ENV_THRESHOLD_PREFIX, ENV_TICK_MS,
    ENV_TIMEOUT_MS,
};
use crate::logic::alarm::{AlarmThresholds, ClassLabel};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite file holding `event_logs` and `command_queue`
    pub db_path: PathBuf,
    /// ONNX export; `None` runs the rule classifier
    pub model_path: Option<PathBuf>,
    /// Expected hex SHA-256 of the model file
    pub model_sha256: Option<String>,
    pub tick_interval_ms: u64,
    /// Budget for each blocking store call
    pub call_timeout_ms: u64,
    pub event_source: String,
    pub event_status: String,
    pub thresholds: AlarmThresholds,
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            model_path: None,
            model_sha256: None,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            event_source: DEFAULT_EVENT_SOURCE.to_string(),
            event_status: DEFAULT_EVENT_STATUS.to_string(),
            thresholds: AlarmThresholds::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// `<data_local_dir>/smart-home-ai/smart_home.db`, or the working dir when
/// the platform has no data dir
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
        .join(DEFAULT_DB_FILE)
}

impl EngineConfig {
    /// Full layering from the process environment, validated
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env_string(ENV_CONFIG_FILE) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(env_string)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file; absent keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Apply overrides from `lookup` (the environment, or a map in tests)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_MODEL_PATH) {
            self.model_path = Some(PathBuf::from(path));
        }
        if let Some(sha) = lookup(ENV_MODEL_SHA256) {
            self.model_sha256 = Some(sha);
        }
        if let Some(ms) = parse_env::<u64, _>(&lookup, ENV_TICK_MS)? {
            self.tick_interval_ms = ms;
        }
        if let Some(ms) = parse_env::<u64, _>(&lookup, ENV_TIMEOUT_MS)? {
            self.call_timeout_ms = ms;
        }
        for class in ClassLabel::ALARM_CLASSES {
            let key = format!("{}{}", ENV_THRESHOLD_PREFIX, class.as_str());
            if let Some(value) = parse_env::<u32, _>(&lookup, &key)? {
                self.thresholds.set(class, value);
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(class) = self.thresholds.find_invalid() {
            return Err(ConfigError::Invalid(format!(
                "threshold for {} must be at least 1",
                class
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be non-zero".to_string()));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid("call_timeout_ms must be non-zero".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be non-zero".to_string()));
        }
        if self.event_source.trim().is_empty() {
            return Err(ConfigError::Invalid("event_source must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value,
            }),
    }
}
