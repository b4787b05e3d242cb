//! Engine Status API - serializable views for dashboards
//!
//! Read-only. Everything here goes through a `StatusHandle`; nothing reaches
//! into the running loop.

use serde::{Deserialize, Serialize};

use crate::constants::APP_VERSION;
use crate::logic::alarm::{ClassLabel, Decision};
use crate::logic::model::ModelInfo;
use crate::logic::snapshot::SNAPSHOT_SCHEMA_VERSION;
use crate::logic::status::{DecisionRecord, StatusHandle};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatusResponse {
    pub version: String,
    pub running: bool,

    pub snapshot_schema_version: u8,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub feature_count: usize,

    pub model: ModelStatus,
    pub ticks: TickStats,
    pub alarm: AlarmStatus,

    pub last_error: Option<String>,
    pub last_tick_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub engine: String, // "onnx" | "rules"
    pub loaded: bool,
    pub info: Option<ModelInfo>,
    pub inference_count: u64,
    pub avg_latency_ms: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickStats {
    pub total: u64,
    pub processed: u64,
    pub skipped: u64,
    pub commands_written: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmStatus {
    /// Last decision as a command, e.g. `ALARM:GAS`
    pub current: Option<String>,
    pub last_prediction: Option<String>,
    pub suspecting: Option<String>,
    pub counters: Vec<CounterView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterView {
    pub class: String,
    pub count: u32,
}

/// One history entry, flattened for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionView {
    pub id: String,
    pub timestamp: String,
    pub prediction: String,
    pub command: String,
    pub is_alarm: bool,
    pub dispatched: bool,
}

impl From<&DecisionRecord> for DecisionView {
    fn from(record: &DecisionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            timestamp: record.timestamp.to_rfc3339(),
            prediction: record.prediction.to_string(),
            command: record.decision.command(),
            is_alarm: record.decision.is_alarm(),
            dispatched: record.dispatched,
        }
    }
}

/// Decoded queue command, for consumers reading the queue directly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandView {
    pub command: String,
    pub class: String,
    pub class_id: i64,
    pub is_alarm: bool,
}

pub fn get_engine_status(handle: &StatusHandle) -> EngineStatusResponse {
    let status = handle.snapshot();

    let counters = ClassLabel::ALARM_CLASSES
        .iter()
        .map(|class| CounterView {
            class: class.as_str().to_string(),
            count: status.counters.get(class.as_str()).copied().unwrap_or(0),
        })
        .collect();

    EngineStatusResponse {
        version: APP_VERSION.to_string(),
        running: status.running,
        snapshot_schema_version: SNAPSHOT_SCHEMA_VERSION,
        feature_version: status.layout.version,
        layout_hash: status.layout.hash,
        feature_count: status.layout.feature_count,
        model: ModelStatus {
            engine: status.classifier,
            loaded: status.model.is_some(),
            info: status.model,
            inference_count: status.inference.map(|s| s.inference_count).unwrap_or(0),
            avg_latency_ms: status.inference.map(|s| s.avg_latency_ms).unwrap_or(0.0),
        },
        ticks: TickStats {
            total: status.ticks_total,
            processed: status.ticks_processed,
            skipped: status.ticks_skipped.values().sum(),
            commands_written: status.commands_written,
        },
        alarm: AlarmStatus {
            current: status.last_decision.map(|d| d.command()),
            last_prediction: status.last_prediction.map(|p| p.to_string()),
            suspecting: status.active_class.map(|c| c.to_string()),
            counters,
        },
        last_error: status.last_error,
        last_tick_at: status.last_tick_at.map(|t| t.to_rfc3339()),
    }
}

/// Most recent decisions first
pub fn get_decision_history(handle: &StatusHandle, limit: usize) -> Vec<DecisionView> {
    handle.history(limit).iter().map(DecisionView::from).collect()
}

pub fn decision_from_command(command: &str) -> Option<CommandView> {
    let decision = Decision::from_command(command)?;
    let label = decision.label();
    Some(CommandView {
        command: decision.command(),
        class: label.as_str().to_string(),
        class_id: label.id(),
        is_alarm: decision.is_alarm(),
    })
}
