//! Engine Status - polling surface
//!
//! The tick loop publishes here after every tick; dashboards and hosts read
//! snapshots through a cloneable `StatusHandle`. Readers never touch the
//! loop's `AlarmState` directly.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::DEFAULT_HISTORY_CAPACITY;
use crate::logic::alarm::{ClassLabel, Decision};
use crate::logic::features::LayoutInfo;
use crate::logic::model::{InferenceStats, ModelInfo};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// One processed tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub prediction: ClassLabel,
    pub decision: Decision,
    /// A new command was written this tick
    pub dispatched: bool,
}

impl DecisionRecord {
    pub fn new(prediction: ClassLabel, decision: Decision, dispatched: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            prediction,
            decision,
            dispatched,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub running: bool,
    pub classifier: String,
    /// Set when the classifier runs a model file
    pub model: Option<ModelInfo>,
    pub inference: Option<InferenceStats>,
    pub layout: LayoutInfo,

    pub ticks_total: u64,
    pub ticks_processed: u64,
    /// Skipped ticks by error kind
    pub ticks_skipped: BTreeMap<String, u64>,
    pub commands_written: u64,

    pub last_prediction: Option<ClassLabel>,
    pub last_decision: Option<Decision>,
    pub active_class: Option<ClassLabel>,
    /// Counter per alarm class, by class name
    pub counters: BTreeMap<String, u32>,

    pub last_error: Option<String>,
    pub last_tick_at: Option<DateTime<Utc>>,
}

impl EngineStatus {
    fn new(classifier: &str) -> Self {
        Self {
            running: false,
            classifier: classifier.to_string(),
            model: None,
            inference: None,
            layout: LayoutInfo::current(),
            ticks_total: 0,
            ticks_processed: 0,
            ticks_skipped: BTreeMap::new(),
            commands_written: 0,
            last_prediction: None,
            last_decision: None,
            active_class: None,
            counters: ClassLabel::ALARM_CLASSES
                .iter()
                .map(|c| (c.as_str().to_string(), 0))
                .collect(),
            last_error: None,
            last_tick_at: None,
        }
    }
}

// ============================================================================
// SHARED HANDLE
// ============================================================================

#[derive(Debug)]
struct Shared {
    status: EngineStatus,
    history: VecDeque<DecisionRecord>,
    capacity: usize,
}

/// Cheap to clone; every clone sees the same status
#[derive(Debug, Clone)]
pub struct StatusHandle {
    inner: Arc<RwLock<Shared>>,
}

impl Default for StatusHandle {
    fn default() -> Self {
        Self::new("none", DEFAULT_HISTORY_CAPACITY)
    }
}

impl StatusHandle {
    pub fn new(classifier: &str, history_capacity: usize) -> Self {
        let capacity = history_capacity.max(1);
        Self {
            inner: Arc::new(RwLock::new(Shared {
                status: EngineStatus::new(classifier),
                history: VecDeque::with_capacity(capacity),
                capacity,
            })),
        }
    }

    /// Current status snapshot
    pub fn snapshot(&self) -> EngineStatus {
        self.inner.read().status.clone()
    }

    /// Most recent decisions first, at most `limit`
    pub fn history(&self, limit: usize) -> Vec<DecisionRecord> {
        self.inner.read().history.iter().rev().take(limit).cloned().collect()
    }

    pub fn set_running(&self, running: bool) {
        self.inner.write().status.running = running;
    }

    pub fn set_model_info(&self, model: Option<ModelInfo>) {
        self.inner.write().status.model = model;
    }

    pub fn set_inference_stats(&self, stats: Option<InferenceStats>) {
        self.inner.write().status.inference = stats;
    }

    /// Publish the confirmation counters without counting a tick
    pub fn set_alarm_state(&self, counters: &[(ClassLabel, u32)], active: Option<ClassLabel>) {
        let mut shared = self.inner.write();
        apply_alarm_state(&mut shared.status, counters, active);
    }

    /// Record a tick that ran to the confirmation step
    pub fn record_decision(
        &self,
        record: DecisionRecord,
        counters: &[(ClassLabel, u32)],
        active: Option<ClassLabel>,
    ) {
        let mut shared = self.inner.write();

        {
            let status = &mut shared.status;
            status.ticks_total += 1;
            status.ticks_processed += 1;
            if record.dispatched {
                status.commands_written += 1;
            }
            status.last_prediction = Some(record.prediction);
            status.last_decision = Some(record.decision);
            apply_alarm_state(status, counters, active);
            status.last_tick_at = Some(record.timestamp);
        }

        if shared.history.len() >= shared.capacity {
            shared.history.pop_front();
        }
        shared.history.push_back(record);
    }

    /// Record a skipped tick
    pub fn record_skip(&self, kind: &str, error: Option<String>) {
        let mut shared = self.inner.write();
        let status = &mut shared.status;
        status.ticks_total += 1;
        *status.ticks_skipped.entry(kind.to_string()).or_insert(0) += 1;
        if error.is_some() {
            status.last_error = error;
        }
        status.last_tick_at = Some(Utc::now());
    }
}

fn apply_alarm_state(
    status: &mut EngineStatus,
    counters: &[(ClassLabel, u32)],
    active: Option<ClassLabel>,
) {
    status.active_class = active;
    for (class, count) in counters {
        status.counters.insert(class.as_str().to_string(), *count);
    }
}
