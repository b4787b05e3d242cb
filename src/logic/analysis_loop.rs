//! Analysis Loop - the per-tick decision pipeline
//!
//! fetch window → parse → build features → classify → confirm → dispatch
//!
//! One cooperative loop, no overlapping ticks. `AlarmState` lives here and
//! nowhere else: each tick computes the next state on a copy and commits it
//! only when the tick was not abandoned (fetch failure or timeout).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::logic::alarm::{AlarmState, AlarmThresholds, ClassLabel, Decision};
use crate::logic::config::EngineConfig;
use crate::logic::dispatch::{CommandDispatcher, DispatchError, DispatchOutcome};
use crate::logic::features::{build_features, FeatureError, LayoutMismatchError, ROLLING_WINDOW};
use crate::logic::model::{classify_checked, validate_schema, Classifier, ClassifierError};
use crate::logic::snapshot::{parse_record, SensorSnapshot};
use crate::logic::status::{DecisionRecord, StatusHandle};
use crate::logic::store::{call_with_timeout, CommandQueue, StoreError, TelemetryStore};

// ============================================================================
// TICK RESULT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub prediction: ClassLabel,
    pub decision: Decision,
    pub dispatch: DispatchOutcome,
}

#[derive(Debug, Error)]
pub enum TickError {
    /// Telemetry or pending-command read failed or timed out
    #[error("fetch failed: {0}")]
    Fetch(#[source] StoreError),

    #[error("insufficient data: no snapshots in window")]
    InsufficientData,

    #[error("classifier error: {0}")]
    Classifier(#[source] ClassifierError),

    #[error("dispatch failed: {0}")]
    Dispatch(#[source] DispatchError),

    #[error("feature schema mismatch: {0}")]
    Schema(#[source] LayoutMismatchError),
}

impl TickError {
    /// Stable kind name, used as status key
    pub fn kind(&self) -> &'static str {
        match self {
            TickError::Fetch(_) => "fetch",
            TickError::InsufficientData => "insufficient_data",
            TickError::Classifier(_) => "classifier",
            TickError::Dispatch(_) => "dispatch",
            TickError::Schema(_) => "schema",
        }
    }
}

impl From<FeatureError> for TickError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::InsufficientData => TickError::InsufficientData,
        }
    }
}

impl From<ClassifierError> for TickError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Schema(e) => TickError::Schema(e),
            other => TickError::Classifier(other),
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct Engine {
    telemetry: Arc<dyn TelemetryStore>,
    dispatcher: CommandDispatcher,
    classifier: Arc<dyn Classifier>,
    thresholds: AlarmThresholds,
    state: AlarmState,
    call_timeout: Duration,
    tick_interval: Duration,
    status: StatusHandle,
}

impl Engine {
    /// Wire the engine. Fails if the classifier's columns do not match the
    /// feature layout; that is the only fatal error the engine has.
    pub fn new(
        telemetry: Arc<dyn TelemetryStore>,
        queue: Arc<dyn CommandQueue>,
        classifier: Arc<dyn Classifier>,
        config: &EngineConfig,
    ) -> Result<Self, ClassifierError> {
        validate_schema(classifier.as_ref())?;

        let status = StatusHandle::new(classifier.name(), config.history_capacity);
        status.set_model_info(classifier.model_info());

        Ok(Self {
            telemetry,
            dispatcher: CommandDispatcher::new(queue, config.call_timeout()),
            classifier,
            thresholds: config.thresholds.clone(),
            state: AlarmState::new(),
            call_timeout: config.call_timeout(),
            tick_interval: config.tick_interval(),
            status,
        })
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn state(&self) -> &AlarmState {
        &self.state
    }

    pub fn thresholds(&self) -> &AlarmThresholds {
        &self.thresholds
    }

    /// Run one tick and publish its result
    pub async fn tick(&mut self) -> Result<TickOutcome, TickError> {
        let result = self.process().await;
        self.status.set_inference_stats(self.classifier.inference_stats());

        match &result {
            Ok(outcome) => {
                self.log_outcome(outcome);
                let record = DecisionRecord::new(
                    outcome.prediction,
                    outcome.decision,
                    outcome.dispatch.was_written(),
                );
                self.status
                    .record_decision(record, &self.state.counters(), self.state.active());
            }
            Err(err) => {
                match err {
                    TickError::InsufficientData => log::debug!("Tick skipped: {}", err),
                    TickError::Fetch(_) => log::warn!("Tick skipped: {}", err),
                    TickError::Dispatch(_) => log::warn!("Command not queued, retrying next tick: {}", err),
                    TickError::Classifier(_) => log::error!("Tick aborted: {}", err),
                    TickError::Schema(_) => log::error!("Tick aborted: {}", err),
                }
                let message = match err {
                    TickError::InsufficientData => None,
                    other => Some(other.to_string()),
                };
                self.status.record_skip(err.kind(), message);
                // A failed write still commits, so counters can move on a skip
                self.status
                    .set_alarm_state(&self.state.counters(), self.state.active());
            }
        }

        result
    }

    async fn process(&mut self) -> Result<TickOutcome, TickError> {
        // 1. Fetch
        let telemetry = Arc::clone(&self.telemetry);
        let records = call_with_timeout(self.call_timeout, move || {
            telemetry.recent_snapshots(ROLLING_WINDOW)
        })
        .await
        .map_err(TickError::Fetch)?;

        // 2. Parse + build
        let window: Vec<SensorSnapshot> = records.iter().map(parse_record).collect();
        let vector = build_features(&window)?;

        // 3. Classify
        let prediction = classify_checked(self.classifier.as_ref(), &vector)?;

        // 4. Confirm (on a copy until the tick completes)
        let mut next = self.state.clone();
        let decision = next.observe(prediction, &self.thresholds);

        // 5. Dispatch
        match self.dispatcher.dispatch(decision).await {
            Ok(dispatch) => {
                self.state = next;
                Ok(TickOutcome {
                    prediction,
                    decision,
                    dispatch,
                })
            }
            Err(DispatchError::Read(e)) => Err(TickError::Fetch(e)),
            Err(e) if e.is_timeout() => Err(TickError::Dispatch(e)),
            Err(e) => {
                // The write failed outright; dedup retries it next tick
                self.state = next;
                Err(TickError::Dispatch(e))
            }
        }
    }

    fn log_outcome(&self, outcome: &TickOutcome) {
        let TickOutcome {
            prediction,
            decision,
            dispatch,
        } = outcome;

        log::debug!("Tick: prediction={} decision={}", prediction, decision);

        match decision {
            Decision::Alarm(class) if dispatch.was_written() => {
                log::warn!("[ALARM CONFIRMED] {}", class);
            }
            Decision::Normal if prediction.is_alarm() => {
                log::warn!(
                    "Suspecting {} ({}/{})",
                    prediction,
                    self.state.counter(*prediction),
                    self.thresholds.get(*prediction)
                );
            }
            Decision::Normal if dispatch.was_written() => {
                log::info!("Back to NORMAL");
            }
            _ => {}
        }
    }

    /// Tick every `tick_interval` until `shutdown` resolves.
    ///
    /// Shutdown is only observed between ticks; a tick in progress runs to
    /// completion (bounded by the call timeout).
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        self.status.set_running(true);
        log::info!(
            "Analysis loop started (interval {:?}, classifier '{}')",
            self.tick_interval,
            self.classifier.name()
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    let _ = self.tick().await;
                }
            }
        }

        self.status.set_running(false);
        log::info!("Analysis loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use chrono::{NaiveDate, NaiveDateTime};
    use parking_lot::Mutex;

    use crate::logic::features::{FeatureVector, FEATURE_LAYOUT};
    use crate::logic::model::InferenceStats;
    use crate::logic::store::{InMemoryStore, SqliteStore};

    /// Plays back a script of predictions; `None` is a classifier failure.
    /// NORMAL once the script runs out.
    struct Scripted {
        script: Mutex<VecDeque<Option<i64>>>,
        names: Vec<String>,
        calls: Mutex<u64>,
    }

    impl Scripted {
        fn new(script: &[Option<i64>]) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.iter().copied().collect()),
                names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(0),
            })
        }

        fn labels(labels: &[ClassLabel]) -> Arc<Self> {
            let script: Vec<Option<i64>> = labels.iter().map(|l| Some(l.id())).collect();
            Self::new(&script)
        }
    }

    impl Classifier for Scripted {
        fn classify(&self, _vector: &FeatureVector) -> Result<ClassLabel, ClassifierError> {
            *self.calls.lock() += 1;
            match self.script.lock().pop_front() {
                Some(Some(id)) => Ok(ClassLabel::from_id(id)),
                Some(None) => Err(ClassifierError::Inference("scripted failure".to_string())),
                None => Ok(ClassLabel::Normal),
            }
        }

        fn feature_names(&self) -> Vec<String> {
            self.names.clone()
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn inference_stats(&self) -> Option<InferenceStats> {
            Some(InferenceStats::from_totals(*self.calls.lock(), 0))
        }
    }

    fn at(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, 1)
            .unwrap()
            .and_hms_opt(22, 15, s)
            .unwrap()
    }

    fn config() -> EngineConfig {
        EngineConfig {
            tick_interval_ms: 10,
            call_timeout_ms: 200,
            ..Default::default()
        }
    }

    fn engine(store: &Arc<InMemoryStore>, classifier: Arc<Scripted>) -> Engine {
        Engine::new(store.clone(), store.clone(), classifier, &config()).unwrap()
    }

    fn store_with_reading() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.push_snapshot("GAS=210,FLAME=1010,LDR=320,WATER=0,VIBRATION=0,DISTANCE=140", at(0));
        store
    }

    #[tokio::test]
    async fn test_empty_window_is_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let mut engine = engine(&store, Scripted::labels(&[ClassLabel::Gas]));
        engine.state.observe(ClassLabel::Gas, &AlarmThresholds::default());
        let before = engine.state().clone();

        let err = engine.tick().await.unwrap_err();
        assert!(matches!(err, TickError::InsufficientData));
        assert_eq!(engine.state(), &before);
        assert_eq!(engine.state().counter(ClassLabel::Gas), 1);
        assert!(store.commands().is_empty());
        assert_eq!(engine.status().snapshot().ticks_skipped.get("insufficient_data"), Some(&1));
    }

    #[tokio::test]
    async fn test_identical_ticks_write_once() {
        let store = store_with_reading();
        let mut engine = engine(&store, Scripted::new(&[]));

        for _ in 0..6 {
            engine.tick().await.unwrap();
        }
        assert_eq!(store.command_labels(), vec!["ALARM:NORMAL"]);
        assert_eq!(engine.status().snapshot().commands_written, 1);
    }

    #[tokio::test]
    async fn test_gas_scenario_end_to_end() {
        use ClassLabel::{Gas, Normal};

        let store = store_with_reading();
        let mut engine = engine(&store, Scripted::labels(&[Gas, Gas, Normal, Gas, Gas, Gas]));

        let mut decisions = Vec::new();
        for _ in 0..6 {
            decisions.push(engine.tick().await.unwrap().decision);
        }

        assert_eq!(decisions[..5], [Decision::Normal; 5]);
        assert_eq!(decisions[5], Decision::Alarm(Gas));
        assert_eq!(store.command_labels(), vec!["ALARM:NORMAL", "ALARM:GAS"]);
    }

    #[tokio::test]
    async fn test_vibration_dispatches_immediately() {
        let store = store_with_reading();
        let mut engine = engine(&store, Scripted::labels(&[ClassLabel::Vibration]));

        let outcome = engine.tick().await.unwrap();
        assert_eq!(outcome.dispatch, DispatchOutcome::Written("ALARM:VIBRATION".to_string()));
    }

    #[tokio::test]
    async fn test_classifier_failure_leaves_state_untouched() {
        let store = store_with_reading();
        let mut engine = engine(&store, Scripted::new(&[Some(1), None, Some(42)]));

        engine.tick().await.unwrap();
        let before = engine.state().clone();
        let writes = store.commands().len();

        assert!(matches!(engine.tick().await, Err(TickError::Classifier(_))));
        assert_eq!(engine.state(), &before);

        // Out-of-range id is a classifier error too
        let err = engine.tick().await.unwrap_err();
        assert!(matches!(err, TickError::Classifier(ClassifierError::OutOfRange(42))));
        assert_eq!(engine.state(), &before);
        assert_eq!(store.commands().len(), writes);
    }

    #[tokio::test]
    async fn test_fetch_failure_and_timeout_are_skipped() {
        let store = store_with_reading();
        let mut engine = engine(&store, Scripted::labels(&[ClassLabel::Fire, ClassLabel::Fire]));

        store.set_fail_fetch(true);
        assert!(matches!(engine.tick().await, Err(TickError::Fetch(_))));
        store.set_fail_fetch(false);

        store.set_delay(Some(Duration::from_millis(400)));
        match engine.tick().await {
            Err(TickError::Fetch(e)) => assert!(e.is_timeout()),
            other => panic!("expected fetch timeout, got {:?}", other),
        }
        store.set_delay(None);

        assert!(engine.state().is_idle());
        assert!(store.commands().is_empty());
        assert_eq!(engine.status().snapshot().ticks_skipped.get("fetch"), Some(&2));
    }

    #[tokio::test]
    async fn test_pending_read_failure_does_not_commit() {
        let store = store_with_reading();
        let mut engine = engine(&store, Scripted::labels(&[ClassLabel::Flood]));

        store.set_fail_pending(true);
        assert!(matches!(engine.tick().await, Err(TickError::Fetch(_))));
        assert!(engine.state().is_idle());
    }

    #[tokio::test]
    async fn test_write_failure_is_retried_next_tick() {
        let store = store_with_reading();
        let mut engine = engine(
            &store,
            Scripted::labels(&[ClassLabel::Vibration, ClassLabel::Vibration]),
        );

        store.set_fail_enqueue(true);
        assert!(matches!(engine.tick().await, Err(TickError::Dispatch(_))));
        assert_eq!(engine.state().counter(ClassLabel::Vibration), 1);
        assert!(store.commands().is_empty());

        let status = engine.status().snapshot();
        assert_eq!(status.counters.get("VIBRATION"), Some(&1));
        assert_eq!(status.active_class, Some(ClassLabel::Vibration));

        store.set_fail_enqueue(false);
        let outcome = engine.tick().await.unwrap();
        assert!(outcome.dispatch.was_written());
        assert_eq!(store.command_labels(), vec!["ALARM:VIBRATION"]);
    }

    #[tokio::test]
    async fn test_write_timeout_does_not_commit() {
        let store = store_with_reading();
        let mut engine = engine(&store, Scripted::labels(&[ClassLabel::Intrusion]));
        let before = engine.state().clone();

        store.set_enqueue_delay(Some(Duration::from_millis(400)));
        match engine.tick().await {
            Err(TickError::Dispatch(e)) => assert!(e.is_timeout()),
            other => panic!("expected dispatch timeout, got {:?}", other),
        }
        assert_eq!(engine.state(), &before);
        assert_eq!(engine.state().counter(ClassLabel::Intrusion), 0);
        assert_eq!(engine.status().snapshot().ticks_skipped.get("dispatch"), Some(&1));
    }

    #[tokio::test]
    async fn test_unreadable_newest_row_skips_tick() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smart_home.db");
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        store.append_snapshot("GAS=100", at(0)).unwrap();
        store.append_snapshot("GAS=200", at(1)).unwrap();
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute(
                "INSERT INTO event_logs (event_timestamp, event_source, event_status, details) \
                 VALUES ('01/02/2025 22:15', 'SENSORS', 'ALL', 'GAS=900')",
                [],
            )
            .unwrap();

        let classifier = Scripted::labels(&[ClassLabel::Gas]);
        let mut engine = Engine::new(store.clone(), store.clone(), classifier.clone(), &config()).unwrap();

        assert!(matches!(engine.tick().await, Err(TickError::Fetch(StoreError::InvalidRow(_)))));
        assert!(engine.state().is_idle());
        assert_eq!(*classifier.calls.lock(), 0);
        assert!(store.list_commands().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inference_stats_published() {
        let store = store_with_reading();
        let mut engine = engine(&store, Scripted::new(&[]));
        let status = engine.status();
        assert!(status.snapshot().model.is_none());

        engine.tick().await.unwrap();
        engine.tick().await.unwrap();

        let stats = status.snapshot().inference.unwrap();
        assert_eq!(stats.inference_count, 2);
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_fatal_at_startup() {
        let store = Arc::new(InMemoryStore::new());
        let classifier = Arc::new(Scripted {
            script: Mutex::new(VecDeque::new()),
            names: vec!["GAS".to_string(), "FLAME".to_string()],
            calls: Mutex::new(0),
        });

        let result = Engine::new(store.clone(), store.clone(), classifier, &config());
        assert!(matches!(result, Err(ClassifierError::Schema(_))));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = store_with_reading();
        let mut engine = engine(&store, Scripted::new(&[]));
        let status = engine.status();

        engine.run(tokio::time::sleep(Duration::from_millis(80))).await;

        let snapshot = status.snapshot();
        assert!(!snapshot.running);
        assert!(snapshot.ticks_total >= 1);
        assert_eq!(store.command_labels(), vec!["ALARM:NORMAL"]);
        assert!(!status.history(5).is_empty());
    }
}
