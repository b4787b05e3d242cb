//! Alarm Confirmation State Machine
//!
//! Per-class hysteresis: a hazard is only confirmed after `threshold(c)`
//! consecutive predictions of the same class.
//!
//! Invariants held after every `observe`:
//! - at most one counter is non-zero
//! - no counter exceeds its threshold
//! - NORMAL clears everything
//! - the decision is an alarm iff the active counter reached its threshold

use serde::{Deserialize, Serialize};

use super::rules::AlarmThresholds;
use super::types::{ClassLabel, Decision};

const CLASS_SLOTS: usize = ClassLabel::ALARM_CLASSES.len();

/// Where the machine currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmPhase {
    /// All counters zero
    Idle,
    /// `1 <= count <= threshold(class)`; confirmed once `count == threshold`
    Suspecting { class: ClassLabel, count: u32 },
}

/// Confirmation counters.
///
/// Owned by the tick loop and never shared. Restarting the engine starts
/// from `Idle` again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmState {
    counters: [u32; CLASS_SLOTS],
}

impl AlarmState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one prediction, return the outgoing decision.
    ///
    /// `Unknown` carries no information: the state is left untouched and the
    /// current decision is returned unchanged.
    pub fn observe(&mut self, prediction: ClassLabel, thresholds: &AlarmThresholds) -> Decision {
        match prediction {
            ClassLabel::Normal => {
                self.reset();
                Decision::Normal
            }
            ClassLabel::Unknown(id) => {
                log::debug!("Ignoring unknown class id {} in confirmation step", id);
                self.decision(thresholds)
            }
            class => {
                let Some(slot) = class.alarm_index() else {
                    return self.decision(thresholds);
                };
                let threshold = thresholds.get(class);

                let count = self.counters[slot].saturating_add(1).min(threshold);
                self.counters = [0; CLASS_SLOTS];
                self.counters[slot] = count;

                if count >= threshold {
                    Decision::Alarm(class)
                } else {
                    Decision::Normal
                }
            }
        }
    }

    /// Decision implied by the current counters, without feeding anything
    pub fn decision(&self, thresholds: &AlarmThresholds) -> Decision {
        match self.phase() {
            AlarmPhase::Suspecting { class, count } if count >= thresholds.get(class) => {
                Decision::Alarm(class)
            }
            _ => Decision::Normal,
        }
    }

    /// Clear all counters
    pub fn reset(&mut self) {
        self.counters = [0; CLASS_SLOTS];
    }

    pub fn counter(&self, class: ClassLabel) -> u32 {
        class.alarm_index().map(|i| self.counters[i]).unwrap_or(0)
    }

    /// Class currently accumulating evidence, if any
    pub fn active(&self) -> Option<ClassLabel> {
        ClassLabel::ALARM_CLASSES
            .into_iter()
            .find(|class| self.counter(*class) > 0)
    }

    pub fn phase(&self) -> AlarmPhase {
        match self.active() {
            Some(class) => AlarmPhase::Suspecting {
                class,
                count: self.counter(class),
            },
            None => AlarmPhase::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active().is_none()
    }

    /// `(class, count)` for every hazard class, in id order
    pub fn counters(&self) -> Vec<(ClassLabel, u32)> {
        ClassLabel::ALARM_CLASSES
            .into_iter()
            .map(|class| (class, self.counter(class)))
            .collect()
    }
}
