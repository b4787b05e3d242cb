//! Rule Classifier - fallback when no model is loaded
//!
//! Applies the labeling rules the training set was built with, to the raw
//! readings of the newest snapshot. First matching rule wins.

use crate::logic::alarm::ClassLabel;
use crate::logic::features::{FeatureVector, FEATURE_LAYOUT};
use super::classifier::{Classifier, ClassifierError};

/// Flame sensor reads low when it sees a flame
pub const FLAME_TRIGGER: f32 = 700.0;
pub const GAS_TRIGGER: f32 = 700.0;
pub const WATER_TRIGGER: f32 = 150.0;
/// Light level above which a close object counts as presence
pub const LDR_TRIGGER: f32 = 700.0;
/// Distance (cm) below which an object is "close"
pub const DISTANCE_TRIGGER: f32 = 30.0;

#[derive(Debug, Clone, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    fn label(vector: &FeatureVector) -> ClassLabel {
        let value = |name: &str| vector.get_by_name(name).unwrap_or(0.0);

        let gas = value("GAS");
        let flame = value("FLAME");
        let ldr = value("LDR");
        let water = value("WATER");
        let vibration = value("VIBRATION");
        let distance = value("DISTANCE");

        if flame <= FLAME_TRIGGER {
            ClassLabel::Fire
        } else if gas >= GAS_TRIGGER {
            ClassLabel::Gas
        } else if water >= WATER_TRIGGER {
            ClassLabel::Flood
        } else if ldr > LDR_TRIGGER && distance != 0.0 && distance.abs() < DISTANCE_TRIGGER {
            ClassLabel::Intrusion
        } else if vibration == 1.0 {
            // flame > 700 and gas < 700 already hold here
            ClassLabel::Vibration
        } else {
            ClassLabel::Normal
        }
    }
}

impl Classifier for RuleClassifier {
    fn classify(&self, vector: &FeatureVector) -> Result<ClassLabel, ClassifierError> {
        Ok(Self::label(vector))
    }

    fn feature_names(&self) -> Vec<String> {
        FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect()
    }

    fn name(&self) -> &str {
        "rules"
    }
}
