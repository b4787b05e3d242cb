//! Alarm Confirmation Thresholds
//!
//! How many consecutive same-class predictions each hazard needs before it
//! escalates. Calibrated per sensor false-positive rate.
//! No confirmation logic here - only constants and config.

use serde::{Deserialize, Serialize};

use super::types::ClassLabel;

// ============================================================================
// DEFAULTS
// ============================================================================

pub const GAS_THRESHOLD: u32 = 3;
pub const FIRE_THRESHOLD: u32 = 3;
pub const FLOOD_THRESHOLD: u32 = 2;
/// Intrusion is inferred from light + distance together, so it needs the most evidence
pub const INTRUSION_THRESHOLD: u32 = 4;
/// The vibration switch is a direct reading
pub const VIBRATION_THRESHOLD: u32 = 1;

/// Used for any class without its own entry
pub const FALLBACK_THRESHOLD: u32 = 3;

// ============================================================================
// CONFIGURABLE THRESHOLDS
// ============================================================================

/// Per-class confirmation thresholds (configurable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmThresholds {
    pub gas: u32,
    pub fire: u32,
    pub flood: u32,
    pub intrusion: u32,
    pub vibration: u32,
}

impl Default for AlarmThresholds {
    fn default() -> Self {
        Self {
            gas: GAS_THRESHOLD,
            fire: FIRE_THRESHOLD,
            flood: FLOOD_THRESHOLD,
            intrusion: INTRUSION_THRESHOLD,
            vibration: VIBRATION_THRESHOLD,
        }
    }
}

impl AlarmThresholds {
    /// Threshold for a class. Never below 1.
    pub fn get(&self, class: ClassLabel) -> u32 {
        let value = match class {
            ClassLabel::Gas => self.gas,
            ClassLabel::Fire => self.fire,
            ClassLabel::Flood => self.flood,
            ClassLabel::Intrusion => self.intrusion,
            ClassLabel::Vibration => self.vibration,
            ClassLabel::Normal | ClassLabel::Unknown(_) => FALLBACK_THRESHOLD,
        };
        value.max(1)
    }

    /// Set the threshold for a hazard class; ignored for NORMAL/UNKNOWN
    pub fn set(&mut self, class: ClassLabel, value: u32) {
        match class {
            ClassLabel::Gas => self.gas = value,
            ClassLabel::Fire => self.fire = value,
            ClassLabel::Flood => self.flood = value,
            ClassLabel::Intrusion => self.intrusion = value,
            ClassLabel::Vibration => self.vibration = value,
            ClassLabel::Normal | ClassLabel::Unknown(_) => {}
        }
    }

    /// First class configured with a zero threshold, if any
    pub fn find_invalid(&self) -> Option<ClassLabel> {
        ClassLabel::ALARM_CLASSES.into_iter().find(|c| self.raw(*c) == 0)
    }

    fn raw(&self, class: ClassLabel) -> u32 {
        match class {
            ClassLabel::Gas => self.gas,
            ClassLabel::Fire => self.fire,
            ClassLabel::Flood => self.flood,
            ClassLabel::Intrusion => self.intrusion,
            ClassLabel::Vibration => self.vibration,
            ClassLabel::Normal | ClassLabel::Unknown(_) => FALLBACK_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = AlarmThresholds::default();
        assert_eq!(t.get(ClassLabel::Gas), 3);
        assert_eq!(t.get(ClassLabel::Fire), 3);
        assert_eq!(t.get(ClassLabel::Flood), 2);
        assert_eq!(t.get(ClassLabel::Intrusion), 4);
        assert_eq!(t.get(ClassLabel::Vibration), 1);
        assert!(t.find_invalid().is_none());
    }

    #[test]
    fn test_set_and_zero_detection() {
        let mut t = AlarmThresholds::default();
        t.set(ClassLabel::Flood, 0);
        assert_eq!(t.find_invalid(), Some(ClassLabel::Flood));
        // get() clamps so the machine can still run
        assert_eq!(t.get(ClassLabel::Flood), 1);

        t.set(ClassLabel::Normal, 9);
        assert_eq!(t, AlarmThresholds { flood: 0, ..Default::default() });
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let t: AlarmThresholds = serde_json::from_str(r#"{"gas": 5}"#).unwrap();
        assert_eq!(t.gas, 5);
        assert_eq!(t.intrusion, INTRUSION_THRESHOLD);
    }
}
