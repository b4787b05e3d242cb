//! Alarm Types
//!
//! Class labels and outgoing decisions.
//! No confirmation logic here, only data structures.

use serde::{Deserialize, Serialize};

use crate::constants::COMMAND_PREFIX;

// ============================================================================
// CLASS LABEL
// ============================================================================

/// Risk class predicted by the classifier.
///
/// Closed set `{0..5}`. Any other id maps to `Unknown`, which is never an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassLabel {
    Normal,
    Gas,
    Fire,
    Flood,
    Intrusion,
    Vibration,
    /// Out-of-range classifier output (raw id kept for logging)
    Unknown(i64),
}

impl ClassLabel {
    /// Every non-NORMAL class, in id order
    pub const ALARM_CLASSES: [ClassLabel; 5] = [
        ClassLabel::Gas,
        ClassLabel::Fire,
        ClassLabel::Flood,
        ClassLabel::Intrusion,
        ClassLabel::Vibration,
    ];

    pub fn from_id(id: i64) -> Self {
        match id {
            0 => ClassLabel::Normal,
            1 => ClassLabel::Gas,
            2 => ClassLabel::Fire,
            3 => ClassLabel::Flood,
            4 => ClassLabel::Intrusion,
            5 => ClassLabel::Vibration,
            other => ClassLabel::Unknown(other),
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            ClassLabel::Normal => 0,
            ClassLabel::Gas => 1,
            ClassLabel::Fire => 2,
            ClassLabel::Flood => 3,
            ClassLabel::Intrusion => 4,
            ClassLabel::Vibration => 5,
            ClassLabel::Unknown(id) => *id,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "NORMAL" => Some(ClassLabel::Normal),
            "GAS" => Some(ClassLabel::Gas),
            "FIRE" => Some(ClassLabel::Fire),
            "FLOOD" => Some(ClassLabel::Flood),
            "INTRUSION" => Some(ClassLabel::Intrusion),
            "VIBRATION" => Some(ClassLabel::Vibration),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLabel::Normal => "NORMAL",
            ClassLabel::Gas => "GAS",
            ClassLabel::Fire => "FIRE",
            ClassLabel::Flood => "FLOOD",
            ClassLabel::Intrusion => "INTRUSION",
            ClassLabel::Vibration => "VIBRATION",
            ClassLabel::Unknown(_) => "UNKNOWN",
        }
    }

    /// True for the five hazard classes
    pub fn is_alarm(&self) -> bool {
        self.alarm_index().is_some()
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ClassLabel::Unknown(_))
    }

    /// Slot of this class in per-class counter arrays
    pub(crate) fn alarm_index(&self) -> Option<usize> {
        match self {
            ClassLabel::Gas => Some(0),
            ClassLabel::Fire => Some(1),
            ClassLabel::Flood => Some(2),
            ClassLabel::Intrusion => Some(3),
            ClassLabel::Vibration => Some(4),
            ClassLabel::Normal | ClassLabel::Unknown(_) => None,
        }
    }
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassLabel::Unknown(id) => write!(f, "UNKNOWN({})", id),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

// ============================================================================
// DECISION
// ============================================================================

/// Outgoing decision of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Nothing confirmed (including evidence still accumulating)
    Normal,
    /// Confirmed alarm; always holds one of `ClassLabel::ALARM_CLASSES`
    Alarm(ClassLabel),
}

impl Decision {
    pub fn label(&self) -> ClassLabel {
        match self {
            Decision::Normal => ClassLabel::Normal,
            Decision::Alarm(class) => *class,
        }
    }

    pub fn is_alarm(&self) -> bool {
        matches!(self, Decision::Alarm(_))
    }

    /// Command text written to the queue, e.g. `ALARM:FIRE`
    pub fn command(&self) -> String {
        format!("{}{}", COMMAND_PREFIX, self.label().as_str())
    }

    /// Parse command text back into a decision (for consumers of the queue)
    pub fn from_command(command: &str) -> Option<Self> {
        let name = command.trim().strip_prefix(COMMAND_PREFIX)?;
        match ClassLabel::from_name(name)? {
            ClassLabel::Normal => Some(Decision::Normal),
            class => Some(Decision::Alarm(class)),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_id_closed_set() {
        assert_eq!(ClassLabel::from_id(0), ClassLabel::Normal);
        assert_eq!(ClassLabel::from_id(2), ClassLabel::Fire);
        assert_eq!(ClassLabel::from_id(5), ClassLabel::Vibration);
        assert_eq!(ClassLabel::from_id(6), ClassLabel::Unknown(6));
        assert_eq!(ClassLabel::from_id(-1), ClassLabel::Unknown(-1));
    }

    #[test]
    fn test_unknown_is_never_an_alarm() {
        let unknown = ClassLabel::from_id(42);
        assert!(!unknown.is_alarm());
        assert!(unknown.is_unknown());
        assert_eq!(unknown.as_str(), "UNKNOWN");
        assert!(!ClassLabel::Normal.is_alarm());
    }

    #[test]
    fn test_id_roundtrip_for_known_classes() {
        for class in ClassLabel::ALARM_CLASSES {
            assert_eq!(ClassLabel::from_id(class.id()), class);
        }
    }

    #[test]
    fn test_decision_command_text() {
        assert_eq!(Decision::Normal.command(), "ALARM:NORMAL");
        assert_eq!(Decision::Alarm(ClassLabel::Intrusion).command(), "ALARM:INTRUSION");
    }

    #[test]
    fn test_decision_from_command() {
        assert_eq!(Decision::from_command("ALARM:NORMAL"), Some(Decision::Normal));
        assert_eq!(Decision::from_command(" ALARM:gas "), Some(Decision::Alarm(ClassLabel::Gas)));
        assert_eq!(Decision::from_command("ALARM:UNKNOWN"), None);
        assert_eq!(Decision::from_command("LED:ON"), None);
    }
}
