//! Snapshot Types
//!
//! Typed view of one timestamped reading across all sensors.
//! No parsing logic here, only the data structure and its fill rules.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// SCHEMA
// ============================================================================

/// Snapshot schema version. Bump when the required set or alias rules change.
pub const SNAPSHOT_SCHEMA_VERSION: u8 = 1;

/// Fields every snapshot is guaranteed to carry (defaulted to 0 when absent)
pub const REQUIRED_FIELDS: [&str; 6] = ["GAS", "FLAME", "LDR", "WATER", "VIBRATION", "DISTANCE"];

pub const FIELD_GAS: &str = "GAS";
pub const FIELD_FLAME: &str = "FLAME";
pub const FIELD_LDR: &str = "LDR";
pub const FIELD_WATER: &str = "WATER";
pub const FIELD_VIBRATION: &str = "VIBRATION";
pub const FIELD_DISTANCE: &str = "DISTANCE";

/// Legacy firmware name for `DISTANCE`
pub const FIELD_DIST_ALIAS: &str = "DIST";

// ============================================================================
// RAW RECORD (telemetry store row)
// ============================================================================

/// One unparsed telemetry row: `K1=V1,K2=V2,...` plus its store timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub details: String,
    pub timestamp: NaiveDateTime,
}

impl RawRecord {
    pub fn new(details: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            details: details.into(),
            timestamp,
        }
    }
}

// ============================================================================
// SENSOR SNAPSHOT
// ============================================================================

/// One parsed sensor reading.
///
/// Immutable once built. `new` applies the alias and default-fill rules, so a
/// snapshot can never be missing a required field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    timestamp: NaiveDateTime,
    fields: BTreeMap<String, f64>,
}

impl SensorSnapshot {
    /// Build a snapshot from already-typed fields.
    ///
    /// Keys are expected upper-case. `DIST` is copied to `DISTANCE` when the
    /// latter is absent, then every required field missing is set to 0.
    pub fn new(timestamp: NaiveDateTime, mut fields: BTreeMap<String, f64>) -> Self {
        if !fields.contains_key(FIELD_DISTANCE) {
            if let Some(dist) = fields.get(FIELD_DIST_ALIAS).copied() {
                fields.insert(FIELD_DISTANCE.to_string(), dist);
            }
        }

        for name in REQUIRED_FIELDS {
            fields.entry(name.to_string()).or_insert(0.0);
        }

        Self { timestamp, fields }
    }

    /// Reading time, naive (device/store clock)
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Value of a field, 0 when the snapshot does not carry it
    pub fn get(&self, name: &str) -> f64 {
        self.field(name).unwrap_or(0.0)
    }

    /// Value of a field if present
    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }

    pub fn gas(&self) -> f64 {
        self.get(FIELD_GAS)
    }

    pub fn flame(&self) -> f64 {
        self.get(FIELD_FLAME)
    }

    pub fn ldr(&self) -> f64 {
        self.get(FIELD_LDR)
    }

    pub fn water(&self) -> f64 {
        self.get(FIELD_WATER)
    }

    pub fn vibration(&self) -> f64 {
        self.get(FIELD_VIBRATION)
    }

    pub fn distance(&self) -> f64 {
        self.get(FIELD_DISTANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(10, 20, 30)
            .unwrap()
    }

    #[test]
    fn test_required_fields_defaulted() {
        let snap = SensorSnapshot::new(ts(), BTreeMap::new());
        for name in REQUIRED_FIELDS {
            assert_eq!(snap.field(name), Some(0.0), "{} should default to 0", name);
        }
    }

    #[test]
    fn test_dist_alias_copied() {
        let mut fields = BTreeMap::new();
        fields.insert("DIST".to_string(), 42.0);
        let snap = SensorSnapshot::new(ts(), fields);
        assert_eq!(snap.distance(), 42.0);
    }

    #[test]
    fn test_distance_wins_over_alias() {
        let mut fields = BTreeMap::new();
        fields.insert("DIST".to_string(), 42.0);
        fields.insert("DISTANCE".to_string(), 7.5);
        let snap = SensorSnapshot::new(ts(), fields);
        assert_eq!(snap.distance(), 7.5);
    }

    #[test]
    fn test_optional_fields_kept() {
        let mut fields = BTreeMap::new();
        fields.insert("TEMP".to_string(), 23.5);
        let snap = SensorSnapshot::new(ts(), fields);
        assert_eq!(snap.field("TEMP"), Some(23.5));
        assert_eq!(snap.field("HUM"), None);
        assert_eq!(snap.get("HUM"), 0.0);
    }
}
