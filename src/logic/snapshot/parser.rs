//! Snapshot Parser
//!
//! `K1=V1,K2=V2,...` → `SensorSnapshot`.
//! Tolerant by contract: a bad value becomes 0, it never rejects the record.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::types::{RawRecord, SensorSnapshot, FIELD_DISTANCE, FIELD_DIST_ALIAS};

/// Parsed value of one token before default-fill
#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldValue {
    /// Numeric reading (malformed input already collapsed to 0)
    Number(f64),
    /// Empty / `null` / `nan` value: treated as if the key were absent
    Missing,
}

/// Parse a raw telemetry row
pub fn parse_record(record: &RawRecord) -> SensorSnapshot {
    parse_snapshot(&record.details, record.timestamp)
}

/// Parse an attribute string taken at `timestamp`
pub fn parse_snapshot(details: &str, timestamp: NaiveDateTime) -> SensorSnapshot {
    SensorSnapshot::new(timestamp, parse_details(details))
}

/// Parse the attribute string into upper-cased keys.
///
/// Alias resolution happens here because it needs to see null values:
/// `DISTANCE` wins over `DIST` unless `DISTANCE` is missing or null.
pub fn parse_details(details: &str) -> BTreeMap<String, f64> {
    let mut raw: BTreeMap<String, FieldValue> = BTreeMap::new();

    for token in details.split(',') {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };

        let key = key.trim().to_uppercase();
        if key.is_empty() {
            continue;
        }

        raw.insert(key, parse_value(value));
    }

    let distance = match (raw.get(FIELD_DISTANCE), raw.get(FIELD_DIST_ALIAS)) {
        (Some(FieldValue::Number(v)), _) => Some(*v),
        (_, Some(FieldValue::Number(v))) => Some(*v),
        _ => None,
    };

    let mut fields: BTreeMap<String, f64> = raw
        .into_iter()
        .filter_map(|(k, v)| match v {
            FieldValue::Number(n) => Some((k, n)),
            FieldValue::Missing => None,
        })
        .collect();

    if let Some(d) = distance {
        fields.insert(FIELD_DISTANCE.to_string(), d);
    }

    fields
}

fn parse_value(value: &str) -> FieldValue {
    let value = value.trim();

    if value.is_empty()
        || value.eq_ignore_ascii_case("null")
        || value.eq_ignore_ascii_case("none")
        || value.eq_ignore_ascii_case("nan")
    {
        return FieldValue::Missing;
    }

    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => FieldValue::Number(n),
        _ => {
            log::debug!("Malformed sensor value '{}', defaulting to 0", value);
            FieldValue::Number(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::snapshot::types::REQUIRED_FIELDS;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(21, 7, 5)
            .unwrap()
    }

    #[test]
    fn test_parse_full_record() {
        let snap = parse_snapshot(
            "GAS=312,FLAME=1020,LDR=455,WATER=12,VIBRATION=0,DISTANCE=87.5,TEMP=24.1,HUM=51",
            ts(),
        );

        assert_eq!(snap.gas(), 312.0);
        assert_eq!(snap.flame(), 1020.0);
        assert_eq!(snap.ldr(), 455.0);
        assert_eq!(snap.water(), 12.0);
        assert_eq!(snap.vibration(), 0.0);
        assert_eq!(snap.distance(), 87.5);
        assert_eq!(snap.field("TEMP"), Some(24.1));
        assert_eq!(snap.field("HUM"), Some(51.0));
        assert_eq!(snap.timestamp(), ts());
    }

    #[test]
    fn test_keys_trimmed_and_uppercased() {
        let snap = parse_snapshot(" gas = 10 , Flame=20", ts());
        assert_eq!(snap.gas(), 10.0);
        assert_eq!(snap.flame(), 20.0);
    }

    #[test]
    fn test_split_on_first_equals() {
        let fields = parse_details("NOTE=a=b,GAS=5");
        // "a=b" is not a number, so it collapses to 0
        assert_eq!(fields.get("NOTE"), Some(&0.0));
        assert_eq!(fields.get("GAS"), Some(&5.0));
    }

    #[test]
    fn test_malformed_value_defaults_to_zero() {
        let snap = parse_snapshot("GAS=abc,FLAME=900", ts());
        assert_eq!(snap.gas(), 0.0);
        assert_eq!(snap.flame(), 900.0);
    }

    #[test]
    fn test_tokens_without_equals_ignored() {
        let snap = parse_snapshot("garbage,,GAS=1", ts());
        assert_eq!(snap.gas(), 1.0);
        assert_eq!(snap.field("GARBAGE"), None);
    }

    #[test]
    fn test_empty_string_yields_defaults() {
        let snap = parse_snapshot("", ts());
        for name in REQUIRED_FIELDS {
            assert_eq!(snap.field(name), Some(0.0));
        }
    }

    #[test]
    fn test_dist_alias_when_distance_absent() {
        let snap = parse_snapshot("DIST=25", ts());
        assert_eq!(snap.distance(), 25.0);
        assert_eq!(snap.field("DIST"), Some(25.0));
    }

    #[test]
    fn test_distance_wins_when_both_present() {
        let snap = parse_snapshot("DIST=25,DISTANCE=40", ts());
        assert_eq!(snap.distance(), 40.0);
    }

    #[test]
    fn test_null_distance_falls_back_to_dist() {
        let snap = parse_snapshot("DISTANCE=,DIST=25", ts());
        assert_eq!(snap.distance(), 25.0);

        let snap = parse_snapshot("DISTANCE=null,DIST=18", ts());
        assert_eq!(snap.distance(), 18.0);
    }

    #[test]
    fn test_null_everywhere_defaults_distance() {
        let snap = parse_snapshot("DISTANCE=nan", ts());
        assert_eq!(snap.distance(), 0.0);
    }

    #[test]
    fn test_parse_record() {
        let record = RawRecord::new("GAS=700,DIST=12", ts());
        let snap = parse_record(&record);
        assert_eq!(snap.gas(), 700.0);
        assert_eq!(snap.distance(), 12.0);
        assert_eq!(snap.timestamp(), ts());
    }
}
