//! Feature Builder
//!
//! Window of parsed snapshots (ascending by time) → one `FeatureVector` for
//! the newest snapshot: raw readings, rolling means, first differences and
//! time of day.

use chrono::Timelike;
use thiserror::Error;

use crate::logic::snapshot::SensorSnapshot;
use crate::logic::snapshot::types::{
    FIELD_DISTANCE, FIELD_FLAME, FIELD_GAS, FIELD_LDR, FIELD_VIBRATION, FIELD_WATER,
};
use super::vector::FeatureVector;

/// Rolling window length. Fixed: it is the window the classifier was trained on.
pub const ROLLING_WINDOW: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("insufficient data: feature window is empty")]
    InsufficientData,
}

/// Build the feature vector for the most recent snapshot in `window`.
///
/// Only the last `ROLLING_WINDOW` snapshots are used. Fewer samples are fine
/// (means over what exists, diffs of 0 with no predecessor); none is not.
pub fn build_features(window: &[SensorSnapshot]) -> Result<FeatureVector, FeatureError> {
    let start = window.len().saturating_sub(ROLLING_WINDOW);
    let window = &window[start..];

    let (latest, earlier) = window.split_last().ok_or(FeatureError::InsufficientData)?;
    let previous = earlier.last();

    let mut vector = FeatureVector::new();

    // Raw
    vector.set_by_name("GAS", latest.gas() as f32);
    vector.set_by_name("FLAME", latest.flame() as f32);
    vector.set_by_name("LDR", latest.ldr() as f32);
    vector.set_by_name("WATER", latest.water() as f32);
    vector.set_by_name("VIBRATION", latest.vibration() as f32);
    vector.set_by_name("DISTANCE", latest.distance() as f32);

    // Rolling means (min_periods = 1)
    vector.set_by_name("gas_roll3", rolling_mean(window, FIELD_GAS));
    vector.set_by_name("flame_roll3", rolling_mean(window, FIELD_FLAME));
    vector.set_by_name("ldr_roll3", rolling_mean(window, FIELD_LDR));
    vector.set_by_name("water_roll3", rolling_mean(window, FIELD_WATER));
    vector.set_by_name("dist_roll3", rolling_mean(window, FIELD_DISTANCE));
    vector.set_by_name("vib_roll3", rolling_mean(window, FIELD_VIBRATION));

    // First differences
    vector.set_by_name("gas_diff1", diff1(latest, previous, FIELD_GAS));
    vector.set_by_name("flame_diff1", diff1(latest, previous, FIELD_FLAME));
    vector.set_by_name("dist_diff1", diff1(latest, previous, FIELD_DISTANCE));

    // Time of day, naive clock of the reading
    let ts = latest.timestamp();
    vector.set_by_name("hour", ts.hour() as f32);
    vector.set_by_name("minute", ts.minute() as f32);

    Ok(vector)
}

fn rolling_mean(window: &[SensorSnapshot], field: &str) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let sum: f64 = window.iter().map(|s| s.get(field)).sum();
    (sum / window.len() as f64) as f32
}

fn diff1(latest: &SensorSnapshot, previous: Option<&SensorSnapshot>, field: &str) -> f32 {
    match previous {
        Some(prev) => (latest.get(field) - prev.get(field)) as f32,
        None => 0.0,
    }
}
