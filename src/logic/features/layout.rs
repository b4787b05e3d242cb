//! Feature Layout - Centralized Feature Definition
//!
//! **CRITICAL: This file controls the feature schema**
//!
//! The classifier is order-sensitive and schema-less at the call boundary,
//! so the column order below must match the order used at training time.
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when layout changes
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in the vector
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Raw readings (0-5) ===
    "GAS",          // 0
    "FLAME",        // 1
    "LDR",          // 2
    "WATER",        // 3
    "VIBRATION",    // 4
    "DISTANCE",     // 5

    // === Rolling means over the window (6-11) ===
    "gas_roll3",    // 6
    "flame_roll3",  // 7
    "ldr_roll3",    // 8
    "water_roll3",  // 9
    "dist_roll3",   // 10
    "vib_roll3",    // 11

    // === First differences (12-14) ===
    "gas_diff1",    // 12
    "flame_diff1",  // 13
    "dist_diff1",   // 14

    // === Time of day (15-16) ===
    "hour",         // 15
    "minute",       // 16
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 17;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
/// Used to detect layout mismatches at runtime
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

/// Get layout hash
pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when a feature layout doesn't match the one this build produces
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutMismatchError {
    #[error(
        "Feature layout mismatch: expected v{expected_version} (hash: {expected_hash:08x}), \
         got v{actual_version} (hash: {actual_hash:08x})"
    )]
    Version {
        expected_version: u8,
        expected_hash: u32,
        actual_version: u8,
        actual_hash: u32,
    },

    #[error("Feature count mismatch: expected {expected}, got {actual}")]
    Count { expected: usize, actual: usize },

    #[error("Feature column {index} mismatch: expected '{expected}', got '{actual}'")]
    Column {
        index: usize,
        expected: &'static str,
        actual: String,
    },
}

/// Validate that incoming data matches current layout
pub fn validate_layout(incoming_version: u8, incoming_hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if incoming_version != FEATURE_VERSION || incoming_hash != current_hash {
        return Err(LayoutMismatchError::Version {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

/// Validate a column list (e.g. a model's training columns) against the layout.
///
/// Names are compared exactly and in order.
pub fn validate_feature_names<S: AsRef<str>>(names: &[S]) -> Result<(), LayoutMismatchError> {
    if names.len() != FEATURE_COUNT {
        return Err(LayoutMismatchError::Count {
            expected: FEATURE_COUNT,
            actual: names.len(),
        });
    }

    for (index, (&expected, actual)) in FEATURE_LAYOUT.iter().zip(names).enumerate() {
        let actual: &str = actual.as_ref();
        if expected != actual {
            return Err(LayoutMismatchError::Column {
                index,
                expected,
                actual: actual.to_string(),
            });
        }
    }

    Ok(())
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_COUNT, 17);
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_layout_hash_consistency() {
        assert_eq!(compute_layout_hash(), compute_layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_validate_layout_success() {
        assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());
    }

    #[test]
    fn test_validate_layout_version_mismatch() {
        let result = validate_layout(FEATURE_VERSION + 1, layout_hash());
        assert!(matches!(result, Err(LayoutMismatchError::Version { .. })));
    }

    #[test]
    fn test_validate_layout_hash_mismatch() {
        let result = validate_layout(FEATURE_VERSION, !layout_hash());
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_feature_names_ok() {
        let names: Vec<String> = FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect();
        assert!(validate_feature_names(&names).is_ok());
    }

    #[test]
    fn test_validate_feature_names_wrong_order() {
        let mut names: Vec<&str> = FEATURE_LAYOUT.to_vec();
        names.swap(0, 1);

        match validate_feature_names(&names) {
            Err(LayoutMismatchError::Column { index, expected, actual }) => {
                assert_eq!(index, 0);
                assert_eq!(expected, "GAS");
                assert_eq!(actual, "FLAME");
            }
            other => panic!("Expected Column mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_feature_names_wrong_length() {
        let names = &FEATURE_LAYOUT[..16];
        assert_eq!(
            validate_feature_names(names),
            Err(LayoutMismatchError::Count { expected: 17, actual: 16 })
        );
    }

    #[test]
    fn test_feature_index() {
        assert_eq!(feature_index("GAS"), Some(0));
        assert_eq!(feature_index("gas_roll3"), Some(6));
        assert_eq!(feature_index("minute"), Some(16));
        assert_eq!(feature_index("second"), None);
    }
}
