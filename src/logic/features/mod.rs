//! Features Module - Feature Extraction Engine
//!
//! Turns a window of sensor snapshots into the fixed-order vector the
//! classifier expects. The schema lives in `layout`, nowhere else.

pub mod layout;
pub mod vector;
pub mod builder;


// Re-export common types
pub use layout::{FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION, LayoutInfo, LayoutMismatchError};
pub use vector::FeatureVector;
pub use builder::{build_features, FeatureError, ROLLING_WINDOW};
