//! Classifier Port
//!
//! `FeatureVector -> ClassLabel`. Implementations are swappable (ONNX model,
//! labeling rules, scripted test doubles); the engine only sees this trait.

use thiserror::Error;

use crate::logic::alarm::ClassLabel;
use crate::logic::features::{FeatureVector, LayoutMismatchError};
use super::inference::{InferenceStats, ModelInfo};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("failed to load model: {0}")]
    Load(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("classifier returned out-of-range class id {0}")]
    OutOfRange(i64),

    #[error("feature schema mismatch: {0}")]
    Schema(#[from] LayoutMismatchError),

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    #[error("invalid model metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Trait for risk classifiers (ONNX, rules, ...)
pub trait Classifier: Send + Sync {
    /// Predict the risk class of one vector.
    ///
    /// May return `ClassLabel::Unknown` if the backend produced an id outside
    /// the closed set; `classify_checked` turns that into an error.
    fn classify(&self, vector: &FeatureVector) -> Result<ClassLabel, ClassifierError>;

    /// Column names the classifier expects, in order
    fn feature_names(&self) -> Vec<String>;

    /// Short engine name for status/logging
    fn name(&self) -> &str;

    /// Loaded model file, for classifiers backed by one
    fn model_info(&self) -> Option<ModelInfo> {
        None
    }

    /// Call count and mean latency, for classifiers that measure them
    fn inference_stats(&self) -> Option<InferenceStats> {
        None
    }
}

/// Classify with the boundary checks the tick loop relies on:
/// vector layout first, then the closed class set.
pub fn classify_checked(
    classifier: &dyn Classifier,
    vector: &FeatureVector,
) -> Result<ClassLabel, ClassifierError> {
    vector.validate()?;

    match classifier.classify(vector)? {
        ClassLabel::Unknown(id) => Err(ClassifierError::OutOfRange(id)),
        label => Ok(label),
    }
}

/// Startup check: the classifier's expected columns must be ours, in order.
pub fn validate_schema(classifier: &dyn Classifier) -> Result<(), ClassifierError> {
    let names = classifier.feature_names();
    crate::logic::features::layout::validate_feature_names(&names)?;
    log::info!(
        "Classifier '{}' schema matches feature layout ({} columns)",
        classifier.name(),
        names.len()
    );
    Ok(())
}
