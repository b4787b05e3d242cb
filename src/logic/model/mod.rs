//! Model Module - Risk Classifiers
//!
//! Inference is kept apart from feature extraction so the model can be
//! swapped (ONNX export, labeling rules, test doubles) without touching the
//! engine.

pub mod classifier;
pub mod inference;
pub mod rules;
pub mod guard;

// Re-export common types
pub use classifier::{classify_checked, validate_schema, Classifier, ClassifierError};
pub use inference::{InferenceStats, ModelInfo, ModelMetadata, OnnxClassifier};
pub use rules::RuleClassifier;

use std::path::Path;
use std::sync::Arc;

/// ONNX if a model is configured and loads, rules otherwise.
///
/// A checksum mismatch is returned as an error instead of falling back:
/// a tampered model must stop the process.
pub fn load_classifier(
    model_path: Option<&Path>,
    expected_sha256: Option<&str>,
) -> Result<Arc<dyn Classifier>, ClassifierError> {
    let Some(path) = model_path else {
        log::warn!("No model configured, using rule classifier");
        return Ok(Arc::new(RuleClassifier::new()));
    };

    match OnnxClassifier::load(path, expected_sha256) {
        Ok(model) => Ok(Arc::new(model)),
        Err(e @ ClassifierError::Integrity { .. }) => Err(e),
        Err(e) => {
            log::warn!("ONNX model unavailable ({}), using rule classifier", e);
            Ok(Arc::new(RuleClassifier::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_model_uses_rules() {
        let classifier = load_classifier(None, None).unwrap();
        assert_eq!(classifier.name(), "rules");
    }

    #[test]
    fn test_missing_model_falls_back() {
        let classifier = load_classifier(Some(Path::new("/nonexistent/risk_model.onnx")), None).unwrap();
        assert_eq!(classifier.name(), "rules");
    }
}
