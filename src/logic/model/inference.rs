//! Inference Engine - ONNX Runtime Integration
//!
//! Loads the exported risk classifier (`.onnx`) plus its JSON sidecar
//! (`<model>.json`, carrying the training column order) and runs one
//! `[1, FEATURE_COUNT]` vector per call.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::logic::alarm::ClassLabel;
use crate::logic::features::{FeatureVector, FEATURE_COUNT};
use super::classifier::{Classifier, ClassifierError};
use super::guard::verify_model_checksum;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Sidecar written next to the model at export time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Training columns, in order
    pub features: Vec<String>,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub trained_at: Option<String>,
}

/// Loaded model info for status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_path: String,
    pub sha256: Option<String>,
    pub model_type: String,
    pub features: usize,
    pub trained_at: Option<String>,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

/// Latency stats
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceStats {
    pub inference_count: u64,
    pub avg_latency_ms: f32,
}

impl InferenceStats {
    pub fn from_totals(count: u64, latency_sum_us: u64) -> Self {
        let avg = if count > 0 { (latency_sum_us as f32 / count as f32) / 1000.0 } else { 0.0 };
        Self {
            inference_count: count,
            avg_latency_ms: avg,
        }
    }
}

/// Sidecar path for a model file: `model.onnx` -> `model.json`
pub fn metadata_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("json")
}

/// Read and parse the sidecar of `model_path`
pub fn load_metadata(model_path: &Path) -> Result<ModelMetadata, ClassifierError> {
    let path = metadata_path(model_path);
    let raw = std::fs::read_to_string(&path).map_err(|e| {
        ClassifierError::Load(format!("metadata sidecar {:?} unreadable: {}", path, e))
    })?;
    let metadata: ModelMetadata = serde_json::from_str(&raw)?;
    Ok(metadata)
}

// ============================================================================
// ONNX CLASSIFIER
// ============================================================================

pub struct OnnxClassifier {
    session: Mutex<Session>,
    output_names: Vec<String>,
    metadata: ModelMetadata,
    info: ModelInfo,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl OnnxClassifier {
    /// Load a model, verifying its checksum first when one is given
    pub fn load(model_path: &Path, expected_sha256: Option<&str>) -> Result<Self, ClassifierError> {
        log::info!("Loading ONNX model from: {:?}", model_path);

        if !model_path.exists() {
            return Err(ClassifierError::Load(format!("Model not found: {:?}", model_path)));
        }

        let sha256 = match expected_sha256 {
            Some(expected) => Some(verify_model_checksum(model_path, expected)?),
            None => {
                log::warn!("No model checksum configured, skipping integrity check");
                None
            }
        };

        let metadata = load_metadata(model_path)?;

        let session = Session::builder()
            .map_err(|e| ClassifierError::Load(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ClassifierError::Load(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ClassifierError::Load(format!("Failed to load model: {}", e)))?;

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        if output_names.is_empty() {
            return Err(ClassifierError::Load("No output defined".to_string()));
        }

        log::info!(
            "ONNX model loaded ({} features, outputs: {:?})",
            metadata.features.len(),
            output_names
        );

        let info = ModelInfo {
            model_path: model_path.display().to_string(),
            sha256,
            model_type: metadata.model_type.clone().unwrap_or_else(|| "unknown".to_string()),
            features: metadata.features.len(),
            trained_at: metadata.trained_at.clone(),
            loaded_at: chrono::Utc::now(),
        };

        Ok(Self {
            session: Mutex::new(session),
            output_names,
            metadata,
            info,
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        })
    }

    /// Raw class id for one vector.
    ///
    /// Prefers an integer label output; a model exposing only scores is
    /// read as argmax over the first float output.
    fn predict_id(&self, values: &[f32; FEATURE_COUNT]) -> Result<i64, ClassifierError> {
        let input = Array2::<f32>::from_shape_vec((1, FEATURE_COUNT), values.to_vec())
            .map_err(|e| ClassifierError::Inference(format!("Array error: {}", e)))?;
        let tensor = Tensor::from_array(input)
            .map_err(|e| ClassifierError::Inference(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| ClassifierError::Inference(format!("Inference failed: {}", e)))?;

        for name in &self.output_names {
            let Some(output) = outputs.get(name.as_str()) else {
                continue;
            };
            if let Ok((_, labels)) = output.try_extract_tensor::<i64>() {
                if let Some(&id) = labels.first() {
                    return Ok(id);
                }
            }
            if let Ok((_, scores)) = output.try_extract_tensor::<f32>() {
                if let Some(id) = argmax(scores) {
                    return Ok(id as i64);
                }
            }
        }

        Err(ClassifierError::Inference(
            "model produced no label or score output".to_string(),
        ))
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, vector: &FeatureVector) -> Result<ClassLabel, ClassifierError> {
        let start = std::time::Instant::now();
        let id = self.predict_id(vector.as_array())?;

        self.latency_sum_us
            .fetch_add(start.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        Ok(ClassLabel::from_id(id))
    }

    fn feature_names(&self) -> Vec<String> {
        self.metadata.features.clone()
    }

    fn name(&self) -> &str {
        "onnx"
    }

    fn model_info(&self) -> Option<ModelInfo> {
        Some(self.info.clone())
    }

    fn inference_stats(&self) -> Option<InferenceStats> {
        Some(InferenceStats::from_totals(
            self.inference_count.load(Ordering::Relaxed),
            self.latency_sum_us.load(Ordering::Relaxed),
        ))
    }
}

/// Index of the largest finite score
fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .fold(None, |best: Option<(usize, f32)>, (i, &s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}
