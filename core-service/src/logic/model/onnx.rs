//! ONNX Classifier - ONNX Runtime Integration
//!
//! Runs a classifier exported to ONNX (e.g. onnxmltools with
//! `zipmap=False`). Input is a `[1, n_features]` f32 tensor; the output
//! read is the tensor named `probabilities`, or the last output.

use std::path::Path;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::classifier::{Classifier, InferenceError};
use crate::logic::error::LoadError;

/// Preferred probability output name
const PROBABILITY_OUTPUT: &str = "probabilities";

/// ONNX Runtime backed classifier.
///
/// `Session::run` needs exclusive access, so runs are serialised through
/// a mutex. The graph itself is never modified after load.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    output_name: String,
    n_features: usize,
    n_classes: usize,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("output_name", &self.output_name)
            .field("n_features", &self.n_features)
            .field("n_classes", &self.n_classes)
            .finish()
    }
}

impl OnnxClassifier {
    /// Load ONNX model from file
    pub fn load(path: &Path, n_features: usize, n_classes: usize) -> Result<Self, LoadError> {
        log::info!("Loading ONNX model from: {}", path.display());

        if !path.exists() {
            return Err(LoadError::Missing(path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| LoadError::Model(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| LoadError::Model(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| LoadError::Model(format!("Failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name == PROBABILITY_OUTPUT)
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| LoadError::Model("No output defined".to_string()))?;

        log::info!("ONNX model loaded successfully (output: {})", output_name);

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            n_features,
            n_classes,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if features.len() != self.n_features {
            return Err(InferenceError(format!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let input: Vec<f32> = features.iter().map(|&x| x as f32).collect();
        let input_array = Array2::<f32>::from_shape_vec((1, self.n_features), input)
            .map_err(|e| InferenceError(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError("No output".to_string()))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

        if data.len() < self.n_classes {
            return Err(InferenceError(format!(
                "output has {} values for {} classes",
                data.len(),
                self.n_classes
            )));
        }

        Ok(data[..self.n_classes].iter().map(|&p| p as f64).collect())
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}
