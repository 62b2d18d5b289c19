//! Classifier - probability vector over encoded class indices
//!
//! The trained model is opaque to the pipeline; anything that can turn a
//! scaled vector into `K` probabilities through `&self` qualifies.

use std::fmt;

use thiserror::Error;

use crate::constants::PROBABILITY_SUM_TOLERANCE;
use crate::logic::error::ServiceError;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
#[error("inference failed: {0}")]
pub struct InferenceError(pub String);

impl From<InferenceError> for ServiceError {
    fn from(err: InferenceError) -> Self {
        ServiceError::Prediction(err.to_string())
    }
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Trait for classifier artifacts (tree ensemble, ONNX, ...)
///
/// Evaluation must be read-only: one instance is shared by every worker.
pub trait Classifier: Send + Sync + fmt::Debug {
    /// One probability per encoded index `0..n_classes()`
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;

    /// Number of classes produced
    fn n_classes(&self) -> usize;

    /// Input width, when the artifact declares it
    fn n_features(&self) -> Option<usize>;

    /// Short name for status output ("tree_ensemble", "onnx", ...)
    fn kind(&self) -> &'static str;
}

// ============================================================================
// OUTPUT HELPERS
// ============================================================================

/// Check a probability vector before it leaves the pipeline
pub fn check_probabilities(proba: &[f64], n_classes: usize) -> Result<(), ServiceError> {
    if proba.len() != n_classes {
        return Err(ServiceError::DimensionMismatch {
            stage: "classifier output",
            expected: n_classes,
            actual: proba.len(),
        });
    }
    if let Some(i) = proba.iter().position(|p| !p.is_finite() || *p < 0.0) {
        return Err(ServiceError::Prediction(format!(
            "classifier returned invalid probability {} for class index {}",
            proba[i], i
        )));
    }
    let sum: f64 = proba.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(ServiceError::Prediction(format!(
            "classifier probabilities sum to {} instead of 1",
            sum
        )));
    }
    Ok(())
}

/// Index and value of the maximum; first index wins on ties
pub fn argmax(proba: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &p) in proba.iter().enumerate() {
        if best.map_or(true, |(_, b)| p > b) {
            best = Some((i, p));
        }
    }
    best
}

/// Numerically stable softmax
pub fn softmax(margins: &[f64]) -> Vec<f64> {
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// Rescale a checked probability vector so it sums to 1.
///
/// Sums already within float rounding of 1 are left untouched.
pub fn normalize(proba: &mut [f64]) {
    let sum: f64 = proba.iter().sum();
    if sum > 0.0 && (sum - 1.0).abs() > 1e-12 {
        proba.iter_mut().for_each(|p| *p /= sum);
    }
}
