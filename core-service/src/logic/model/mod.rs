//! Model Module - Scaling, Inference, Labels
//!
//! Everything between the ordered feature vector and the decoded result.
//! Swapping the classifier representation only touches `classifier`
//! implementors.

pub mod classifier;
pub mod labels;
pub mod scaler;
pub mod tree_ensemble;

#[cfg(feature = "onnx")]
pub mod onnx;

// Re-export common types
pub use classifier::{Classifier, InferenceError};
pub use labels::{ClassLabel, ClassMapping, ClassProbabilities};
pub use scaler::ScalerParams;
pub use tree_ensemble::TreeEnsembleClassifier;

#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
