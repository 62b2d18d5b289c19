//! Error taxonomy for loading and serving
//!
//! Every failure leaving the core is one of these kinds. `LoadError` only
//! happens at startup and leaves the store not-ready; `ServiceError` is
//! per-call and never terminates the process.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// LOAD ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("artifact not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid metadata: {0}")]
    Metadata(String),

    #[error("invalid class mapping: {0}")]
    ClassMapping(String),

    #[error("invalid scaler parameters: {0}")]
    Scaler(String),

    #[error("feature count mismatch: {context} expects {expected}, found {actual}")]
    FeatureCount {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("class count mismatch: class mapping has {mapping} classes, classifier produces {classifier}")]
    ClassCount { mapping: usize, classifier: usize },

    #[error("invalid model: {0}")]
    Model(String),

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    Checksum {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("model format '{0}' is not supported by this build")]
    UnsupportedFormat(&'static str),
}

// ============================================================================
// SERVICE ERRORS
// ============================================================================

/// Stable error kind, used for metrics labels and status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotReady,
    MissingFeature,
    DimensionMismatch,
    UnknownEncodedIndex,
    Prediction,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotReady => "not_ready",
            ErrorKind::MissingFeature => "missing_feature",
            ErrorKind::DimensionMismatch => "dimension_mismatch",
            ErrorKind::UnknownEncodedIndex => "unknown_encoded_index",
            ErrorKind::Prediction => "prediction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// Called before a successful load; retry later
    #[error("model components not loaded")]
    NotReady,

    /// Metadata names a feature the record does not carry
    #[error("missing feature '{0}'")]
    MissingFeature(String),

    #[error("dimension mismatch in {stage}: expected {expected}, got {actual}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Classifier output outside the trained label space
    #[error("encoded class index {0} has no original label")]
    UnknownEncodedIndex(usize),

    #[error("{0}")]
    Prediction(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotReady => ErrorKind::NotReady,
            ServiceError::MissingFeature(_) => ErrorKind::MissingFeature,
            ServiceError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            ServiceError::UnknownEncodedIndex(_) => ErrorKind::UnknownEncodedIndex,
            ServiceError::Prediction(_) => ErrorKind::Prediction,
        }
    }

    /// Only `NotReady` clears up on its own
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::NotReady)
    }

    /// Artifacts and input schema disagree (server-side fault)
    pub fn is_config_fault(&self) -> bool {
        matches!(
            self,
            ServiceError::MissingFeature(_)
                | ServiceError::DimensionMismatch { .. }
                | ServiceError::UnknownEncodedIndex(_)
        )
    }
}
