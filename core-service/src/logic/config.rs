//! Predictor configuration
//!
//! Defaults live in `crate::constants`; every value can be overridden from
//! the environment (see `PredictorConfig::from_env`).

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_METADATA_FILE, DEFAULT_MODEL_DIR, DEFAULT_MODEL_FILE, DEFAULT_QUEUE_DEPTH,
    DEFAULT_SCALER_FILE, DEFAULT_WORKER_COUNT,
};
use crate::logic::features::FEATURE_COUNT;

/// On-disk representation of the classifier artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// XGBoost JSON model dump, evaluated natively
    TreeEnsemble,
    /// ONNX graph run through ONNX Runtime (feature `onnx`)
    Onnx,
}

impl ModelFormat {
    /// Guess the format from the model file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("onnx") => ModelFormat::Onnx,
            _ => ModelFormat::TreeEnsemble,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tree_ensemble" | "xgboost" | "json" => Some(ModelFormat::TreeEnsemble),
            "onnx" => Some(ModelFormat::Onnx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::TreeEnsemble => "tree_ensemble",
            ModelFormat::Onnx => "onnx",
        }
    }
}

/// Predictor configuration
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Directory holding all three artifacts
    pub model_dir: PathBuf,

    /// Classifier file name inside `model_dir`
    pub model_file: String,

    /// Scaler parameters file name inside `model_dir`
    pub scaler_file: String,

    /// Metadata file name inside `model_dir`
    pub metadata_file: String,

    /// Classifier representation
    pub model_format: ModelFormat,

    /// Expected SHA-256 of the classifier file (hex), checked at load
    pub model_sha256: Option<String>,

    /// Required length of `feature_names` (None = any)
    pub expected_features: Option<usize>,

    /// Inference worker threads
    pub worker_count: usize,

    /// Predictions allowed to wait for a free worker
    pub queue_depth: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self::with_model_dir(DEFAULT_MODEL_DIR)
    }
}

impl PredictorConfig {
    /// Default file names and pool sizes rooted at `model_dir`
    pub fn with_model_dir(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            scaler_file: DEFAULT_SCALER_FILE.to_string(),
            metadata_file: DEFAULT_METADATA_FILE.to_string(),
            model_format: ModelFormat::TreeEnsemble,
            model_sha256: None,
            expected_features: Some(FEATURE_COUNT),
            worker_count: DEFAULT_WORKER_COUNT,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let model_dir = env::var("PREDICTOR_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_dir);

        let model_file = env::var("PREDICTOR_MODEL_FILE").unwrap_or(defaults.model_file);

        let model_format = env::var("PREDICTOR_MODEL_FORMAT")
            .ok()
            .and_then(|f| ModelFormat::parse(&f))
            .unwrap_or_else(|| ModelFormat::from_path(Path::new(&model_file)));

        Self {
            model_dir,
            model_file,
            scaler_file: env::var("PREDICTOR_SCALER_FILE").unwrap_or(defaults.scaler_file),
            metadata_file: env::var("PREDICTOR_METADATA_FILE").unwrap_or(defaults.metadata_file),
            model_format,
            model_sha256: env::var("PREDICTOR_MODEL_SHA256")
                .ok()
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty()),
            // 0 disables the check
            expected_features: match env::var("PREDICTOR_EXPECTED_FEATURES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
            {
                Some(0) => None,
                Some(n) => Some(n),
                None => defaults.expected_features,
            },
            worker_count: env::var("PREDICTOR_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.worker_count)
                .max(1),
            queue_depth: env::var("PREDICTOR_QUEUE_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.queue_depth)
                .max(1),
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.model_dir.join(&self.scaler_file)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.model_dir.join(&self.metadata_file)
    }
}
