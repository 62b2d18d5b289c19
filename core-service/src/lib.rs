//! Performance Class Predictor - Core
//!
//! Loads a trained classifier, its scaler and metadata once, then serves
//! predictions for 36-feature records off a bounded worker pool.
//!
//! ## Layout
//! - `logic/features/` - Input schema and canonical feature vectors
//! - `logic/model/` - Scaler, classifier implementations, label mapping
//! - `logic/artifacts/` - Artifact loading and the published bundle
//! - `logic/service/` - Prediction orchestration, worker pool, stats

pub mod constants;
pub mod logic;

pub use logic::artifacts::{ArtifactBundle, ArtifactStore, BundleInfo, Metadata};
pub use logic::config::{ModelFormat, PredictorConfig};
pub use logic::error::{ErrorKind, LoadError, ServiceError};
pub use logic::features::{FeatureRecord, FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT};
pub use logic::model::{ClassLabel, ClassMapping, ClassProbabilities, Classifier, ScalerParams};
pub use logic::service::{
    EngineStatus, Outcome, PoolError, PoolStats, PredictionObserver, PredictionResult,
    PredictionService, StatsSnapshot,
};
