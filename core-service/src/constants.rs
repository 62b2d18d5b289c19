//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Environment overrides are read in `logic::config`.

/// Default directory holding the model artifacts
pub const DEFAULT_MODEL_DIR: &str = "./model";

/// Default classifier artifact (XGBoost JSON dump)
pub const DEFAULT_MODEL_FILE: &str = "model.json";

/// Default scaler parameters file
pub const DEFAULT_SCALER_FILE: &str = "scaler.json";

/// Default metadata document
pub const DEFAULT_METADATA_FILE: &str = "model_metadata.json";

/// Default number of inference worker threads
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default number of queued predictions waiting for a free worker
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Allowed drift of a classifier's probability sum away from 1.0
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-4;

/// Core version
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
