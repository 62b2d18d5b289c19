//! Prediction Service - record in, decoded class out
//!
//! Readiness is checked on the calling task; everything CPU-bound runs on
//! the worker pool against an `Arc` of the published bundle.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use super::stats::{Outcome, PredictionObserver, ServiceStats, StatsSnapshot};
use super::workers::{PoolError, PoolStats, WorkerPool};
use crate::logic::artifacts::{ArtifactBundle, ArtifactStore, BundleInfo};
use crate::logic::error::ServiceError;
use crate::logic::features::{FeatureRecord, FeatureVector};
use crate::logic::model::classifier::{argmax, check_probabilities, normalize};
use crate::logic::model::scaler;
use crate::logic::model::{ClassLabel, ClassProbabilities};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Original label of the most probable class
    pub predicted_class: ClassLabel,
    /// Probability per original label, in label order
    pub prediction_probabilities: ClassProbabilities,
    /// Probability of `predicted_class`
    pub confidence: f64,
}

/// Service snapshot for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub ready: bool,
    pub model: Option<BundleInfo>,
    pub last_error: Option<String>,
    pub stats: StatsSnapshot,
    pub pool: PoolStats,
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct PredictionService {
    store: Arc<ArtifactStore>,
    pool: WorkerPool,
    stats: ServiceStats,
    observer: Option<Arc<dyn PredictionObserver>>,
}

impl PredictionService {
    /// Start the worker pool sized by the store's configuration
    pub fn new(store: Arc<ArtifactStore>) -> Result<Self, PoolError> {
        let pool = WorkerPool::new(store.config().worker_count, store.config().queue_depth)?;
        Ok(Self {
            store,
            pool,
            stats: ServiceStats::new(),
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn PredictionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    pub async fn predict(&self, record: FeatureRecord) -> Result<PredictionResult, ServiceError> {
        let _in_flight = self.stats.enter();
        let start = Instant::now();

        let result = self.dispatch(record).await;

        let latency = start.elapsed();
        let outcome = Outcome::of(&result);
        self.stats.record(outcome, latency);
        if let Some(observer) = &self.observer {
            observer.on_prediction(outcome, latency);
        }

        if let Err(e) = &result {
            if !e.is_retryable() {
                log::warn!("Prediction failed ({}): {}", e.kind().as_str(), e);
            }
        }
        result
    }

    async fn dispatch(&self, record: FeatureRecord) -> Result<PredictionResult, ServiceError> {
        let bundle = self.store.get().ok_or(ServiceError::NotReady)?;
        self.pool.run(move || evaluate(&bundle, &record)).await?
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            ready: self.store.is_ready(),
            model: self.store.get().map(|b| b.info()),
            last_error: self.store.last_error(),
            stats: self.stats.snapshot(),
            pool: self.pool.stats(),
        }
    }

    /// Finish queued work and join the workers
    pub fn shutdown(self) {
        self.pool.shutdown();
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Build, scale, classify and decode one record against `bundle`
pub fn evaluate(bundle: &ArtifactBundle, record: &FeatureRecord) -> Result<PredictionResult, ServiceError> {
    let vector = FeatureVector::build(record, bundle.feature_names())?;
    if log::log_enabled!(log::Level::Trace) {
        log::trace!("Feature vector: {}", vector.to_log_entry(bundle.feature_names()));
    }
    let scaled = scaler::transform(vector.as_slice(), bundle.scaler())?;

    let mut proba = bundle.classifier().predict_proba(&scaled)?;
    let mapping = bundle.class_mapping();
    check_probabilities(&proba, mapping.len())?;
    normalize(&mut proba);

    let (index, confidence) = argmax(&proba)
        .ok_or_else(|| ServiceError::Prediction("classifier returned no probabilities".to_string()))?;
    let predicted_class = mapping.decode(index)?.clone();
    let prediction_probabilities = mapping.decode_all(&proba)?;

    log::debug!(
        "Predicted {} (index {}, confidence {:.4})",
        predicted_class,
        index,
        confidence
    );

    Ok(PredictionResult {
        predicted_class,
        prediction_probabilities,
        confidence,
    })
}
