//! Prediction statistics and the observer hook

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::logic::error::{ErrorKind, ServiceError};

// ============================================================================
// OUTCOME
// ============================================================================

/// How a single `predict` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure(ErrorKind),
}

impl Outcome {
    pub fn of<T>(result: &Result<T, ServiceError>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) => Outcome::Failure(e.kind()),
        }
    }

    /// Stable label for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure(kind) => kind.as_str(),
        }
    }
}

/// Receives one callback per finished prediction.
///
/// Called on the request path, so implementations should only record.
pub trait PredictionObserver: Send + Sync {
    fn on_prediction(&self, outcome: Outcome, latency: Duration);
}

// ============================================================================
// COUNTERS
// ============================================================================

#[derive(Debug, Default)]
pub struct ServiceStats {
    success: AtomicU64,
    not_ready: AtomicU64,
    missing_feature: AtomicU64,
    dimension_mismatch: AtomicU64,
    unknown_encoded_index: AtomicU64,
    prediction_error: AtomicU64,
    latency_sum_us: AtomicU64,
    in_flight: AtomicUsize,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a call as started; the guard marks it finished on drop
    pub fn enter(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlight(&self.in_flight)
    }

    pub fn record(&self, outcome: Outcome, latency: Duration) {
        let counter = match outcome {
            Outcome::Success => &self.success,
            Outcome::Failure(ErrorKind::NotReady) => &self.not_ready,
            Outcome::Failure(ErrorKind::MissingFeature) => &self.missing_feature,
            Outcome::Failure(ErrorKind::DimensionMismatch) => &self.dimension_mismatch,
            Outcome::Failure(ErrorKind::UnknownEncodedIndex) => &self.unknown_encoded_index,
            Outcome::Failure(ErrorKind::Prediction) => &self.prediction_error,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let success = self.success.load(Ordering::Relaxed);
        let not_ready = self.not_ready.load(Ordering::Relaxed);
        let missing_feature = self.missing_feature.load(Ordering::Relaxed);
        let dimension_mismatch = self.dimension_mismatch.load(Ordering::Relaxed);
        let unknown_encoded_index = self.unknown_encoded_index.load(Ordering::Relaxed);
        let prediction_error = self.prediction_error.load(Ordering::Relaxed);

        let total = success
            + not_ready
            + missing_feature
            + dimension_mismatch
            + unknown_encoded_index
            + prediction_error;
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let avg_latency_ms = if total > 0 {
            (sum as f64 / total as f64) / 1000.0
        } else {
            0.0
        };

        StatsSnapshot {
            total,
            success,
            not_ready,
            missing_feature,
            dimension_mismatch,
            unknown_encoded_index,
            prediction_error,
            in_flight: self.in_flight.load(Ordering::Relaxed),
            avg_latency_ms,
        }
    }
}

pub struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub success: u64,
    pub not_ready: u64,
    pub missing_feature: u64,
    pub dimension_mismatch: u64,
    pub unknown_encoded_index: u64,
    pub prediction_error: u64,
    pub in_flight: usize,
    pub avg_latency_ms: f64,
}
