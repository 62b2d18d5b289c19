//! Service Module - Concurrency and orchestration
//!
//! ## Structure
//! - `workers`: bounded worker pool for CPU-bound inference
//! - `stats`: per-outcome counters and the observer hook
//! - `predictor`: `PredictionService` and the pure pipeline

pub mod predictor;
pub mod stats;
pub mod workers;

#[cfg(test)]
mod tests;

pub use predictor::{evaluate, EngineStatus, PredictionResult, PredictionService};
pub use stats::{Outcome, PredictionObserver, ServiceStats, StatsSnapshot};
pub use workers::{PoolError, PoolStats, WorkerPool};
