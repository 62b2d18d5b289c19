//! Prometheus exposition
//!
//! The core reports through `PredictionObserver`; this recorder turns those
//! callbacks into counters and a latency histogram, and refreshes the
//! readiness and pool gauges on each scrape.

use std::time::Duration;

use perf_predict_core::{Outcome, PredictionObserver, PredictionService};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

pub struct PrometheusRecorder {
    registry: Registry,
    predictions: IntCounterVec,
    latency: Histogram,
    ready: IntGauge,
    pool_queued: IntGauge,
    pool_busy: IntGauge,
    pool_workers: IntGauge,
}

impl PrometheusRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let predictions = IntCounterVec::new(
            Opts::new("predictions_total", "Predictions served, by outcome"),
            &["outcome"],
        )?;
        let latency = Histogram::with_opts(
            HistogramOpts::new(
                "prediction_latency_seconds",
                "End-to-end prediction latency including queue wait",
            )
            .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )?;
        let ready = IntGauge::new("model_ready", "1 when model artifacts are loaded")?;
        let pool_queued = IntGauge::new("worker_pool_queued", "Predictions waiting for a worker")?;
        let pool_busy = IntGauge::new("worker_pool_busy", "Workers currently running a prediction")?;
        let pool_workers = IntGauge::new("worker_pool_size", "Inference worker threads")?;

        registry.register(Box::new(predictions.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        registry.register(Box::new(ready.clone()))?;
        registry.register(Box::new(pool_queued.clone()))?;
        registry.register(Box::new(pool_busy.clone()))?;
        registry.register(Box::new(pool_workers.clone()))?;

        Ok(Self {
            registry,
            predictions,
            latency,
            ready,
            pool_queued,
            pool_busy,
            pool_workers,
        })
    }

    /// Refresh gauges from `service` and encode everything as text
    pub fn render(&self, service: &PredictionService) -> Result<String, prometheus::Error> {
        let pool = service.pool_stats();
        self.ready.set(i64::from(service.is_ready()));
        self.pool_queued.set(pool.queued as i64);
        self.pool_busy.set(pool.busy as i64);
        self.pool_workers.set(pool.workers as i64);

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl PredictionObserver for PrometheusRecorder {
    fn on_prediction(&self, outcome: Outcome, latency: Duration) {
        self.predictions.with_label_values(&[outcome.as_str()]).inc();
        self.latency.observe(latency.as_secs_f64());
    }
}
