//! Performance Class Prediction Server
//!
//! HTTP front end for the prediction core.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   PREDICTION SERVER                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────────┐   ┌────────────┐   │
//! │  │  Router   │──▶│ PredictionService│──▶│ WorkerPool │   │
//! │  │  (Axum)   │   │   (async intake) │   │ (threads)  │   │
//! │  └─────┬─────┘   └────────┬─────────┘   └─────┬──────┘   │
//! │        │                  ▼                   ▼          │
//! │  ┌─────┴──────┐    ┌──────────────────────────────┐      │
//! │  │ Prometheus │    │ ArtifactStore (load once)    │      │
//! │  └────────────┘    └──────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod metrics;
mod models;


use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use perf_predict_core::{ArtifactStore, PredictionService};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics::PrometheusRecorder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "perf_predict_server=debug,perf_predict_core=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env();

    tracing::info!("Prediction server starting ({})...", config.environment);
    tracing::info!("Model directory: {}", config.predictor.model_dir.display());

    // Load artifacts; a failure leaves the server up but unhealthy
    let store = Arc::new(ArtifactStore::new(config.predictor.clone()));
    let loader = store.clone();
    match tokio::task::spawn_blocking(move || loader.load()).await? {
        Ok(_) => tracing::info!("API ready for predictions"),
        Err(e) => tracing::warn!("Failed to load model components: {}. /predict will answer 503", e),
    }
    if config.is_production() && !store.is_ready() {
        tracing::error!("Running in production without a model");
    }

    // Build application state
    let metrics = Arc::new(PrometheusRecorder::new()?);
    let service = Arc::new(PredictionService::new(store)?.with_observer(metrics.clone()));
    let state = AppState {
        service: service.clone(),
        metrics,
    };

    // Build router
    let app = create_router(state, config.request_timeout());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match Arc::try_unwrap(service) {
        Ok(service) => service.shutdown(),
        Err(_) => tracing::warn!("Prediction service still referenced, skipping worker join"),
    }
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub metrics: Arc<PrometheusRecorder>,
}

/// Create the main router with all routes
fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(handlers::info::root))
        .route("/health", get(handlers::health::check))
        .route("/status", get(handlers::health::status))
        .route("/predict", post(handlers::predict::predict))
        .route("/metrics", get(handlers::metrics::export))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
