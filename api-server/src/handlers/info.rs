//! Root endpoint

use axum::{extract::State, Json};
use perf_predict_core::logic::features::layout::{layout_hash, FEATURE_COUNT};

use crate::models::{Endpoints, FeatureSchema, ServiceInfo};
use crate::AppState;

pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    let bundle = state.service.store().get();

    Json(ServiceInfo {
        message: "Performance Class Prediction API",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        ready: bundle.is_some(),
        endpoints: Endpoints::default(),
        feature_layout: FeatureSchema {
            feature_count: FEATURE_COUNT,
            layout_hash: format!("{:08x}", layout_hash()),
            matches_model: bundle.map(|b| b.layout().matches_schema()),
        },
    })
}
