//! Health and status handlers

use axum::{extract::State, Json};
use perf_predict_core::EngineStatus;

use crate::models::HealthResponse;
use crate::AppState;

/// Always 200; the body says whether predictions can be served
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.service.store();

    let (status, message, last_error) = if store.is_ready() {
        ("healthy", "All components loaded successfully".to_string(), None)
    } else {
        (
            "unhealthy",
            "Model components not loaded".to_string(),
            store.last_error(),
        )
    };

    Json(HealthResponse {
        status,
        message,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        last_error,
    })
}

pub async fn status(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.service.status())
}
