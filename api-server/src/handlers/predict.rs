//! Prediction handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use perf_predict_core::PredictionResult;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::PredictionRequest;
use crate::AppState;

/// Validate the body against the schema, then run it through the service
#[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictionRequest>, JsonRejection>,
) -> AppResult<Json<PredictionResult>> {
    let Json(request) = body?;
    let record = request.into_record()?;

    let result = state.service.predict(record).await?;

    tracing::debug!(
        predicted_class = %result.predicted_class,
        confidence = result.confidence,
        "prediction served"
    );
    Ok(Json(result))
}
