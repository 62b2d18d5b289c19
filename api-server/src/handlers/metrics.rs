//! Prometheus scrape endpoint

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use prometheus::TEXT_FORMAT;

use crate::error::AppResult;
use crate::AppState;

pub async fn export(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let body = state.metrics.render(&state.service)?;
    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body))
}
