//! `/predict` request body

use perf_predict_core::logic::features::layout::missing_features;
use perf_predict_core::{FeatureRecord, FEATURE_LAYOUT};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;

/// Any JSON object; schema checks happen in `into_record`
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct PredictionRequest(pub Map<String, Value>);

impl PredictionRequest {
    /// Require every schema feature as a number, keep all numeric fields
    pub fn into_record(self) -> Result<FeatureRecord, AppError> {
        let missing = missing_features(|name| self.0.contains_key(name));
        if !missing.is_empty() {
            return Err(AppError::MissingFeatures(
                missing.into_iter().map(str::to_string).collect(),
            ));
        }

        let non_numeric: Vec<String> = FEATURE_LAYOUT
            .iter()
            .filter(|name| !self.0.get(**name).map_or(false, Value::is_number))
            .map(|name| name.to_string())
            .collect();
        if !non_numeric.is_empty() {
            return Err(AppError::NonNumeric(non_numeric));
        }

        Ok(self
            .0
            .into_iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name, v)))
            .collect())
    }
}
