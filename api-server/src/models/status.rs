//! Info and health payloads

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub ready: bool,
    pub endpoints: Endpoints,
    pub feature_layout: FeatureSchema,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub predict: &'static str,
    pub health: &'static str,
    pub status: &'static str,
    pub metrics: &'static str,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            predict: "/predict",
            health: "/health",
            status: "/status",
            metrics: "/metrics",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeatureSchema {
    pub feature_count: usize,
    pub layout_hash: String,
    /// Loaded metadata lists the schema names in schema order
    pub matches_model: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: String,
    pub version: &'static str,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
