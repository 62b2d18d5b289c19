//! Standard Scaler
//!
//! Per-feature `(x - center) / scale`, parameters exported from training.

use serde::{Deserialize, Serialize};

use crate::logic::error::{LoadError, ServiceError};

/// Scaling parameters, one pair per feature in metadata order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    #[serde(alias = "mean", alias = "mean_")]
    pub center: Vec<f64>,
    #[serde(alias = "scale_")]
    pub scale: Vec<f64>,
}

impl ScalerParams {
    pub fn new(center: Vec<f64>, scale: Vec<f64>) -> Result<Self, LoadError> {
        let params = Self { center, scale };
        params.validate()?;
        Ok(params)
    }

    /// Identity transform for `n` features
    pub fn identity(n: usize) -> Self {
        Self {
            center: vec![0.0; n],
            scale: vec![1.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.center.len()
    }

    pub fn is_empty(&self) -> bool {
        self.center.is_empty()
    }

    /// Equal lengths, finite centers, finite non-zero scales
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.center.len() != self.scale.len() {
            return Err(LoadError::Scaler(format!(
                "center has {} values, scale has {}",
                self.center.len(),
                self.scale.len()
            )));
        }
        if let Some(i) = self.center.iter().position(|c| !c.is_finite()) {
            return Err(LoadError::Scaler(format!("center[{}] is not finite", i)));
        }
        if let Some(i) = self.scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
            return Err(LoadError::Scaler(format!(
                "scale[{}] = {} (must be finite and non-zero)",
                i, self.scale[i]
            )));
        }
        Ok(())
    }
}

/// Apply the scaler to a vector in metadata order
pub fn transform(vector: &[f64], params: &ScalerParams) -> Result<Vec<f64>, ServiceError> {
    if vector.len() != params.center.len() || vector.len() != params.scale.len() {
        return Err(ServiceError::DimensionMismatch {
            stage: "scaler",
            expected: params.center.len(),
            actual: vector.len(),
        });
    }

    Ok(vector
        .iter()
        .zip(params.center.iter().zip(params.scale.iter()))
        .map(|(x, (center, scale))| (x - center) / scale)
        .collect())
}
