//! Feature Vector - Core data structure for model input
//!
//! A `FeatureRecord` is the named input; a `FeatureVector` is the same
//! values laid out in the artifact's canonical order. Position is decided
//! solely by the ordered feature names, never by record insertion order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::layout::compute_layout_hash;
use crate::logic::error::ServiceError;

// ============================================================================
// FEATURE RECORD
// ============================================================================

/// Named feature values for one prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord {
    values: HashMap<String, f64>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { values: HashMap::with_capacity(capacity) }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<HashMap<String, f64>> for FeatureRecord {
    fn from(values: HashMap<String, f64>) -> Self {
        Self { values }
    }
}

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// Feature values in canonical order, tagged with the layout they follow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// CRC32 hash of the ordered names the vector was built against
    pub layout_hash: u32,
    /// Feature values in layout order
    pub values: Vec<f64>,
}

impl FeatureVector {
    /// Assemble `record` in the order given by `feature_names`.
    ///
    /// Fails on the first name the record does not carry; no partial
    /// vector is returned.
    pub fn build<S: AsRef<str>>(
        record: &FeatureRecord,
        feature_names: &[S],
    ) -> Result<Self, ServiceError> {
        let values = feature_names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                record
                    .get(name)
                    .ok_or_else(|| ServiceError::MissingFeature(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            layout_hash: compute_layout_hash(feature_names),
            values,
        })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// JSON form for debug logging
    pub fn to_log_entry<S: AsRef<str>>(&self, feature_names: &[S]) -> serde_json::Value {
        serde_json::json!({
            "layout_hash": format!("{:08x}", self.layout_hash),
            "values": self.values,
            "named_values": feature_names.iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.as_ref().to_string(), *value))
                .collect::<HashMap<_, _>>(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
