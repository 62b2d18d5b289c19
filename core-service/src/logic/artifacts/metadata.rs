//! Model metadata document
//!
//! ```json
//! {
//!   "feature_names": ["feat1", "feat2", ...],
//!   "class_mapping": "{\"1\": 0, \"2\": 1, ...}"
//! }
//! ```
//!
//! `class_mapping` is written by the training notebook as an encoded JSON
//! string; a plain object is accepted as well.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::read_json;
use crate::logic::error::LoadError;
use crate::logic::model::ClassMapping;

#[derive(Debug, Deserialize)]
struct RawMetadata {
    feature_names: Vec<String>,
    class_mapping: RawClassMapping,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawClassMapping {
    Encoded(String),
    Table(Map<String, Value>),
}

impl RawClassMapping {
    fn decode(self) -> Result<ClassMapping, LoadError> {
        let table = match self {
            RawClassMapping::Table(table) => table,
            RawClassMapping::Encoded(text) => serde_json::from_str::<Map<String, Value>>(&text)
                .map_err(|e| {
                    LoadError::ClassMapping(format!("embedded document is not a JSON object: {}", e))
                })?,
        };

        let pairs = table
            .into_iter()
            .map(|(label, value)| encoded_index(&value).map(|i| (label.clone(), i)).ok_or_else(|| {
                LoadError::ClassMapping(format!(
                    "label '{}' maps to {}, expected an integer index",
                    label, value
                ))
            }))
            .collect::<Result<Vec<_>, _>>()?;

        ClassMapping::from_pairs(pairs)
    }
}

fn encoded_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Validated metadata: canonical feature order and label table
#[derive(Debug, Clone)]
pub struct Metadata {
    pub feature_names: Vec<String>,
    pub class_mapping: ClassMapping,
}

impl Metadata {
    pub fn new(feature_names: Vec<String>, class_mapping: ClassMapping) -> Result<Self, LoadError> {
        if feature_names.is_empty() {
            return Err(LoadError::Metadata("feature_names is empty".to_string()));
        }
        let mut seen = HashSet::with_capacity(feature_names.len());
        for name in &feature_names {
            if name.trim().is_empty() {
                return Err(LoadError::Metadata("feature_names contains an empty name".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(LoadError::Metadata(format!("duplicate feature name '{}'", name)));
            }
        }

        Ok(Self { feature_names, class_mapping })
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let raw: RawMetadata = read_json(path)?;
        Self::from_raw(raw)
    }

    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let raw: RawMetadata = serde_json::from_str(json).map_err(|source| LoadError::Parse {
            path: "<memory>".into(),
            source,
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawMetadata) -> Result<Self, LoadError> {
        let class_mapping = raw.class_mapping.decode()?;
        Self::new(raw.feature_names, class_mapping)
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn n_classes(&self) -> usize {
        self.class_mapping.len()
    }
}
