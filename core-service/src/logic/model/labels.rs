//! Label Mapping - encoded class index <-> original class label
//!
//! The table is built once at load time and validated eagerly: every
//! encoded index in `0..K` has exactly one original label. Nothing is
//! looked up dynamically per request beyond a vector index.

use std::collections::HashMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::logic::error::{LoadError, ServiceError};

// ============================================================================
// CLASS LABEL
// ============================================================================

/// Original (domain) class label.
///
/// Kept as text; serialised as a JSON integer when it is one, so `"3"`
/// goes out as `3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassLabel(String);

impl ClassLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_integer(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ClassLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_integer() {
            Some(n) => serializer.serialize_i64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for ClassLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => ClassLabel(n.to_string()),
            Raw::Text(s) => ClassLabel(s),
        })
    }
}

// ============================================================================
// CLASS MAPPING
// ============================================================================

/// Bijection between original labels and encoded indices `0..K`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMapping {
    /// encoded index -> label
    by_index: Vec<ClassLabel>,
    by_label: HashMap<String, usize>,
    /// encoded indices in stable label order
    display_order: Vec<usize>,
}

impl ClassMapping {
    /// Build from (original label, encoded index) pairs.
    ///
    /// Rejects empty tables, negative or out-of-range indices, and
    /// duplicate labels or indices.
    pub fn from_pairs<I, L>(pairs: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (L, i64)>,
        L: Into<String>,
    {
        let pairs: Vec<(String, i64)> = pairs.into_iter().map(|(l, i)| (l.into(), i)).collect();
        let k = pairs.len();

        if k == 0 {
            return Err(LoadError::ClassMapping("mapping is empty".to_string()));
        }

        let mut slots: Vec<Option<ClassLabel>> = vec![None; k];
        let mut by_label = HashMap::with_capacity(k);

        for (label, index) in pairs {
            if label.trim().is_empty() {
                return Err(LoadError::ClassMapping("empty class label".to_string()));
            }
            if index < 0 || index as usize >= k {
                return Err(LoadError::ClassMapping(format!(
                    "label '{}' maps to {}, outside 0..{}",
                    label, index, k
                )));
            }
            let index = index as usize;
            if let Some(existing) = &slots[index] {
                return Err(LoadError::ClassMapping(format!(
                    "labels '{}' and '{}' share encoded index {}",
                    existing, label, index
                )));
            }
            if by_label.insert(label.clone(), index).is_some() {
                return Err(LoadError::ClassMapping(format!("duplicate label '{}'", label)));
            }
            slots[index] = Some(ClassLabel(label));
        }

        // k distinct in-range indices fill every slot
        let by_index: Vec<ClassLabel> = slots.into_iter().flatten().collect();

        let mut display_order: Vec<usize> = (0..k).collect();
        let all_numeric = by_index.iter().all(|l| l.as_integer().is_some());
        if all_numeric {
            display_order.sort_by_key(|&i| by_index[i].as_integer());
        } else {
            display_order.sort_by(|&a, &b| by_index[a].as_str().cmp(by_index[b].as_str()));
        }

        Ok(Self { by_index, by_label, display_order })
    }

    /// Number of classes (K)
    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    /// Original label -> encoded index
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.by_label.get(label).copied()
    }

    /// Encoded index -> original label
    pub fn decode(&self, index: usize) -> Result<&ClassLabel, ServiceError> {
        self.by_index
            .get(index)
            .ok_or(ServiceError::UnknownEncodedIndex(index))
    }

    /// Map a probability vector (encoded order) to original labels,
    /// keys in stable label order
    pub fn decode_all(&self, proba: &[f64]) -> Result<ClassProbabilities, ServiceError> {
        if proba.len() != self.len() {
            return Err(ServiceError::DimensionMismatch {
                stage: "label mapper",
                expected: self.len(),
                actual: proba.len(),
            });
        }

        Ok(ClassProbabilities(
            self.display_order
                .iter()
                .map(|&i| (self.by_index[i].clone(), proba[i]))
                .collect(),
        ))
    }

    /// Labels in stable display order
    pub fn labels(&self) -> impl Iterator<Item = &ClassLabel> {
        self.display_order.iter().map(move |&i| &self.by_index[i])
    }
}

// ============================================================================
// CLASS PROBABILITIES
// ============================================================================

/// Ordered label -> probability mapping; serialises as a JSON object
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProbabilities(Vec<(ClassLabel, f64)>);

impl ClassProbabilities {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(l, _)| l.as_str() == label)
            .map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClassLabel, f64)> {
        self.0.iter().map(|(l, p)| (l, *p))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().map(|(_, p)| p).sum()
    }

    /// Highest probability (first one wins on ties)
    pub fn max(&self) -> Option<(&ClassLabel, f64)> {
        let mut best: Option<(&ClassLabel, f64)> = None;
        for (label, p) in self.iter() {
            if best.map_or(true, |(_, b)| p > b) {
                best = Some((label, p));
            }
        }
        best
    }
}

impl Serialize for ClassProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, p) in &self.0 {
            map.serialize_entry(label.as_str(), p)?;
        }
        map.end()
    }
}
