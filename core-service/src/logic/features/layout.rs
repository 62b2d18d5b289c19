//! Feature Layout - Centralized Input Schema
//!
//! **This file controls the request schema**
//!
//! ## Rules:
//! 1. Add / remove / reorder a feature -> increment FEATURE_VERSION
//! 2. The artifact metadata decides the vector order at inference time;
//!    this layout is what the request layer requires to be present.
//!
//! The layout hash lets the artifact loader detect a metadata document
//! that was trained against a different schema.

use crc32fast::Hasher;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in the order the model was trained on
pub const FEATURE_LAYOUT: &[&str] = &[
    "feat1", "feat2", "feat3", "feat4", "feat5", "feat6",
    "feat7", "feat8", "feat9", "feat10", "feat11", "feat12",
    "feat13", "feat14", "feat15", "feat16", "feat17", "feat18",
    "feat19", "feat20", "feat21", "feat22", "feat23", "feat24",
    "feat25", "feat26", "feat27", "feat28", "feat29", "feat30",
    "feat31", "feat32", "feat33", "feat34", "feat35", "feat36",
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 36;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over the version and the ordered names
pub fn compute_layout_hash<S: AsRef<str>>(names: &[S]) -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in names {
        hasher.update(name.as_ref().as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

static SCHEMA_HASH: Lazy<u32> = Lazy::new(|| compute_layout_hash(FEATURE_LAYOUT));

/// Hash of the static request schema
pub fn layout_hash() -> u32 {
    *SCHEMA_HASH
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Layout information for serialization/logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    /// The static request schema
    pub fn current() -> Self {
        Self::from_names(FEATURE_LAYOUT)
    }

    /// Layout described by an artifact's ordered feature names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: compute_layout_hash(names),
            feature_count: names.len(),
            feature_names: names.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Same names, same order as the request schema
    pub fn matches_schema(&self) -> bool {
        self.hash == layout_hash() && self.feature_count == FEATURE_COUNT
    }

    /// Hex form used in logs and the info endpoint
    pub fn hash_hex(&self) -> String {
        format!("{:08x}", self.hash)
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when an artifact layout doesn't match the request schema
#[derive(Debug, Clone, Error)]
#[error(
    "Feature layout mismatch: expected hash {expected_hash:08x}, got {actual_hash:08x} (not in artifact: {not_in_artifact:?}, not in schema: {not_in_schema:?})"
)]
pub struct LayoutMismatchError {
    pub expected_hash: u32,
    pub actual_hash: u32,
    /// Schema features the artifact does not list
    pub not_in_artifact: Vec<String>,
    /// Artifact features the schema does not require
    pub not_in_schema: Vec<String>,
}

/// Compare artifact feature names against the request schema.
///
/// A pure reordering still fails (different hash) but both name lists come
/// back empty, which callers treat as harmless.
pub fn validate_layout<S: AsRef<str>>(names: &[S]) -> Result<(), LayoutMismatchError> {
    let actual = compute_layout_hash(names);
    let expected = layout_hash();

    if actual == expected {
        return Ok(());
    }

    let not_in_artifact = FEATURE_LAYOUT
        .iter()
        .filter(|schema| !names.iter().any(|n| n.as_ref() == **schema))
        .map(|s| s.to_string())
        .collect();
    let not_in_schema = names
        .iter()
        .filter(|n| feature_index(n.as_ref()).is_none())
        .map(|n| n.as_ref().to_string())
        .collect();

    Err(LayoutMismatchError {
        expected_hash: expected,
        actual_hash: actual,
        not_in_artifact,
        not_in_schema,
    })
}

/// Schema features for which `has` returns false, in layout order
pub fn missing_features<F>(has: F) -> Vec<&'static str>
where
    F: Fn(&str) -> bool,
{
    FEATURE_LAYOUT.iter().copied().filter(|name| !has(name)).collect()
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

// ============================================================================
// TESTS
// ============================================================================
