//! Features Module - Input schema and vector assembly
//!
//! `layout` is the request schema (36 named features); `vector` turns a
//! named record into the ordered vector the artifacts expect.

pub mod layout;
pub mod vector;

#[cfg(test)]
mod tests;

// Re-export common types
pub use layout::{LayoutInfo, FEATURE_COUNT, FEATURE_LAYOUT};
pub use vector::{FeatureRecord, FeatureVector};
