//! Logic Module - Prediction Pipeline
//!
//! Pipeline: record -> features -> scaler -> classifier -> labels.
//!
//! - `features/` - Feature layout and vector assembly
//! - `model/` - Scaling, inference and label mapping
//! - `artifacts/` - Load-once artifact bundle
//! - `service/` - Orchestration over the worker pool

pub mod config;
pub mod error;

pub mod features;
pub mod model;
pub mod artifacts;
pub mod service;
