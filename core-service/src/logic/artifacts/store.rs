//! Artifact Store - the single mutation point of shared model state
//!
//! The bundle is published at most once through a `OnceCell`: readers see
//! either nothing (not ready) or a fully validated bundle, never a partial
//! one. Reads after publish take no lock.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::Serialize;

use super::metadata::Metadata;
use super::{read_json, verify_checksum};
use crate::logic::config::{ModelFormat, PredictorConfig};
use crate::logic::error::LoadError;
use crate::logic::features::layout::{validate_layout, LayoutInfo};
use crate::logic::model::{ClassLabel, ClassMapping, Classifier, ScalerParams, TreeEnsembleClassifier};

// ============================================================================
// BUNDLE
// ============================================================================

/// Classifier, scaler and metadata that were validated together
#[derive(Debug)]
pub struct ArtifactBundle {
    classifier: Arc<dyn Classifier>,
    scaler: ScalerParams,
    metadata: Metadata,
    layout: LayoutInfo,
    loaded_at: DateTime<Utc>,
}

impl ArtifactBundle {
    /// Check the cross-artifact invariants and assemble the bundle
    pub fn new(
        classifier: Arc<dyn Classifier>,
        scaler: ScalerParams,
        metadata: Metadata,
    ) -> Result<Self, LoadError> {
        scaler.validate()?;

        let n_features = metadata.n_features();
        if scaler.len() != n_features {
            return Err(LoadError::FeatureCount {
                context: "scaler",
                expected: n_features,
                actual: scaler.len(),
            });
        }
        if let Some(declared) = classifier.n_features() {
            if declared != n_features {
                return Err(LoadError::FeatureCount {
                    context: "classifier",
                    expected: n_features,
                    actual: declared,
                });
            }
        }
        if classifier.n_classes() != metadata.n_classes() {
            return Err(LoadError::ClassCount {
                mapping: metadata.n_classes(),
                classifier: classifier.n_classes(),
            });
        }

        let layout = LayoutInfo::from_names(&metadata.feature_names);

        Ok(Self {
            classifier,
            scaler,
            metadata,
            layout,
            loaded_at: Utc::now(),
        })
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn scaler(&self) -> &ScalerParams {
        &self.scaler
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn feature_names(&self) -> &[String] {
        &self.metadata.feature_names
    }

    pub fn class_mapping(&self) -> &ClassMapping {
        &self.metadata.class_mapping
    }

    pub fn layout(&self) -> &LayoutInfo {
        &self.layout
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn info(&self) -> BundleInfo {
        BundleInfo {
            model_kind: self.classifier.kind(),
            n_features: self.metadata.n_features(),
            n_classes: self.metadata.n_classes(),
            classes: self.class_mapping().labels().cloned().collect(),
            layout_hash: self.layout.hash_hex(),
            matches_schema: self.layout.matches_schema(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Bundle summary for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct BundleInfo {
    pub model_kind: &'static str,
    pub n_features: usize,
    pub n_classes: usize,
    pub classes: Vec<ClassLabel>,
    pub layout_hash: String,
    pub matches_schema: bool,
    pub loaded_at: DateTime<Utc>,
}

// ============================================================================
// STORE
// ============================================================================

/// Owner of the process-wide bundle
pub struct ArtifactStore {
    config: PredictorConfig,
    bundle: OnceCell<Arc<ArtifactBundle>>,
    last_error: RwLock<Option<String>>,
}

impl ArtifactStore {
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            config,
            bundle: OnceCell::new(),
            last_error: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Read, validate and publish the artifacts.
    ///
    /// On failure the store stays not-ready and keeps the error for
    /// diagnostics. Once published, later calls return the same bundle.
    pub fn load(&self) -> Result<Arc<ArtifactBundle>, LoadError> {
        if let Some(bundle) = self.bundle.get() {
            log::debug!("Artifacts already loaded, reusing bundle");
            return Ok(bundle.clone());
        }

        log::info!("Loading model artifacts from: {}", self.config.model_dir.display());
        let start = Instant::now();

        let bundle = self.record(self.read_bundle())?;
        let published = self.publish(bundle)?;

        log::info!(
            "Model components loaded in {} ms ({} classifier, {} features, {} classes)",
            start.elapsed().as_millis(),
            published.classifier().kind(),
            published.metadata().n_features(),
            published.metadata().n_classes(),
        );
        Ok(published)
    }

    /// Publish a bundle assembled elsewhere (same checks as `load`)
    pub fn publish(&self, bundle: ArtifactBundle) -> Result<Arc<ArtifactBundle>, LoadError> {
        self.record(self.check_expected(&bundle))?;

        match validate_layout(bundle.feature_names()) {
            Ok(()) => log::info!("Feature layout matches request schema ({})", bundle.layout().hash_hex()),
            Err(e) if e.not_in_artifact.is_empty() && e.not_in_schema.is_empty() => {
                log::info!("Feature layout is a reordering of the request schema ({})", bundle.layout().hash_hex())
            }
            Err(e) => log::warn!("{} - requests built from the schema will miss features", e),
        }

        let bundle = Arc::new(bundle);
        if self.bundle.set(bundle.clone()).is_err() {
            log::warn!("Artifact bundle already published, keeping the first one");
        }
        *self.last_error.write() = None;

        Ok(self.bundle.get().cloned().unwrap_or(bundle))
    }

    /// True once a bundle is published
    pub fn is_ready(&self) -> bool {
        self.bundle.get().is_some()
    }

    pub fn get(&self) -> Option<Arc<ArtifactBundle>> {
        self.bundle.get().cloned()
    }

    /// Message of the most recent failed load, if still not ready
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn record<T>(&self, result: Result<T, LoadError>) -> Result<T, LoadError> {
        if let Err(e) = &result {
            log::error!("Error loading model components: {}", e);
            *self.last_error.write() = Some(e.to_string());
        }
        result
    }

    fn check_expected(&self, bundle: &ArtifactBundle) -> Result<(), LoadError> {
        match self.config.expected_features {
            Some(expected) if expected != bundle.metadata().n_features() => Err(LoadError::FeatureCount {
                context: "configuration",
                expected,
                actual: bundle.metadata().n_features(),
            }),
            _ => Ok(()),
        }
    }

    fn read_bundle(&self) -> Result<ArtifactBundle, LoadError> {
        let metadata = Metadata::load(&self.config.metadata_path())?;

        let scaler: ScalerParams = read_json(&self.config.scaler_path())?;
        scaler.validate()?;

        let model_path = self.config.model_path();
        if let Some(expected) = &self.config.model_sha256 {
            verify_checksum(&model_path, expected)?;
            log::info!("Model checksum verified");
        }

        let classifier: Arc<dyn Classifier> = match self.config.model_format {
            ModelFormat::TreeEnsemble => Arc::new(TreeEnsembleClassifier::load(&model_path)?),
            #[cfg(feature = "onnx")]
            ModelFormat::Onnx => Arc::new(crate::logic::model::OnnxClassifier::load(
                &model_path,
                metadata.n_features(),
                metadata.n_classes(),
            )?),
            #[cfg(not(feature = "onnx"))]
            ModelFormat::Onnx => return Err(LoadError::UnsupportedFormat(ModelFormat::Onnx.as_str())),
        };

        ArtifactBundle::new(classifier, scaler, metadata)
    }
}
