//! Pipeline tests for the prediction service

#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::logic::artifacts::{ArtifactBundle, ArtifactStore, Metadata};
    use crate::logic::config::PredictorConfig;
    use crate::logic::error::{ErrorKind, ServiceError};
    use crate::logic::features::FeatureRecord;
    use crate::logic::model::classifier::InferenceError;
    use crate::logic::model::{ClassMapping, Classifier, ScalerParams};
    use crate::logic::service::{Outcome, PredictionObserver, PredictionService};

    // ------------------------------------------------------------------------
    // Test classifiers
    // ------------------------------------------------------------------------

    /// Same output regardless of input
    #[derive(Debug)]
    struct FixedClassifier(Vec<f64>);

    impl Classifier for FixedClassifier {
        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, InferenceError> {
            Ok(self.0.clone())
        }
        fn n_classes(&self) -> usize {
            self.0.len()
        }
        fn n_features(&self) -> Option<usize> {
            None
        }
        fn kind(&self) -> &'static str {
            "fixed"
        }
    }

    /// Puts most of the mass on class `x[0] mod k`
    #[derive(Debug)]
    struct ModuloClassifier(usize);

    impl Classifier for ModuloClassifier {
        fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
            let k = self.0;
            let hot = (features[0].abs() as usize) % k;
            let rest = 0.2 / (k - 1) as f64;
            Ok((0..k).map(|i| if i == hot { 0.8 } else { rest }).collect())
        }
        fn n_classes(&self) -> usize {
            self.0
        }
        fn n_features(&self) -> Option<usize> {
            None
        }
        fn kind(&self) -> &'static str {
            "modulo"
        }
    }

    /// Claims `claimed` classes, returns `actual` values
    #[derive(Debug)]
    struct WrongWidthClassifier {
        claimed: usize,
        actual: usize,
    }

    impl Classifier for WrongWidthClassifier {
        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, InferenceError> {
            Ok(vec![1.0 / self.actual as f64; self.actual])
        }
        fn n_classes(&self) -> usize {
            self.claimed
        }
        fn n_features(&self) -> Option<usize> {
            None
        }
        fn kind(&self) -> &'static str {
            "wrong_width"
        }
    }

    #[derive(Debug)]
    struct PanickingClassifier;

    impl Classifier for PanickingClassifier {
        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, InferenceError> {
            panic!("corrupt tree node")
        }
        fn n_classes(&self) -> usize {
            2
        }
        fn n_features(&self) -> Option<usize> {
            None
        }
        fn kind(&self) -> &'static str {
            "panicking"
        }
    }

    #[derive(Default)]
    struct RecordingObserver(Mutex<Vec<Outcome>>);

    impl PredictionObserver for RecordingObserver {
        fn on_prediction(&self, outcome: Outcome, _latency: Duration) {
            self.0.lock().push(outcome);
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn config(workers: usize) -> PredictorConfig {
        PredictorConfig {
            expected_features: None,
            worker_count: workers,
            queue_depth: 4,
            ..PredictorConfig::default()
        }
    }

    fn ab_metadata() -> Metadata {
        let mapping = ClassMapping::from_pairs([("A", 0), ("B", 1)]).unwrap();
        Metadata::new(vec!["f1".to_string(), "f2".to_string()], mapping).unwrap()
    }

    fn ready_service(classifier: Arc<dyn Classifier>, metadata: Metadata, workers: usize) -> PredictionService {
        let store = Arc::new(ArtifactStore::new(config(workers)));
        let scaler = ScalerParams::identity(metadata.n_features());
        let bundle = ArtifactBundle::new(classifier, scaler, metadata).unwrap();
        store.publish(bundle).unwrap();
        PredictionService::new(store).unwrap()
    }

    fn record(f1: f64, f2: f64) -> FeatureRecord {
        FeatureRecord::new().with("f1", f1).with("f2", f2)
    }

    // ------------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_two_class_prediction() {
        let service = ready_service(Arc::new(FixedClassifier(vec![0.3, 0.7])), ab_metadata(), 2);

        let result = service.predict(record(1.0, 2.0)).await.unwrap();

        assert_eq!(result.predicted_class.as_str(), "B");
        assert_eq!(result.prediction_probabilities.get("A"), Some(0.3));
        assert_eq!(result.prediction_probabilities.get("B"), Some(0.7));
        assert_eq!(result.confidence, 0.7);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["predicted_class"], "B");
        assert_eq!(json["prediction_probabilities"]["A"], 0.3);

        service.shutdown();
    }

    #[tokio::test]
    async fn test_not_ready_skips_worker_pool() {
        let store = Arc::new(ArtifactStore::new(config(1)));
        let service = PredictionService::new(store).unwrap();

        let err = service.predict(record(1.0, 2.0)).await.unwrap_err();

        assert_eq!(err, ServiceError::NotReady);
        assert!(!service.is_ready());
        assert_eq!(service.pool_stats().submitted, 0);
        assert_eq!(service.stats().not_ready, 1);
    }

    #[tokio::test]
    async fn test_missing_feature_named() {
        let service = ready_service(Arc::new(FixedClassifier(vec![0.3, 0.7])), ab_metadata(), 1);

        let partial = FeatureRecord::new().with("f1", 1.0);
        let err = service.predict(partial).await.unwrap_err();

        assert_eq!(err, ServiceError::MissingFeature("f2".to_string()));
        assert_eq!(err.kind(), ErrorKind::MissingFeature);
    }

    #[tokio::test]
    async fn test_extra_fields_ignored() {
        let service = ready_service(Arc::new(FixedClassifier(vec![0.3, 0.7])), ab_metadata(), 1);

        let result = service.predict(record(1.0, 2.0).with("f99", 5.0)).await.unwrap();
        assert_eq!(result.predicted_class.as_str(), "B");
    }

    #[tokio::test]
    async fn test_output_width_mismatch() {
        let classifier = Arc::new(WrongWidthClassifier { claimed: 2, actual: 3 });
        let service = ready_service(classifier, ab_metadata(), 1);

        let err = service.predict(record(1.0, 2.0)).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::DimensionMismatch { stage: "classifier output", expected: 2, actual: 3 }
        );
    }

    #[tokio::test]
    async fn test_panic_becomes_prediction_error() {
        let service = ready_service(Arc::new(PanickingClassifier), ab_metadata(), 1);

        let err = service.predict(record(1.0, 2.0)).await.unwrap_err();
        match &err {
            ServiceError::Prediction(msg) => assert!(msg.contains("corrupt tree node")),
            other => panic!("unexpected error: {:?}", other),
        }

        // the pool keeps serving after a panic
        let again = service.predict(record(1.0, 2.0)).await.unwrap_err();
        assert_eq!(again.kind(), ErrorKind::Prediction);
        assert_eq!(service.stats().prediction_error, 2);
    }

    #[tokio::test]
    async fn test_small_sum_drift_is_renormalized() {
        let service = ready_service(Arc::new(FixedClassifier(vec![0.30005, 0.7])), ab_metadata(), 1);

        let result = service.predict(record(1.0, 2.0)).await.unwrap();

        let sum = result.prediction_probabilities.sum();
        assert!((sum - 1.0).abs() < 1e-6, "sum {} drifted from 1", sum);
        assert_eq!(result.predicted_class.as_str(), "B");
        assert_eq!(result.prediction_probabilities.get("B"), Some(result.confidence));
    }

    #[tokio::test]
    async fn test_tie_goes_to_first_index() {
        let service = ready_service(Arc::new(FixedClassifier(vec![0.5, 0.5])), ab_metadata(), 1);

        let result = service.predict(record(0.0, 0.0)).await.unwrap();
        assert_eq!(result.predicted_class.as_str(), "A");
        assert_eq!(result.confidence, 0.5);
    }

    #[tokio::test]
    async fn test_probabilities_follow_encoded_index() {
        // encoded order differs from label order
        let mapping = ClassMapping::from_pairs([("3", 1), ("1", 0), ("2", 2)]).unwrap();
        let metadata = Metadata::new(vec!["f1".to_string(), "f2".to_string()], mapping).unwrap();
        let service = ready_service(Arc::new(FixedClassifier(vec![0.1, 0.6, 0.3])), metadata, 1);

        let result = service.predict(record(0.0, 0.0)).await.unwrap();
        assert_eq!(result.predicted_class.as_str(), "3");
        assert_eq!(result.prediction_probabilities.get("1"), Some(0.1));
        assert_eq!(result.prediction_probabilities.get("3"), Some(0.6));

        let labels: Vec<&str> = result.prediction_probabilities.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["1", "2", "3"]);

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""predicted_class":3"#));
    }

    #[tokio::test]
    async fn test_result_properties_hold() {
        let mapping = ClassMapping::from_pairs([("low", 0), ("mid", 1), ("high", 2)]).unwrap();
        let metadata = Metadata::new(vec!["f1".to_string(), "f2".to_string()], mapping).unwrap();
        let service = ready_service(Arc::new(ModuloClassifier(3)), metadata, 2);

        for x in 0..9 {
            let result = service.predict(record(x as f64, 0.0)).await.unwrap();

            assert!((result.prediction_probabilities.sum() - 1.0).abs() < 1e-6);
            let (best, max) = result.prediction_probabilities.max().unwrap();
            assert_eq!(result.confidence, max);
            assert_eq!(best, &result.predicted_class);
            assert_eq!(result.prediction_probabilities.get(result.predicted_class.as_str()), Some(max));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_get_their_own_result() {
        let mapping = ClassMapping::from_pairs((0..4).map(|i| (format!("c{}", i), i as i64))).unwrap();
        let metadata = Metadata::new(vec!["f1".to_string(), "f2".to_string()], mapping).unwrap();
        let service = Arc::new(ready_service(Arc::new(ModuloClassifier(4)), metadata, 1));

        let mut handles = Vec::new();
        for i in 0..32u32 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let result = service.predict(record(i as f64, 0.0)).await.unwrap();
                (i, result)
            }));
        }

        for handle in handles {
            let (i, result) = handle.await.unwrap();
            assert_eq!(result.predicted_class.as_str(), format!("c{}", i % 4));
        }

        let stats = service.stats();
        assert_eq!(stats.success, 32);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(service.pool_stats().submitted, 32);
    }

    #[tokio::test]
    async fn test_observer_sees_every_outcome() {
        let observer = Arc::new(RecordingObserver::default());
        let service = ready_service(Arc::new(FixedClassifier(vec![0.3, 0.7])), ab_metadata(), 1)
            .with_observer(observer.clone());

        service.predict(record(1.0, 2.0)).await.unwrap();
        service.predict(FeatureRecord::new()).await.unwrap_err();

        let seen = observer.0.lock().clone();
        assert_eq!(
            seen,
            vec![Outcome::Success, Outcome::Failure(ErrorKind::MissingFeature)]
        );
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let service = ready_service(Arc::new(FixedClassifier(vec![0.3, 0.7])), ab_metadata(), 3);
        service.predict(record(1.0, 2.0)).await.unwrap();

        let status = service.status();
        assert!(status.ready);
        assert!(status.last_error.is_none());
        assert_eq!(status.stats.total, 1);
        assert_eq!(status.pool.workers, 3);

        let model = status.model.unwrap();
        assert_eq!(model.model_kind, "fixed");
        assert_eq!(model.n_classes, 2);
        assert!(!model.matches_schema);
    }
}
