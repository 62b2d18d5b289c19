//! Integration Tests for the Feature Modules
//!
//! Schema and vector assembly working together on full 36-value records.

#[cfg(test)]
mod integration_tests {
    use crate::logic::error::ServiceError;
    use crate::logic::features::{
        layout::{layout_hash, missing_features},
        vector::{FeatureRecord, FeatureVector},
        FEATURE_COUNT, FEATURE_LAYOUT,
    };

    fn full_record(order: &[usize]) -> FeatureRecord {
        let mut record = FeatureRecord::with_capacity(FEATURE_COUNT);
        for &i in order {
            record.insert(FEATURE_LAYOUT[i], (i as f64) * 1.5 - 3.0);
        }
        record
    }

    /// Insertion order never changes the vector
    #[test]
    fn test_build_is_insertion_order_independent() {
        let forward: Vec<usize> = (0..FEATURE_COUNT).collect();
        let reverse: Vec<usize> = (0..FEATURE_COUNT).rev().collect();
        let interleaved: Vec<usize> = (0..FEATURE_COUNT)
            .step_by(2)
            .chain((1..FEATURE_COUNT).step_by(2))
            .collect();

        let a = FeatureVector::build(&full_record(&forward), FEATURE_LAYOUT).unwrap();
        let b = FeatureVector::build(&full_record(&reverse), FEATURE_LAYOUT).unwrap();
        let c = FeatureVector::build(&full_record(&interleaved), FEATURE_LAYOUT).unwrap();

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.len(), FEATURE_COUNT);
        assert_eq!(a.layout_hash, layout_hash());
        for (i, value) in a.as_slice().iter().enumerate() {
            assert_eq!(*value, (i as f64) * 1.5 - 3.0);
        }
    }

    /// Every single missing key is named
    #[test]
    fn test_each_missing_key_is_reported() {
        for skip in 0..FEATURE_COUNT {
            let order: Vec<usize> = (0..FEATURE_COUNT).filter(|&i| i != skip).collect();
            let record = full_record(&order);

            let err = FeatureVector::build(&record, FEATURE_LAYOUT).unwrap_err();
            assert_eq!(err, ServiceError::MissingFeature(FEATURE_LAYOUT[skip].to_string()));

            assert_eq!(missing_features(|n| record.contains(n)), vec![FEATURE_LAYOUT[skip]]);
        }
    }

    /// Schema check and builder agree on a complete record
    #[test]
    fn test_complete_record_passes_schema() {
        let record = full_record(&(0..FEATURE_COUNT).collect::<Vec<_>>());
        assert!(missing_features(|n| record.contains(n)).is_empty());
        assert!(FeatureVector::build(&record, FEATURE_LAYOUT).is_ok());
    }
}
