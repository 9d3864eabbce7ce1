//! Shared builders for tests and benches.
//!
//! Small deterministic datasets with a learnable signal, plus parameter maps
//! tuned so the native trainer accepts tiny inputs (leaf/bin minimums of 1).

use crate::data::{DatasetSchema, FieldSchema, ValueSchema, VecDataset};
use crate::training::ParamMap;

/// A numeric field schema.
pub fn numeric_field(name: &str, index: usize) -> FieldSchema {
    FieldSchema {
        name: name.into(),
        index,
        value: ValueSchema::Numeric {
            allow_missing: false,
        },
    }
}

/// A categorical field schema with the given nominal values.
pub fn categorical_field(name: &str, index: usize, values: &[&str]) -> FieldSchema {
    FieldSchema {
        name: name.into(),
        index,
        value: ValueSchema::Categorical {
            allow_missing: false,
            nominal_values: values.iter().map(|v| v.to_string()).collect(),
        },
    }
}

/// Build a parameter map from string pairs.
pub fn params_of(pairs: &[(&str, &str)]) -> ParamMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Training parameters that work on very small datasets.
pub fn fast_params() -> ParamMap {
    params_of(&[
        ("num_iterations", "10"),
        ("num_leaves", "4"),
        ("learning_rate", "0.1"),
        ("min_data_in_leaf", "1"),
        ("min_data_in_bin", "1"),
        ("seed", "42"),
        ("num_threads", "1"),
        ("verbosity", "-1"),
    ])
}

/// Fraud-flavored schema: `amount`, `hour`, `merchant_category` features and
/// a binary categorical `is_fraud` target at the end.
pub fn fraud_schema() -> DatasetSchema {
    DatasetSchema::new(
        Some(3),
        vec![
            numeric_field("amount", 0),
            numeric_field("hour", 1),
            categorical_field("merchant_category", 2, &["retail", "travel", "gaming"]),
            categorical_field("is_fraud", 3, &["false", "true"]),
        ],
    )
    .expect("static schema is valid")
}

/// Deterministic dataset over [`fraud_schema`].
///
/// The label follows the amount (high amounts are fraud), so a few boosting
/// iterations learn a real signal.
pub fn fraud_dataset(n_rows: usize) -> VecDataset {
    let rows = (0..n_rows)
        .map(|i| {
            let amount = (i % 20) as f64 * 10.0 + 5.0;
            let hour = (i * 7 % 24) as f64;
            let category = (i % 3) as f64;
            let label = f64::from(amount > 95.0);
            vec![amount, hour, category, label]
        })
        .collect();
    VecDataset::new(fraud_schema(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraud_dataset_has_both_classes() {
        let dataset = fraud_dataset(40);
        let positives: usize = dataset
            .rows()
            .iter()
            .filter(|row| row[3] == 1.0)
            .count();
        assert!(positives > 0 && positives < 40);
    }

    #[test]
    fn fraud_schema_target_is_binary() {
        let schema = fraud_schema();
        let target = schema.target_field().unwrap();
        assert_eq!(target.value.nominal_values().unwrap().len(), 2);
        assert_eq!(schema.n_predictive_fields(), 3);
    }
}
