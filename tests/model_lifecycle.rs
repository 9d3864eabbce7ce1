//! Model load/save lifecycle and concurrent scoring.

use std::sync::Arc;
use std::thread;

use approx::assert_abs_diff_eq;

use lightgbm_scoring::testing::{
    categorical_field, fast_params, fraud_dataset, fraud_schema, numeric_field,
};
use lightgbm_scoring::{
    fit, train_to_file, BinaryModel, DatasetSchema, LoadError, SchemaError, MODEL_FILE_NAME,
    SCHEMA_FILE_NAME,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn save_then_reload_from_directory_gives_identical_scores() {
    init_logging();
    let dataset = fraud_dataset(60);
    let model = fit(&dataset, &fast_params()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let saved = model.save(dir.path()).unwrap();
    assert_eq!(saved.file_name().unwrap(), MODEL_FILE_NAME);

    // Loading the directory resolves to the well-known binary inside it.
    let reloaded = BinaryModel::load(dir.path(), fraud_schema()).unwrap();
    assert_eq!(reloaded.num_features(), model.num_features());
    assert_eq!(reloaded.num_iterations(), model.num_iterations());

    for row in dataset.rows() {
        assert_eq!(
            model.class_distribution(row).unwrap(),
            reloaded.class_distribution(row).unwrap()
        );
    }
}

#[test]
fn schema_document_round_trips_next_to_the_binary() {
    init_logging();
    let model = fit(&fraud_dataset(60), &fast_params()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    model.save(dir.path()).unwrap();
    std::fs::write(
        dir.path().join(SCHEMA_FILE_NAME),
        serde_json::to_string(model.schema()).unwrap(),
    )
    .unwrap();

    let schema = DatasetSchema::from_json_file(dir.path()).unwrap();
    assert_eq!(schema.target_index(), Some(3));
    let reloaded = BinaryModel::load(dir.path(), schema).unwrap();
    assert_eq!(reloaded.feature_names(), model.feature_names());
}

#[test]
fn missing_model_file_fails() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let err = BinaryModel::load(dir.path(), fraud_schema()).unwrap_err();
    assert!(matches!(err, LoadError::ModelFileNotFound(_)));
}

#[test]
fn feature_count_mismatch_fails_the_load() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.txt");
    train_to_file(&fraud_dataset(60), &fast_params(), &path, 1000).unwrap();

    // A schema with one predictive field fewer than the model expects.
    let narrow = DatasetSchema::new(
        Some(2),
        vec![
            numeric_field("amount", 0),
            numeric_field("hour", 1),
            categorical_field("is_fraud", 2, &["false", "true"]),
        ],
    )
    .unwrap();
    let err = BinaryModel::load(&path, narrow).unwrap_err();
    assert!(matches!(
        err,
        LoadError::FeatureCountMismatch {
            model: 3,
            schema: 2
        }
    ));
}

#[test]
fn feature_name_mismatch_fails_the_load() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.txt");
    train_to_file(&fraud_dataset(60), &fast_params(), &path, 1000).unwrap();

    // Same field count, one renamed field: the model's "hour" feature no
    // longer resolves.
    let renamed = DatasetSchema::new(
        Some(3),
        vec![
            numeric_field("amount", 0),
            numeric_field("minute", 1),
            categorical_field("merchant_category", 2, &["retail", "travel", "gaming"]),
            categorical_field("is_fraud", 3, &["false", "true"]),
        ],
    )
    .unwrap();
    let err = BinaryModel::load(&path, renamed).unwrap_err();
    match err {
        LoadError::Schema(SchemaError::MissingFeature { name }) => assert_eq!(name, "hour"),
        other => panic!("expected missing-feature error, got {other:?}"),
    }
}

#[test]
fn contributions_have_one_value_per_feature_plus_bias() {
    init_logging();
    let dataset = fraud_dataset(60);
    let model = fit(&dataset, &fast_params()).unwrap();

    let contributions = model.feature_contributions(dataset.rows().first().unwrap()).unwrap();
    assert_eq!(contributions.len(), model.num_features() + 1);
    assert!(contributions.iter().all(|c| c.is_finite()));
}

#[test]
fn class_labels_decode_from_the_target_vocabulary() {
    init_logging();
    let dataset = fraud_dataset(60);
    let model = fit(&dataset, &fast_params()).unwrap();

    let class = model.classify(dataset.rows().first().unwrap()).unwrap();
    let label = model.class_label(class).unwrap();
    assert!(label == "false" || label == "true");
    assert_eq!(model.class_label(7), None);
}

#[test]
fn shared_model_scores_from_many_threads() {
    init_logging();
    let dataset = fraud_dataset(60);
    let model = Arc::new(fit(&dataset, &fast_params()).unwrap());

    let expected: Vec<[f64; 2]> = dataset
        .rows()
        .iter()
        .map(|row| model.class_distribution(row).unwrap())
        .collect();

    let mut workers = Vec::new();
    for _ in 0..8 {
        let model = Arc::clone(&model);
        let rows: Vec<Vec<f64>> = dataset.rows().to_vec();
        let expected = expected.clone();
        workers.push(thread::spawn(move || {
            for _ in 0..25 {
                for (row, want) in rows.iter().zip(&expected) {
                    let got = model.class_distribution(row).unwrap();
                    assert_eq!(&got, want);
                    assert_abs_diff_eq!(got[0] + got[1], 1.0, epsilon = 1e-9);
                }
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn close_is_terminal_and_explicit() {
    init_logging();
    let model = fit(&fraud_dataset(60), &fast_params()).unwrap();
    // Dropping has the same effect; close just makes the release explicit.
    model.close();
}
