//! End-to-end training and scoring against the native library.

use approx::assert_abs_diff_eq;

use lightgbm_scoring::testing::{categorical_field, fast_params, fraud_dataset, numeric_field};
use lightgbm_scoring::{fit, fit_with_chunk_size, DatasetSchema, TrainError, VecDataset};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn distribution_sums_to_one_and_classify_matches_argmax() {
    init_logging();
    let dataset = fraud_dataset(60);
    let model = fit(&dataset, &fast_params()).unwrap();

    for row in dataset.rows() {
        let distribution = model.class_distribution(row).unwrap();
        assert_abs_diff_eq!(distribution[0] + distribution[1], 1.0, epsilon = 1e-9);

        let argmax = usize::from(distribution[1] >= distribution[0]);
        assert_eq!(model.classify(row).unwrap(), argmax);
    }
}

#[test]
fn model_learns_the_signal() {
    init_logging();
    let dataset = fraud_dataset(200);
    let model = fit(&dataset, &fast_params()).unwrap();

    // High amounts are fraud in the synthetic data.
    let fraud = vec![195.0, 3.0, 1.0, 0.0];
    let legit = vec![5.0, 3.0, 1.0, 0.0];
    let p_fraud = model.class_distribution(&fraud).unwrap()[1];
    let p_legit = model.class_distribution(&legit).unwrap()[1];
    assert!(
        p_fraud > p_legit,
        "expected fraud score {p_fraud} above legit score {p_legit}"
    );
}

/// Build the same logical two-feature dataset with the label field placed at
/// an arbitrary schema position.
fn dataset_with_label_at(position: usize, n_rows: usize) -> VecDataset {
    let mut fields = Vec::new();
    let mut feature_no = 0;
    for index in 0..3 {
        if index == position {
            fields.push(categorical_field("label", index, &["no", "yes"]));
        } else {
            fields.push(numeric_field(["a", "b"][feature_no], index));
            feature_no += 1;
        }
    }
    let schema = DatasetSchema::new(Some(position), fields).unwrap();

    let rows = (0..n_rows)
        .map(|i| {
            let a = (i % 10) as f64;
            let b = (i % 7) as f64 * 0.5;
            let label = f64::from(a >= 5.0);
            let mut row = vec![a, b];
            row.insert(position, label);
            row
        })
        .collect();
    VecDataset::new(schema, rows)
}

#[test]
fn label_position_does_not_affect_scores() {
    init_logging();
    const ROWS: usize = 80;

    let front = fit_with_chunk_size(&dataset_with_label_at(0, ROWS), &fast_params(), 16).unwrap();
    let middle = fit_with_chunk_size(&dataset_with_label_at(1, ROWS), &fast_params(), 16).unwrap();
    let back = fit_with_chunk_size(&dataset_with_label_at(2, ROWS), &fast_params(), 16).unwrap();

    for (a, b) in [(1.5, 2.0), (7.0, 0.5), (4.0, 3.0)] {
        let at_front = front.class_distribution(&vec![0.0, a, b]).unwrap();
        let at_middle = middle.class_distribution(&vec![a, 0.0, b]).unwrap();
        let at_back = back.class_distribution(&vec![a, b, 0.0]).unwrap();

        // Bit-identical, not merely close: the label position must not leak
        // into the feature mapping.
        assert_eq!(at_front, at_middle);
        assert_eq!(at_middle, at_back);
    }
}

#[test]
fn empty_dataset_fails_with_training_error() {
    init_logging();
    let dataset = VecDataset::new(lightgbm_scoring::testing::fraud_schema(), Vec::new());
    let err = fit(&dataset, &fast_params()).unwrap_err();
    assert!(matches!(err, TrainError::EmptyDataset));
}

#[test]
fn unsplittable_data_trains_fewer_iterations_than_requested() {
    init_logging();
    // Constant features: no split is ever possible, so the native trainer
    // signals completion long before the requested iteration count.
    let schema = DatasetSchema::new(
        Some(1),
        vec![
            numeric_field("x", 0),
            categorical_field("label", 1, &["no", "yes"]),
        ],
    )
    .unwrap();
    let rows = (0..8)
        .map(|i| vec![1.0, f64::from(i % 2 == 0)])
        .collect();
    let dataset = VecDataset::new(schema, rows);

    let mut params = fast_params();
    params.insert("num_iterations".into(), "50".into());
    let model = fit(&dataset, &params).unwrap();

    assert!(
        model.num_iterations() < 50,
        "expected early stop, got {} iterations",
        model.num_iterations()
    );
}

#[test]
fn two_instance_training_scores_out_of_vocabulary_target() {
    init_logging();
    // The concrete scenario: two numeric features, a binary categorical
    // target, two hand-picked training instances.
    let schema = DatasetSchema::new(
        Some(2),
        vec![
            numeric_field("x", 0),
            numeric_field("y", 1),
            categorical_field("label", 2, &["no", "yes"]),
        ],
    )
    .unwrap();
    let dataset = VecDataset::new(
        schema,
        vec![vec![1.0, 10.0, 0.0], vec![9.0, 20.0, 1.0]],
    );
    let model = fit(&dataset, &fast_params()).unwrap();

    // The scored instance carries a target code never seen in training; the
    // target is not a feature, so scoring must not reject it.
    let instance = vec![5.0, 15.0, 7.0];
    let distribution = model.class_distribution(&instance).unwrap();
    assert_eq!(distribution.len(), 2);
    assert_abs_diff_eq!(distribution[0] + distribution[1], 1.0, epsilon = 1e-9);
    assert!(model.classify(&instance).unwrap() <= 1);
}

#[test]
fn out_of_vocabulary_categorical_feature_scores() {
    init_logging();
    let dataset = fraud_dataset(60);
    let model = fit(&dataset, &fast_params()).unwrap();

    // merchant_category has codes 0..3; code 9 was never seen in training.
    let instance = vec![42.0, 12.0, 9.0, 0.0];
    let distribution = model.class_distribution(&instance).unwrap();
    assert_abs_diff_eq!(distribution[0] + distribution[1], 1.0, epsilon = 1e-9);
    assert!(model.classify(&instance).unwrap() <= 1);
}

#[test]
fn soft_label_training_neutralizes_the_soft_column() {
    init_logging();
    let schema = DatasetSchema::new(
        Some(2),
        vec![
            numeric_field("amount", 0),
            numeric_field("model_score", 1),
            categorical_field("is_fraud", 2, &["false", "true"]),
        ],
    )
    .unwrap();
    let rows: Vec<Vec<f64>> = (0..60)
        .map(|i| {
            let amount = (i % 20) as f64 * 10.0;
            let soft = (amount / 200.0).clamp(0.05, 0.95);
            let hard = f64::from(amount > 95.0);
            vec![amount, soft, hard]
        })
        .collect();
    let dataset = VecDataset::new(schema, rows);

    let mut params = fast_params();
    params.insert("soft_label".into(), "model_score".into());
    let model = fit(&dataset, &params).unwrap();

    // The soft column stays part of the feature geometry.
    assert_eq!(model.num_features(), 2);
    assert_eq!(model.feature_names(), &["amount", "model_score"]);

    // It was zeroed during training, so its value cannot move the score.
    let low = model.class_distribution(&vec![150.0, 0.0, 0.0]).unwrap();
    let high = model.class_distribution(&vec![150.0, 0.9, 0.0]).unwrap();
    assert_eq!(low, high);

    let distribution = model.class_distribution(&vec![150.0, 0.5, 0.0]).unwrap();
    assert_abs_diff_eq!(distribution[0] + distribution[1], 1.0, epsilon = 1e-9);
}

#[test]
fn rejects_unknown_soft_label_field() {
    init_logging();
    let dataset = fraud_dataset(10);
    let mut params = fast_params();
    params.insert("soft_label".into(), "no_such_field".into());
    let err = fit(&dataset, &params).unwrap_err();
    assert!(matches!(err, TrainError::InvalidParams(_)));
}

#[test]
fn second_chunk_training_matches_single_chunk_training() {
    init_logging();
    let dataset = fraud_dataset(33);

    // 16 instances per chunk forces three chunks (16 + 16 + 1); a large
    // chunk keeps everything in one. The chunk layout must not affect the
    // trained model.
    let chunked = fit_with_chunk_size(&dataset, &fast_params(), 16).unwrap();
    let single = fit_with_chunk_size(&dataset, &fast_params(), 100_000).unwrap();

    for row in dataset.rows() {
        assert_eq!(
            chunked.class_distribution(row).unwrap(),
            single.class_distribution(row).unwrap()
        );
    }
}
