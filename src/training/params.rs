//! Training-parameter handling.
//!
//! The host hands over a flat, already-validated `key=value` map; this module
//! renders it into the parameter string the native library parses, after the
//! provider-level preprocessing the scoring contract requires: injecting the
//! `categorical_feature` positions (computed over the label-less feature
//! indexing), defaulting the objective, resolving the optional soft-label
//! column, and rejecting parameter combinations the algorithm cannot train
//! with.

use std::collections::BTreeMap;

use crate::data::{DatasetSchema, FieldSchema};
use crate::error::TrainError;

/// Flat string-keyed training parameters, as supplied by the host.
pub type ParamMap = BTreeMap<String, String>;

/// Parameter naming the number of boosting iterations.
pub const NUM_ITERATIONS_PARAMETER: &str = "num_iterations";

/// Parameter naming a numeric field whose value replaces the hard label
/// during training (probabilistic labels). The named column is excluded from
/// the feature matrix.
pub const SOFT_LABEL_PARAMETER: &str = "soft_label";

/// Iterations trained when the host does not say otherwise.
pub const DEFAULT_NUM_ITERATIONS: usize = 100;

/// Every alias the native library accepts for the objective parameter.
const OBJECTIVE_ALIASES: [&str; 5] = ["objective", "objective_type", "app", "application", "loss"];

const BOOSTING_TYPE_PARAMETER: &str = "boosting_type";
const BAGGING_FREQUENCY_PARAMETER: &str = "bagging_freq";
const BAGGING_FRACTION_PARAMETER: &str = "bagging_fraction";

/// The soft-label field named in `params`, if any (empty value means none).
pub(crate) fn soft_label_field(params: &ParamMap) -> Option<&str> {
    let name = params.get(SOFT_LABEL_PARAMETER)?.trim();
    (!name.is_empty()).then_some(name)
}

/// Schema index of the soft-label column, if one is configured.
pub(crate) fn soft_label_index(
    params: &ParamMap,
    schema: &DatasetSchema,
) -> Result<Option<usize>, TrainError> {
    match soft_label_field(params) {
        None => Ok(None),
        Some(name) => schema.field_index(name).map(Some).ok_or_else(|| {
            TrainError::InvalidParams(format!("soft label field {name:?} is not in the schema"))
        }),
    }
}

/// Number of boosting iterations to request.
pub(crate) fn num_iterations(params: &ParamMap) -> Result<usize, TrainError> {
    match params.get(NUM_ITERATIONS_PARAMETER) {
        None => Ok(DEFAULT_NUM_ITERATIONS),
        Some(raw) => raw.parse().map_err(|_| {
            TrainError::InvalidParams(format!("{NUM_ITERATIONS_PARAMETER} must be an integer, got {raw:?}"))
        }),
    }
}

/// Reject parameter combinations the native trainer cannot run with.
pub(crate) fn validate(params: &ParamMap) -> Result<(), TrainError> {
    if params.get(BOOSTING_TYPE_PARAMETER).map(String::as_str) == Some("rf") {
        let freq: f64 = numeric_param(params, BAGGING_FREQUENCY_PARAMETER, 0.0)?;
        let fraction: f64 = numeric_param(params, BAGGING_FRACTION_PARAMETER, 1.0)?;
        if freq == 0.0 || fraction == 1.0 {
            return Err(TrainError::InvalidParams(
                "random forest boosting requires bagging: set bagging_freq > 0 and bagging_fraction < 1"
                    .into(),
            ));
        }
    }
    Ok(())
}

fn numeric_param(params: &ParamMap, name: &str, default: f64) -> Result<f64, TrainError> {
    match params.get(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| TrainError::InvalidParams(format!("{name} must be numeric, got {raw:?}"))),
    }
}

/// Check the schema is trainable and return the hard-label index.
///
/// Training is supervised, so a target must be declared; string fields are
/// not representable on the native side, and a categorical target must be
/// binary.
pub(crate) fn validate_schema_for_fit(schema: &DatasetSchema) -> Result<usize, TrainError> {
    let target = schema
        .target_index()
        .ok_or_else(|| TrainError::Schema("schema has no target field".into()))?;
    if schema.has_string_fields() {
        return Err(TrainError::Schema("schema has string fields".into()));
    }
    if let Some(values) = schema.fields()[target].value.nominal_values() {
        if values.len() != 2 {
            return Err(TrainError::Schema(format!(
                "target field must be binary, has {} classes",
                values.len()
            )));
        }
    }
    Ok(target)
}

/// The fields that become native feature columns, in ascending index order.
///
/// Every field except the hard target: the position of a field in this
/// iteration is its native feature index. A configured soft-label column
/// stays a feature column (its values are neutralized during streaming, see
/// the trainer), so the trained model keeps the schema's feature geometry
/// and reloads through the unchanged load path.
pub(crate) fn feature_columns(schema: &DatasetSchema) -> impl Iterator<Item = &FieldSchema> {
    let target = schema.target_index();
    schema
        .fields()
        .iter()
        .filter(move |f| Some(f.index) != target)
}

/// Native positions of the categorical feature columns, in the label-less
/// indexing.
pub(crate) fn categorical_feature_positions(schema: &DatasetSchema) -> Vec<usize> {
    feature_columns(schema)
        .enumerate()
        .filter(|(_, field)| field.value.is_categorical())
        .map(|(position, _)| position)
        .collect()
}

/// Render the host's parameter map into the native `key=value ...` string.
///
/// Injects `categorical_feature`, defaults the objective (`binary`, or
/// `cross_entropy` when training against a soft label) unless any objective
/// alias is present, and drops the parameters the native library does not
/// know about. Host-supplied values are forwarded unchanged.
pub(crate) fn train_params_string(
    params: &ParamMap,
    schema: &DatasetSchema,
) -> Result<String, TrainError> {
    let soft_label = soft_label_index(params, schema)?;

    let mut rendered: BTreeMap<&str, String> = BTreeMap::new();

    let categorical: Vec<String> = categorical_feature_positions(schema)
        .into_iter()
        .map(|p| p.to_string())
        .collect();
    rendered.insert("categorical_feature", categorical.join(","));

    let has_objective = OBJECTIVE_ALIASES.iter().any(|alias| params.contains_key(*alias));
    if !has_objective {
        let objective = if soft_label.is_some() { "cross_entropy" } else { "binary" };
        rendered.insert("objective", objective.to_string());
    }

    for (key, value) in params {
        if key == SOFT_LABEL_PARAMETER {
            continue; // provider-level parameter, unknown to the native library
        }
        rendered.entry(key.as_str()).or_insert_with(|| value.clone());
    }

    let rendered = rendered
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ");
    if rendered.contains('\0') {
        return Err(TrainError::InvalidParams(
            "parameters contain a NUL byte".into(),
        ));
    }
    Ok(rendered)
}
