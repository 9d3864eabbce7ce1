//! Error types for the scoring crate.
//!
//! Every `-1` sentinel returned by the native library is translated at the
//! FFI boundary into a [`NativeError`] carrying the library's own last-error
//! text, and then wrapped into the error of the operation that was running
//! (load, train, score). Nothing is silently swallowed: resource teardown on
//! the failure paths happens in the owning types, not here.

use std::io;
use std::path::PathBuf;

/// An error reported by the native LightGBM library.
///
/// Carries the return code of the failed call and the message obtained from
/// `LGBM_GetLastError` at the moment of failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("LightGBM error (code {code}): {message}")]
pub struct NativeError {
    /// Return code of the failed call (the C API uses `-1` for all failures).
    pub code: i32,

    /// Last-error text captured from the native library.
    pub message: String,
}

/// Errors raised while loading a model binary.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The native deserialization entry point rejected the model file.
    #[error("failed to load model binary: {0}")]
    Native(#[from] NativeError),

    /// A prediction resource (fast-predict config, scratch holder) could not
    /// be allocated after the model itself deserialized. Everything allocated
    /// up to that point has already been released.
    #[error("failed to allocate prediction resources: {0}")]
    ResourceAllocation(NativeError),

    /// The model is not a binary-classification model.
    #[error("cannot load a non-binary LightGBM model (native class count {num_classes})")]
    NonBinaryModel { num_classes: usize },

    /// The model expects a different number of features than the schema
    /// declares as predictive fields.
    #[error("model expects {model} features but the schema has {schema} predictive fields")]
    FeatureCountMismatch { model: usize, schema: usize },

    /// The schema is invalid or does not match the model's feature names.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The model file (or the well-known binary inside a model directory)
    /// does not exist.
    #[error("cannot find model file at {0}")]
    ModelFileNotFound(PathBuf),

    /// The model path cannot be passed across the FFI boundary.
    #[error("model path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors raised while training a model.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    /// The streamed dataset contained no instances.
    #[error("dataset cannot be empty")]
    EmptyDataset,

    /// A declared parameter violates an algorithm invariant, or a parameter
    /// references a field the schema does not have.
    #[error("invalid training parameters: {0}")]
    InvalidParams(String),

    /// The schema cannot be trained on (no target, string fields, non-binary
    /// categorical target).
    #[error("schema not trainable: {0}")]
    Schema(String),

    /// A native dataset/booster call failed. Buffers and temp files created
    /// so far have been released.
    #[error("native training call failed: {0}")]
    Native(#[from] NativeError),

    /// Reloading the freshly trained model through the normal load path
    /// failed.
    #[error("failed to reload trained model: {0}")]
    Reload(#[from] LoadError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors raised by a single scoring call.
///
/// Fatal to that call only: the loaded model stays valid for subsequent
/// calls.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    /// The native prediction call returned the failure sentinel.
    #[error("native prediction call failed: {0}")]
    Native(#[from] NativeError),

    /// The model's native resources have already been released.
    #[error("model has been closed")]
    ModelClosed,
}

/// Errors in a dataset schema, or between a schema and a loaded model.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A feature name required by the model binary is absent from the schema.
    #[error("model feature {name:?} is missing from the schema")]
    MissingFeature { name: String },

    #[error("duplicate field name {name:?}")]
    DuplicateFieldName { name: String },

    /// Field indices must be contiguous and ascending from zero.
    #[error("field {name:?} has index {index}, expected {expected}")]
    NonContiguousIndex {
        name: String,
        index: usize,
        expected: usize,
    },

    #[error("target index {index} does not reference a field (schema has {len} fields)")]
    TargetOutOfRange { index: usize, len: usize },

    #[error("failed to parse schema document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_error_display_carries_message() {
        let err = NativeError {
            code: -1,
            message: "Cannot find feature".into(),
        };
        assert_eq!(
            err.to_string(),
            "LightGBM error (code -1): Cannot find feature"
        );
    }

    #[test]
    fn load_error_wraps_schema_error() {
        let err: LoadError = SchemaError::MissingFeature {
            name: "amount".into(),
        }
        .into();
        assert!(matches!(err, LoadError::Schema(_)));
        assert!(err.to_string().contains("amount"));
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NativeError>();
        assert_send_sync::<LoadError>();
        assert_send_sync::<TrainError>();
        assert_send_sync::<ScoreError>();
        assert_send_sync::<SchemaError>();
    }
}
