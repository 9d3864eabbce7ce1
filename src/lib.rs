//! Binary-classification scoring and training on top of the native LightGBM
//! library.
//!
//! This crate wraps the LightGBM C API (through `lightgbm-sys`) for a
//! real-time event-scoring host: load a model binary against a declared field
//! schema, train a model from a streamed dataset, and score one event at a
//! time with low latency.
//!
//! # Key types
//!
//! - [`BinaryModel`] — a loaded model: validation, scoring, contributions,
//!   persistence
//! - [`DatasetSchema`] / [`FieldSchema`] / [`ValueSchema`] — the host's field
//!   schema and its `model.json` document format
//! - [`Dataset`] / [`Instance`] — the host-side data contract
//! - [`training::fit`] — train from a streamed dataset and get a
//!   scoring-ready model back
//!
//! # Scoring
//!
//! ```ignore
//! use lightgbm_scoring::{BinaryModel, DatasetSchema};
//!
//! let schema = DatasetSchema::from_json_file(model_dir)?;
//! let model = BinaryModel::load(model_dir, schema)?;
//! let [p_legit, p_fraud] = model.class_distribution(&event)?;
//! ```
//!
//! A loaded model is `Sync`: any number of host worker threads may score
//! against one shared instance. Each call serializes on the model's scratch
//! lock for the duration of the native call; predictions are pinned to
//! `num_threads=1` on the native side so single-row latency stays flat and
//! deterministic.

pub mod data;
pub mod error;
pub(crate) mod ffi;
pub mod model;
pub mod testing;
pub mod training;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// The loaded-model surface
pub use model::{BinaryModel, RowMapper, MODEL_FILE_NAME};

// Schema and data contracts
pub use data::{
    ChunkedArray, Dataset, DatasetSchema, FieldSchema, Instance, ValueSchema, VecDataset,
    SCHEMA_FILE_NAME,
};

// Errors
pub use error::{LoadError, NativeError, SchemaError, ScoreError, TrainError};

// Training entry points
pub use training::{fit, fit_with_chunk_size, train_to_file, ParamMap};
