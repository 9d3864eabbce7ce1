//! Loaded binary-classification model: validation, scoring, persistence.
//!
//! A [`BinaryModel`] is constructed by [`load`](BinaryModel::load) (or by
//! [`training::fit`](crate::training::fit), which trains and then goes
//! through the same load path) and stays scoring-ready until dropped or
//! [`close`](BinaryModel::close)d. Scoring is safe to call from any number of
//! threads on a shared instance: each call serializes on the scratch-buffer
//! lock for the duration of buffer fill + native call + result read.

use std::ffi::CStr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::data::{DatasetSchema, Instance};
use crate::error::{LoadError, NativeError, ScoreError};
use crate::ffi::BINARY_NUM_CLASSES;
use crate::model::handles::HandleSet;
use crate::model::mapper::RowMapper;

/// Well-known model binary filename inside a model directory.
pub const MODEL_FILE_NAME: &str = "LightGBM_model.txt";

/// Parameters applied to every single-row prediction.
///
/// `num_threads=1` is pinned deliberately: single-row calls share the
/// per-model scratch buffers, and letting the native library auto-detect a
/// thread count would trade determinism for nothing on one-row inputs.
pub(crate) const PREDICTION_PARAMS: &CStr = c"num_threads=1";

/// A loaded LightGBM binary-classification model.
pub struct BinaryModel {
    schema: DatasetSchema,
    mapper: RowMapper,
    /// The only mutable shared state: scratch buffers and native handles.
    scratch: Mutex<HandleSet>,
    num_features: usize,
    num_iterations: usize,
    feature_names: Vec<String>,
}

impl BinaryModel {
    /// Load a model binary and validate it against `schema`.
    ///
    /// `path` may be the binary itself or a directory containing the
    /// well-known [`MODEL_FILE_NAME`]. The load succeeds only if the model is
    /// binary (one native class), its feature count equals the schema's
    /// predictive-field count, and every model feature name resolves to a
    /// schema field; otherwise every resource allocated so far is released
    /// before the error is returned.
    pub fn load(path: &Path, schema: DatasetSchema) -> Result<Self, LoadError> {
        let model_file = resolve_model_file(path)?;
        log::info!("loading model from {}", model_file.display());

        let handles = HandleSet::load(&model_file, PREDICTION_PARAMS)?;

        if handles.num_classes() != BINARY_NUM_CLASSES {
            return Err(LoadError::NonBinaryModel {
                num_classes: handles.num_classes(),
            });
        }
        if handles.num_features() != schema.n_predictive_fields() {
            return Err(LoadError::FeatureCountMismatch {
                model: handles.num_features(),
                schema: schema.n_predictive_fields(),
            });
        }
        let mapper = RowMapper::new(&schema, handles.feature_names())?;

        let num_features = handles.num_features();
        let num_iterations = handles.num_iterations();
        let feature_names = handles.feature_names().to_vec();
        Ok(Self {
            schema,
            mapper,
            scratch: Mutex::new(handles),
            num_features,
            num_iterations,
            feature_names,
        })
    }

    /// Score one instance into a two-class probability distribution.
    ///
    /// Returns `[P(class 0), P(class 1)]`; the two entries always sum to 1.
    /// A native failure is fatal to this call only; the model remains valid.
    pub fn class_distribution(&self, instance: &dyn Instance) -> Result<[f64; 2], ScoreError> {
        let mut handles = self
            .scratch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.mapper.fill_row(instance, handles.input_mut());
        let score = handles.predict_score()?;
        log::trace!("prediction: {score}");
        Ok([1.0 - score, score])
    }

    /// Classify one instance as class 0 or class 1.
    ///
    /// Thresholds the distribution at 0.5; a positive-class score of exactly
    /// 0.5 classifies as class 1.
    pub fn classify(&self, instance: &dyn Instance) -> Result<usize, ScoreError> {
        let distribution = self.class_distribution(instance)?;
        Ok(usize::from(distribution[0] <= 0.5))
    }

    /// Per-feature contributions (TreeSHAP) for one instance.
    ///
    /// Returns one value per model feature, in model feature order, plus the
    /// bias term last — `num_features() + 1` values in total.
    pub fn feature_contributions(&self, instance: &dyn Instance) -> Result<Vec<f64>, ScoreError> {
        let mut handles = self
            .scratch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.mapper.fill_row(instance, handles.input_mut());
        Ok(handles.predict_contributions()?.to_vec())
    }

    /// Persist the model binary as [`MODEL_FILE_NAME`] inside `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, NativeError> {
        let path = dir.join(MODEL_FILE_NAME);
        log::info!("saving model to {}", path.display());
        let handles = self
            .scratch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        handles.save(&path)?;
        Ok(path)
    }

    /// Release every native resource now instead of at drop time.
    ///
    /// Terminal: the model is consumed. (Dropping the model has the same
    /// effect; this exists for hosts that want the release to be explicit.)
    pub fn close(self) {
        let mut handles = self
            .scratch
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        handles.release();
    }

    /// The schema this model was loaded against.
    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    /// Number of features, as reported by the model binary.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Number of boosting iterations in the model binary.
    pub fn num_iterations(&self) -> usize {
        self.num_iterations
    }

    /// Feature names in native model order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// The instance-to-row mapping derived for this model.
    pub fn mapper(&self) -> &RowMapper {
        &self.mapper
    }

    /// Label of a predicted class, from the schema's target vocabulary.
    pub fn class_label(&self, class_index: usize) -> Option<&str> {
        self.schema.target_field()?.value.value_of(class_index)
    }
}

/// Resolve "path is a directory" to the well-known binary inside it.
fn resolve_model_file(path: &Path) -> Result<PathBuf, LoadError> {
    let file = if path.is_dir() {
        path.join(MODEL_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    if !file.is_file() {
        return Err(LoadError::ModelFileNotFound(file));
    }
    Ok(file)
}
