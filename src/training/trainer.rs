//! Training orchestration: stream → native dataset → booster → model file.
//!
//! The dataset is read in a single pass of unknown size, so the rows are
//! accumulated into [`TrainData`]'s chunked buffers and handed to the native
//! library chunk-by-chunk. The booster is then trained one iteration at a
//! time (the native side may signal completion early), persisted to the
//! output file, and — for [`fit`] — reloaded through the normal model load
//! path so the returned model has gone through every load-time validation.
//!
//! Every failure path releases whatever was built so far: the chunked
//! buffers and the native dataset through [`TrainData`]'s teardown, the
//! in-training booster through [`TrainBooster`]'s, and the temporary model
//! file through the guard returned by `tempfile`.

use std::ffi::CString;
use std::path::Path;
use std::ptr;

use libc::c_int;

use crate::data::Dataset;
use crate::error::TrainError;
use crate::ffi::{self, lgbm_call};
use crate::model::BinaryModel;
use crate::training::params::{self, ParamMap};
use crate::training::train_data::TrainData;

/// Default number of instances per train-data chunk.
///
/// Small chunks fragment memory; large ones waste it (in the worst case the
/// last chunk holds a single instance). At several hundred `f64` features per
/// instance, 200k instances per chunk stays in the hundreds of megabytes.
pub const DEFAULT_INSTANCES_PER_CHUNK: usize = 200_000;

/// Train a model and load it for scoring.
///
/// Trains into a temporary file and reloads it through
/// [`BinaryModel::load`], so the result passed the same validation as any
/// other loaded model. The temporary file is removed on every exit path.
pub fn fit<D: Dataset + ?Sized>(dataset: &D, params: &ParamMap) -> Result<BinaryModel, TrainError> {
    fit_with_chunk_size(dataset, params, DEFAULT_INSTANCES_PER_CHUNK)
}

/// [`fit`] with an explicit train-buffer chunk size, to tune memory layout.
pub fn fit_with_chunk_size<D: Dataset + ?Sized>(
    dataset: &D,
    params: &ParamMap,
    instances_per_chunk: usize,
) -> Result<BinaryModel, TrainError> {
    let tmp = tempfile::Builder::new()
        .prefix("lightgbm_model_")
        .tempfile()?;
    train_to_file(dataset, params, tmp.path(), instances_per_chunk)?;
    Ok(BinaryModel::load(tmp.path(), dataset.schema().clone())?)
}

/// Train a model from a streamed dataset and persist it to `output`.
pub fn train_to_file<D: Dataset + ?Sized>(
    dataset: &D,
    params: &ParamMap,
    output: &Path,
    instances_per_chunk: usize,
) -> Result<(), TrainError> {
    ffi::ensure_initialized();

    let schema = dataset.schema();
    params::validate(params)?;
    let hard_label = params::validate_schema_for_fit(schema)?;
    let soft_label = params::soft_label_index(params, schema)?;
    let num_iterations = params::num_iterations(params)?;

    let feature_indices: Vec<usize> = params::feature_columns(schema)
        .map(|field| field.index)
        .collect();
    let feature_names: Vec<String> = params::feature_columns(schema)
        .map(|field| field.native_name())
        .collect();

    let train_params = params::train_params_string(params, schema)?;
    log::debug!("train parameters: {train_params}");
    if soft_label.is_some() {
        log::debug!("replacing hard label by soft label for training");
    }

    let mut train_data = TrainData::new(feature_indices.len(), instances_per_chunk)?;

    // Single pass over the stream: label first, then the feature values of
    // the instance in ascending field-index order. When a soft label is in
    // use its values feed the label stream, and its feature column is
    // neutralized to zero: the column must not leak the label, but dropping
    // it would change the feature geometry the schema declares.
    let label_index = soft_label.unwrap_or(hard_label);
    for instance in dataset.instances() {
        train_data.push_label(instance.value(label_index) as f32);
        for &index in &feature_indices {
            let value = if Some(index) == soft_label {
                0.0
            } else {
                instance.value(index)
            };
            train_data.push_feature(value);
        }
    }
    log::debug!(
        "copied {} instances into {} feature chunks",
        train_data.num_instances(),
        train_data.features().chunks_count()
    );

    train_data.create_dataset(&train_params, &feature_names)?;

    let mut booster = TrainBooster::create(&train_data, &train_params)?;
    booster.train(num_iterations)?;
    booster.save(output)?;

    // The booster references the training dataset; free it first. (The error
    // paths get the same order from reverse drop order of the two locals.)
    drop(booster);
    train_data.release();
    log::info!("trained model saved to {}", output.display());
    Ok(())
}

/// The booster handle of an in-progress training run.
///
/// Exists only inside [`train_to_file`]; freed on drop so a failed iteration
/// or save never leaks the native structure.
struct TrainBooster {
    handle: lightgbm_sys::BoosterHandle,
}

impl TrainBooster {
    fn create(train_data: &TrainData, train_params: &str) -> Result<Self, TrainError> {
        let params_c = CString::new(train_params)
            .map_err(|_| TrainError::InvalidParams("parameters contain a NUL byte".into()))?;
        let mut handle: lightgbm_sys::BoosterHandle = ptr::null_mut();
        lgbm_call!(lightgbm_sys::LGBM_BoosterCreate(
            train_data.dataset_handle(),
            params_c.as_ptr(),
            &mut handle,
        ))
        .map_err(TrainError::Native)?;
        Ok(Self { handle })
    }

    /// Add boosting iterations one at a time, up to `num_iterations`.
    ///
    /// The native library sets the finished flag when no further iteration
    /// can improve the model (no residual error, or early stopping against an
    /// in-train validation set); training then stops with fewer iterations
    /// than requested.
    fn train(&mut self, num_iterations: usize) -> Result<(), TrainError> {
        log::info!("training model, {num_iterations} iterations requested");
        let mut finished: c_int = 0;
        for iteration in 0..num_iterations {
            log::trace!("training iteration {}/{num_iterations}", iteration + 1);
            lgbm_call!(lightgbm_sys::LGBM_BoosterUpdateOneIter(
                self.handle,
                &mut finished
            ))
            .map_err(TrainError::Native)?;
            if finished == 1 {
                log::info!(
                    "native trainer signalled completion after {} iterations",
                    iteration + 1
                );
                break;
            }
        }
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<(), TrainError> {
        ffi::save_booster(self.handle, path).map_err(TrainError::Native)
    }
}

impl Drop for TrainBooster {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            if let Err(err) = lgbm_call!(lightgbm_sys::LGBM_BoosterFree(self.handle)) {
                log::warn!("failed to free training booster: {err}");
            }
            self.handle = ptr::null_mut();
        }
    }
}
