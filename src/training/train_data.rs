//! Train-data buffers and the native dataset they turn into.
//!
//! [`TrainData`] owns the two chunked buffers that accumulate the streamed
//! training rows (row-major `f64` features, `f32` labels) and, once the
//! stream is exhausted, the native dataset handle built from them. The
//! feature buffer's chunk capacity is `num_features × instances_per_chunk`
//! elements, an exact multiple of the instance size, so no instance ever
//! straddles two chunks and every chunk can be handed to the native library
//! as a standalone row-major block.
//!
//! Buffers are released as soon as the native side has consumed them; the
//! dataset handle lives until [`release`](TrainData::release) or drop.

use std::ffi::{CStr, CString};
use std::ptr;

use libc::{c_char, c_int, c_void};

use crate::data::ChunkedArray;
use crate::error::TrainError;
use crate::ffi::lgbm_call;

/// Name of the native dataset field holding the labels.
const LABEL_FIELD: &CStr = c"label";

/// Streamed training data on its way into a native dataset.
pub struct TrainData {
    features: ChunkedArray<f64>,
    labels: ChunkedArray<f32>,
    num_features: usize,
    instances_per_chunk: usize,
    dataset: lightgbm_sys::DatasetHandle,
}

// The dataset handle is a plain heap pointer; TrainData is owned by exactly
// one training call and never shared.
unsafe impl Send for TrainData {}

impl TrainData {
    /// Allocate buffers for streaming instances of `num_features` features,
    /// `instances_per_chunk` instances per chunk.
    pub fn new(num_features: usize, instances_per_chunk: usize) -> Result<Self, TrainError> {
        if num_features == 0 {
            return Err(TrainError::Schema(
                "training requires at least one feature".into(),
            ));
        }
        if instances_per_chunk == 0 {
            return Err(TrainError::InvalidParams(
                "instances per chunk must be positive".into(),
            ));
        }
        log::debug!("train buffers allocated in chunks of {instances_per_chunk} instances");
        Ok(Self {
            features: ChunkedArray::new(num_features * instances_per_chunk),
            labels: ChunkedArray::new(instances_per_chunk),
            num_features,
            instances_per_chunk,
            dataset: ptr::null_mut(),
        })
    }

    /// Append one feature value, in row-major order.
    #[inline]
    pub fn push_feature(&mut self, value: f64) {
        self.features.push(value);
    }

    /// Append one label value.
    #[inline]
    pub fn push_label(&mut self, value: f32) {
        self.labels.push(value);
    }

    /// Number of complete instances appended so far.
    pub fn num_instances(&self) -> usize {
        self.labels.add_count()
    }

    /// Features per instance.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// The feature buffer (row-major, label excluded).
    pub fn features(&self) -> &ChunkedArray<f64> {
        &self.features
    }

    /// The label buffer.
    pub fn labels(&self) -> &ChunkedArray<f32> {
        &self.labels
    }

    /// Build the native dataset from the accumulated chunks.
    ///
    /// Consumes the buffers: each feature chunk is passed to the native
    /// library as one row-major block, the labels are coalesced into a single
    /// contiguous array for the label field, and both buffers are released
    /// once the native side holds the data. Fails with
    /// [`TrainError::EmptyDataset`] when nothing was appended.
    pub fn create_dataset(
        &mut self,
        train_params: &str,
        feature_names: &[String],
    ) -> Result<(), TrainError> {
        if self.labels.is_empty() {
            return Err(TrainError::EmptyDataset);
        }
        debug_assert_eq!(
            self.features.add_count(),
            self.labels.add_count() * self.num_features,
            "feature and label streams out of step"
        );

        self.create_dataset_from_chunks(train_params)?;
        self.features.release();

        self.set_label_field()?;
        self.labels.release();

        self.set_feature_names(feature_names)?;
        log::debug!(
            "created native dataset: {} instances x {} features",
            self.num_instances(),
            self.num_features
        );
        Ok(())
    }

    fn create_dataset_from_chunks(&mut self, train_params: &str) -> Result<(), TrainError> {
        let params_c = CString::new(train_params)
            .map_err(|_| TrainError::InvalidParams("parameters contain a NUL byte".into()))?;

        // Every chunk is a standalone row-major block; all are full except
        // possibly the last.
        let mut chunk_ptrs: Vec<*const c_void> = self
            .features
            .chunks()
            .map(|chunk| chunk.as_ptr() as *const c_void)
            .collect();
        let mut chunk_rows: Vec<i32> = self
            .features
            .chunks()
            .map(|chunk| (chunk.len() / self.num_features) as i32)
            .collect();
        debug_assert_eq!(
            chunk_rows.iter().map(|&n| n as usize).sum::<usize>(),
            self.num_instances()
        );

        let mut dataset: lightgbm_sys::DatasetHandle = ptr::null_mut();
        lgbm_call!(lightgbm_sys::LGBM_DatasetCreateFromMats(
            chunk_ptrs.len() as i32,
            chunk_ptrs.as_mut_ptr(),
            lightgbm_sys::C_API_DTYPE_FLOAT64 as c_int,
            chunk_rows.as_mut_ptr(),
            self.num_features as i32,
            1, // row-major
            params_c.as_ptr(),
            ptr::null_mut(), // no alignment with a reference dataset
            &mut dataset,
        ))
        .map_err(TrainError::Native)?;
        self.dataset = dataset;
        Ok(())
    }

    fn set_label_field(&mut self) -> Result<(), TrainError> {
        let num_labels = self.labels.add_count();
        let mut coalesced = vec![0.0f32; num_labels];
        self.labels.coalesce_to(&mut coalesced);

        lgbm_call!(lightgbm_sys::LGBM_DatasetSetField(
            self.dataset,
            LABEL_FIELD.as_ptr(),
            coalesced.as_ptr() as *const c_void,
            num_labels as c_int,
            lightgbm_sys::C_API_DTYPE_FLOAT32 as c_int,
        ))
        .map_err(TrainError::Native)
    }

    fn set_feature_names(&mut self, feature_names: &[String]) -> Result<(), TrainError> {
        debug_assert_eq!(feature_names.len(), self.num_features);
        let names_c: Vec<CString> = feature_names
            .iter()
            .map(|name| {
                CString::new(name.as_str()).map_err(|_| {
                    TrainError::InvalidParams(format!("feature name {name:?} contains a NUL byte"))
                })
            })
            .collect::<Result<_, _>>()?;
        let mut name_ptrs: Vec<*const c_char> = names_c.iter().map(|n| n.as_ptr()).collect();

        lgbm_call!(lightgbm_sys::LGBM_DatasetSetFeatureNames(
            self.dataset,
            name_ptrs.as_mut_ptr(),
            feature_names.len() as c_int,
        ))
        .map_err(TrainError::Native)
    }

    /// The native dataset handle; null until
    /// [`create_dataset`](Self::create_dataset) succeeds.
    pub(crate) fn dataset_handle(&self) -> lightgbm_sys::DatasetHandle {
        self.dataset
    }

    /// Release the chunked buffers and the native dataset.
    ///
    /// Idempotent; safe to call with zero instances appended or after a
    /// failed dataset build.
    pub fn release(&mut self) {
        self.features.release();
        self.labels.release();
        if !self.dataset.is_null() {
            if let Err(err) = lgbm_call!(lightgbm_sys::LGBM_DatasetFree(self.dataset)) {
                log::warn!("failed to free native dataset: {err}");
            }
            self.dataset = ptr::null_mut();
        }
    }
}

impl Drop for TrainData {
    fn drop(&mut self) {
        self.release();
    }
}
