//! Ownership of every native resource behind one loaded model.
//!
//! A [`HandleSet`] holds the booster handle, the fast-predict configuration
//! handles and the scratch buffers that a single-row prediction reuses across
//! calls. Construction allocates everything or rolls back atomically;
//! [`release`](HandleSet::release) tears down in reverse allocation order, is
//! idempotent, and leaves every field in its null/invalid sentinel state so a
//! stale call fails fast instead of touching freed memory.
//!
//! The set is not internally synchronized. The owning model wraps it in a
//! mutex and every prediction runs under that lock; the booster handle itself
//! tolerates concurrent reads once scratch access is serialized.

use std::ffi::CStr;
use std::path::Path;
use std::ptr;

use libc::{c_char, c_int, c_longlong, c_void};

use crate::error::{LoadError, NativeError, ScoreError};
use crate::ffi::{self, lgbm_call, BINARY_NUM_CLASSES};

/// All foreign resources of one loaded model.
#[derive(Debug)]
pub(crate) struct HandleSet {
    /// Opaque booster handle; null only before load and after release.
    booster: lightgbm_sys::BoosterHandle,

    /// Cached booster + prediction settings for the single-row fast path.
    score_config: lightgbm_sys::FastConfigHandle,

    /// Same, initialized for feature-contribution (TreeSHAP) output.
    contrib_config: lightgbm_sys::FastConfigHandle,

    /// Scratch input row, sized to the model's feature count.
    input: Vec<f64>,

    /// Scratch prediction output, sized to the native class count.
    scores: Vec<f64>,

    /// Scratch contributions output: one value per feature plus the bias.
    contribs: Vec<f64>,

    /// Reused output-length holder; the length is known from preallocation,
    /// the native API just insists on writing it somewhere.
    out_len: c_longlong,

    num_iterations: usize,
    num_features: usize,
    num_classes: usize,
    feature_names: Vec<String>,
}

// The raw handles are plain heap pointers into the native library; moving
// them across threads is fine, shared access is serialized by the owner.
unsafe impl Send for HandleSet {}

impl HandleSet {
    /// Load a model binary and allocate every prediction resource.
    ///
    /// `prediction_params` is the LightGBM parameter string applied to the
    /// fast-predict configurations. Any intermediate failure releases
    /// whatever was already allocated before the error propagates.
    pub(crate) fn load(path: &Path, prediction_params: &CStr) -> Result<Self, LoadError> {
        ffi::ensure_initialized();

        let mut set = Self {
            booster: ptr::null_mut(),
            score_config: ptr::null_mut(),
            contrib_config: ptr::null_mut(),
            input: Vec::new(),
            scores: Vec::new(),
            contribs: Vec::new(),
            out_len: 0,
            num_iterations: 0,
            num_features: 0,
            num_classes: 0,
            feature_names: Vec::new(),
        };
        match set.init(path, prediction_params) {
            Ok(()) => Ok(set),
            Err(err) => {
                set.release();
                Err(err)
            }
        }
    }

    fn init(&mut self, path: &Path, prediction_params: &CStr) -> Result<(), LoadError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| LoadError::InvalidPath(path.to_path_buf()))?;
        let path_c = std::ffi::CString::new(path_str)
            .map_err(|_| LoadError::InvalidPath(path.to_path_buf()))?;

        let mut num_iterations: c_int = 0;
        let mut booster: lightgbm_sys::BoosterHandle = ptr::null_mut();
        lgbm_call!(lightgbm_sys::LGBM_BoosterCreateFromModelfile(
            path_c.as_ptr(),
            &mut num_iterations,
            &mut booster,
        ))?;
        self.booster = booster;
        self.num_iterations = num_iterations.max(0) as usize;
        log::debug!(
            "loaded model binary with {} iterations from {}",
            self.num_iterations,
            path.display()
        );

        self.num_features = self.read_num_features()?;
        self.num_classes = self.read_num_classes()?;
        self.feature_names = self.read_feature_names()?;
        log::debug!(
            "model has {} features, {} native classes",
            self.num_features,
            self.num_classes
        );

        self.input = vec![0.0; self.num_features];
        self.scores = vec![0.0; self.num_classes.max(BINARY_NUM_CLASSES)];
        self.contribs = vec![0.0; self.num_features + 1];

        self.score_config = self
            .init_fast_config(lightgbm_sys::C_API_PREDICT_NORMAL as c_int, prediction_params)
            .map_err(LoadError::ResourceAllocation)?;
        self.contrib_config = self
            .init_fast_config(lightgbm_sys::C_API_PREDICT_CONTRIB as c_int, prediction_params)
            .map_err(LoadError::ResourceAllocation)?;
        Ok(())
    }

    fn read_num_features(&self) -> Result<usize, NativeError> {
        let mut out: c_int = 0;
        lgbm_call!(lightgbm_sys::LGBM_BoosterGetNumFeature(
            self.booster,
            &mut out
        ))?;
        Ok(out.max(0) as usize)
    }

    fn read_num_classes(&self) -> Result<usize, NativeError> {
        let mut out: c_int = 0;
        lgbm_call!(lightgbm_sys::LGBM_BoosterGetNumClasses(
            self.booster,
            &mut out
        ))?;
        Ok(out.max(0) as usize)
    }

    /// Read the feature names stored in the model binary.
    ///
    /// The native call writes into caller-allocated name buffers; if the
    /// first pass reports longer names than the default capacity, one retry
    /// with the reported capacity fetches the full names.
    fn read_feature_names(&self) -> Result<Vec<String>, NativeError> {
        const DEFAULT_NAME_CAPACITY: usize = 64;

        let (names, needed) = self.read_feature_names_with_capacity(DEFAULT_NAME_CAPACITY)?;
        if needed > DEFAULT_NAME_CAPACITY {
            let (names, _) = self.read_feature_names_with_capacity(needed)?;
            return Ok(names);
        }
        Ok(names)
    }

    fn read_feature_names_with_capacity(
        &self,
        capacity: usize,
    ) -> Result<(Vec<String>, usize), NativeError> {
        let mut buffers: Vec<Vec<u8>> = vec![vec![0u8; capacity]; self.num_features];
        let mut ptrs: Vec<*mut c_char> = buffers
            .iter_mut()
            .map(|b| b.as_mut_ptr() as *mut c_char)
            .collect();

        let mut out_count: c_int = 0;
        let mut out_capacity: lightgbm_sys::size_t = 0;
        lgbm_call!(lightgbm_sys::LGBM_BoosterGetFeatureNames(
            self.booster,
            self.num_features as c_int,
            &mut out_count,
            capacity as lightgbm_sys::size_t,
            &mut out_capacity,
            ptrs.as_mut_ptr(),
        ))?;

        let names = buffers
            .into_iter()
            .take(out_count.max(0) as usize)
            .map(|buffer| {
                let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
                String::from_utf8_lossy(&buffer[..end]).into_owned()
            })
            .collect();
        Ok((names, out_capacity as usize))
    }

    fn init_fast_config(
        &self,
        predict_type: c_int,
        params: &CStr,
    ) -> Result<lightgbm_sys::FastConfigHandle, NativeError> {
        let mut config: lightgbm_sys::FastConfigHandle = ptr::null_mut();
        lgbm_call!(lightgbm_sys::LGBM_BoosterPredictForMatSingleRowFastInit(
            self.booster,
            predict_type,
            0,  // start at the first iteration
            -1, // use all iterations
            lightgbm_sys::C_API_DTYPE_FLOAT64 as c_int,
            self.num_features as c_int,
            params.as_ptr(),
            &mut config,
        ))?;
        Ok(config)
    }

    /// Scratch input row, to be filled before a prediction call.
    #[inline]
    pub(crate) fn input_mut(&mut self) -> &mut [f64] {
        &mut self.input
    }

    /// Run the single-row fast prediction over the scratch input and return
    /// the model's raw score (positive-class probability for binary models).
    pub(crate) fn predict_score(&mut self) -> Result<f64, ScoreError> {
        if self.score_config.is_null() {
            return Err(ScoreError::ModelClosed);
        }
        lgbm_call!(lightgbm_sys::LGBM_BoosterPredictForMatSingleRowFast(
            self.score_config,
            self.input.as_ptr() as *const c_void,
            &mut self.out_len,
            self.scores.as_mut_ptr(),
        ))?;
        Ok(self.scores[0])
    }

    /// Run the single-row contributions prediction over the scratch input.
    ///
    /// Returns one value per feature plus the bias term, in model feature
    /// order.
    pub(crate) fn predict_contributions(&mut self) -> Result<&[f64], ScoreError> {
        if self.contrib_config.is_null() {
            return Err(ScoreError::ModelClosed);
        }
        lgbm_call!(lightgbm_sys::LGBM_BoosterPredictForMatSingleRowFast(
            self.contrib_config,
            self.input.as_ptr() as *const c_void,
            &mut self.out_len,
            self.contribs.as_mut_ptr(),
        ))?;
        Ok(&self.contribs)
    }

    /// Persist the model binary, with gain feature importances.
    pub(crate) fn save(&self, path: &Path) -> Result<(), NativeError> {
        ffi::save_booster(self.booster, path)
    }

    pub(crate) fn num_iterations(&self) -> usize {
        self.num_iterations
    }

    pub(crate) fn num_features(&self) -> usize {
        self.num_features
    }

    pub(crate) fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub(crate) fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Release every native resource, in reverse allocation order.
    ///
    /// Idempotent: safe after partial initialization and safe to call any
    /// number of times. Runs during error unwinding, so native free failures
    /// are logged rather than raised.
    pub(crate) fn release(&mut self) {
        if !self.contrib_config.is_null() {
            if let Err(err) = lgbm_call!(lightgbm_sys::LGBM_FastConfigFree(self.contrib_config)) {
                log::warn!("failed to free contributions fast config: {err}");
            }
            self.contrib_config = ptr::null_mut();
        }
        if !self.score_config.is_null() {
            if let Err(err) = lgbm_call!(lightgbm_sys::LGBM_FastConfigFree(self.score_config)) {
                log::warn!("failed to free prediction fast config: {err}");
            }
            self.score_config = ptr::null_mut();
        }

        self.input = Vec::new();
        self.scores = Vec::new();
        self.contribs = Vec::new();

        if !self.booster.is_null() {
            if let Err(err) = lgbm_call!(lightgbm_sys::LGBM_BoosterFree(self.booster)) {
                log::warn!("failed to free booster: {err}");
            }
            self.booster = ptr::null_mut();
        }
    }

    /// Whether every field is back in its null/invalid sentinel state.
    #[cfg(test)]
    pub(crate) fn is_released(&self) -> bool {
        self.booster.is_null()
            && self.score_config.is_null()
            && self.contrib_config.is_null()
            && self.input.is_empty()
            && self.scores.is_empty()
            && self.contribs.is_empty()
    }
}

impl Drop for HandleSet {
    fn drop(&mut self) {
        self.release();
    }
}
