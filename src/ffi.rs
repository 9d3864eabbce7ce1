//! Thin helpers around the raw `lightgbm-sys` bindings.
//!
//! All native calls in this crate go through [`lgbm_call!`], which converts
//! the C API's `-1` sentinel into a [`NativeError`](crate::error::NativeError)
//! carrying `LGBM_GetLastError()` text. The module also performs the one-shot
//! process-wide setup (routing the native library's log lines into the `log`
//! facade) lazily, on first construction of any model-owning type.

use std::ffi::CStr;
use std::sync::Once;

use libc::c_char;

use crate::error::NativeError;

/// LightGBM reports binary classification as a single class: the model emits
/// one sigmoid score and the caller expands it into a two-class distribution.
pub(crate) const BINARY_NUM_CLASSES: usize = 1;

impl NativeError {
    /// Capture the native library's last-error text for a failed call.
    pub(crate) fn last_error(code: i32) -> Self {
        let message = unsafe {
            let ptr = lightgbm_sys::LGBM_GetLastError();
            if ptr.is_null() {
                String::from("unknown error")
            } else {
                CStr::from_ptr(ptr).to_string_lossy().into_owned()
            }
        };
        NativeError { code, message }
    }
}

/// Run a native call, mapping the `-1` sentinel to a [`NativeError`].
///
/// The expression is evaluated inside an `unsafe` block; callers are
/// responsible for upholding the pointer contracts of the wrapped call.
macro_rules! lgbm_call {
    ($call:expr) => {{
        let ret = unsafe { $call };
        if ret == -1 {
            Err($crate::error::NativeError::last_error(ret))
        } else {
            Ok(())
        }
    }};
}

pub(crate) use lgbm_call;

/// Persist a booster's model binary, with gain feature importances.
pub(crate) fn save_booster(
    handle: lightgbm_sys::BoosterHandle,
    path: &std::path::Path,
) -> Result<(), NativeError> {
    let path_c = std::ffi::CString::new(path.to_string_lossy().as_ref()).map_err(|_| NativeError {
        code: -1,
        message: format!("output path {} contains a NUL byte", path.display()),
    })?;
    lgbm_call!(lightgbm_sys::LGBM_BoosterSaveModel(
        handle,
        0,  // from the first iteration
        -1, // through the last
        lightgbm_sys::C_API_FEATURE_IMPORTANCE_GAIN as libc::c_int,
        path_c.as_ptr(),
    ))
}

static NATIVE_INIT: Once = Once::new();

/// One-shot process-wide native library setup.
///
/// Invoked lazily by every type that owns native handles; repeated calls are
/// no-ops. Currently this registers a log callback so the native library's
/// own output lands in the `log` facade instead of stdout.
pub(crate) fn ensure_initialized() {
    NATIVE_INIT.call_once(|| {
        // Registration failures are not fatal: the library stays usable, its
        // log lines just keep going to stdout.
        let ret = unsafe { lightgbm_sys::LGBM_RegisterLogCallback(Some(forward_native_log)) };
        if ret == -1 {
            log::warn!("could not redirect LightGBM log output");
        } else {
            log::debug!("LightGBM log output redirected");
        }
    });
}

unsafe extern "C" fn forward_native_log(msg: *const c_char) {
    if msg.is_null() {
        return;
    }
    let text = CStr::from_ptr(msg).to_string_lossy();
    let text = text.trim_end();
    if !text.is_empty() {
        log::debug!(target: "lightgbm", "{text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialization_is_idempotent() {
        ensure_initialized();
        ensure_initialized();
    }
}
