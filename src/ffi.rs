//! FFI bindings for Activity Flux
//!
//! C-compatible functions for calling the pipeline from a mobile view layer.
//! All functions take null-terminated C strings and return allocated memory that
//! must be freed by the caller using `aflux_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::ComputeError;
use crate::pipeline::{daily_json_to_dashboard, weekly_json_to_dashboard, weekly_statistics_json};
use crate::types::MetricKind;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("Null {what} pointer"));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| format!("Invalid UTF-8 in {what}"))
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a pipeline result to C: the JSON string, or NULL with the error recorded
fn finish(result: Result<String, String>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(msg) => {
            set_last_error(&msg);
            ptr::null_mut()
        }
    }
}

fn compute<F>(f: F) -> Result<String, String>
where
    F: FnOnce() -> Result<String, ComputeError>,
{
    f().map_err(|e| e.to_string())
}

/// Convert a daily activity payload to dashboard JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `aflux_free_string`.
/// - Returns NULL on error; call `aflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn aflux_daily_dashboard(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let result = cstr_to_str(json, "JSON string")
        .and_then(|raw| compute(|| daily_json_to_dashboard(raw)));
    finish(result)
}

/// Convert a weekly activity payload to dashboard JSON for one metric.
///
/// `metric` is one of "steps", "calories", "distance", "activeMinutes".
///
/// # Safety
/// - `json` and `metric` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `aflux_free_string`.
/// - Returns NULL on error; call `aflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn aflux_weekly_dashboard(
    json: *const c_char,
    metric: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let result = cstr_to_str(json, "JSON string").and_then(|raw| {
        let metric = parse_metric(metric)?;
        compute(|| weekly_json_to_dashboard(raw, metric))
    });
    finish(result)
}

/// Weekly statistics (total, average, max, min, best day index) as JSON.
///
/// # Safety
/// - `json` and `metric` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `aflux_free_string`.
/// - Returns NULL on error; call `aflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn aflux_weekly_statistics(
    json: *const c_char,
    metric: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let result = cstr_to_str(json, "JSON string").and_then(|raw| {
        let metric = parse_metric(metric)?;
        compute(|| weekly_statistics_json(raw, metric))
    });
    finish(result)
}

unsafe fn parse_metric(metric: *const c_char) -> Result<MetricKind, String> {
    cstr_to_str(metric, "metric")?
        .parse::<MetricKind>()
        .map_err(|e| e.to_string())
}

/// Free a string returned by an `aflux_` function.
///
/// # Safety
/// - `ptr` must be a pointer returned by an `aflux_` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn aflux_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string, valid until the next
///   `aflux_` call on this thread. Do NOT free it.
/// - Returns NULL if the last call succeeded.
#[no_mangle]
pub unsafe extern "C" fn aflux_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn aflux_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
