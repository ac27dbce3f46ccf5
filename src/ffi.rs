//! FFI bindings for Vivarium Flux
//!
//! This module provides C-compatible functions for calling Flux from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `vivarium_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::TransformConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::extraction::{TableAdapter, TableFormat};
use crate::pipeline::{SeriesTransformer, View};
use crate::types::CohortTables;

// Thread-local storage for the last error message
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

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// NULL selects the default configuration
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<TransformConfig, ComputeError> {
    if config_json.is_null() {
        return Ok(TransformConfig::default());
    }
    let json = cstr_to_string(config_json)
        .ok_or_else(|| ComputeError::InvalidConfig("config is not valid UTF-8".to_string()))?;
    TransformConfig::from_json(&json)
}

unsafe fn table_arg(ptr: *const c_char, name: &str) -> Result<String, ComputeError> {
    cstr_to_string(ptr).ok_or_else(|| ComputeError::ParseError(format!("Invalid {} string pointer", name)))
}

fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Transform one JSON table (array of row objects) into a series payload.
///
/// # Safety
/// - `table_json` and `view` must be valid null-terminated C strings.
/// - `config_json` may be NULL to use the default configuration.
/// - Returns a newly allocated string that must be freed with `vivarium_free_string`.
/// - Returns NULL on error; call `vivarium_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn vivarium_transform_table(
    table_json: *const c_char,
    view: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let result = (|| -> Result<String, ComputeError> {
        let table_str = table_arg(table_json, "table JSON")?;
        let view: View = table_arg(view, "view")?.parse()?;
        let config = config_from_ptr(config_json)?;

        let table = TableAdapter::parse_table(&table_str, TableFormat::Json)?;
        let series = SeriesTransformer::new(config)?.transform(&table, view)?;
        ReportEncoder::new().series_to_json(series, view)
    })();

    finish(result)
}

// ============================================================================
// Stateful Transformer API
// ============================================================================

/// Opaque handle to a SeriesTransformer
pub struct TransformerHandle {
    transformer: SeriesTransformer,
    encoder: ReportEncoder,
}

/// Create a transformer from a JSON configuration.
///
/// # Safety
/// - `config_json` may be NULL to use the default configuration.
/// - Must be freed with `vivarium_transformer_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn vivarium_transformer_new(
    config_json: *const c_char,
) -> *mut TransformerHandle {
    clear_last_error();

    let transformer = match config_from_ptr(config_json).and_then(SeriesTransformer::new) {
        Ok(t) => t,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    Box::into_raw(Box::new(TransformerHandle {
        transformer,
        encoder: ReportEncoder::new(),
    }))
}

/// Free a transformer.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `vivarium_transformer_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn vivarium_transformer_free(handle: *mut TransformerHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Process the four tables of a cohort into a report payload.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `vivarium_transformer_new`.
/// - All four table arguments must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `vivarium_free_string`.
/// - Returns NULL on error; call `vivarium_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn vivarium_transformer_process_cohort(
    handle: *mut TransformerHandle,
    female_activity: *const c_char,
    male_activity: *const c_char,
    female_temperature: *const c_char,
    male_temperature: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null transformer pointer");
        return ptr::null_mut();
    }

    let handle = &*handle;

    let result = (|| -> Result<String, ComputeError> {
        let parse = |ptr: *const c_char, name: &str| -> Result<_, ComputeError> {
            let json = table_arg(ptr, name)?;
            TableAdapter::parse_table(&json, TableFormat::Json)
        };

        let tables = CohortTables {
            female_activity: parse(female_activity, "female activity")?,
            male_activity: parse(male_activity, "male activity")?,
            female_temperature: parse(female_temperature, "female temperature")?,
            male_temperature: parse(male_temperature, "male temperature")?,
        };

        let report = handle.transformer.process_cohort(&tables)?;
        handle
            .encoder
            .report_to_json(report, handle.transformer.config())
    })();

    finish(result)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Flux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Flux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn vivarium_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Flux function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn vivarium_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Flux library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn vivarium_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
