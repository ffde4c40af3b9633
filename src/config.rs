//! Configuration Functions
//!
//! The library can be configured at runtime using environment variables or
//! by using functions in this module. Options set by calling functions in this
//! module override options set in environment variables, and thread local
//! options override process wide ones.
//!
//! ```
//! use georaster::config::*;
//!
//! // Let multi-threaded warps use four workers
//! set_config_option("GDAL_NUM_THREADS", "4").unwrap();
//!
//! assert_eq!(get_config_option("GDAL_NUM_THREADS", "").unwrap(), "4");
//!
//! // Set the option back to default
//! clear_config_option("GDAL_NUM_THREADS").unwrap();
//!
//! // Check the option has been cleared
//! assert_eq!(get_config_option("GDAL_NUM_THREADS", "XXX").unwrap(), "XXX");
//! ```
//!
//! Recognized options:
//! * `GDAL_NUM_THREADS`: worker count for multi-threaded warps (`ALL_CPUS` or a number).
//! * `WARP_MEMORY_LIMIT`: default warp memory limit in bytes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use crate::errors::{RasterError, Result};

static CONFIG_OPTIONS: LazyLock<Mutex<HashMap<String, String>>> = LazyLock::new(Default::default);

thread_local! {
    static THREAD_LOCAL_OPTIONS: RefCell<HashMap<String, String>> = RefCell::new(HashMap::new());
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains(['\0', '=']) {
        return Err(RasterError::BadArgument(format!(
            "Invalid configuration option name: '{}'",
            key.escape_debug()
        )));
    }
    Ok(())
}

fn check_value(value: &str) -> Result<()> {
    if value.contains('\0') {
        return Err(RasterError::BadArgument(format!(
            "Invalid configuration option value: '{}'",
            value.escape_debug()
        )));
    }
    Ok(())
}

fn global_options() -> Result<std::sync::MutexGuard<'static, HashMap<String, String>>> {
    CONFIG_OPTIONS
        .lock()
        .map_err(|_| RasterError::UnexpectedLogicError("configuration lock poisoned".into()))
}

/// Set a library configuration option
pub fn set_config_option(key: &str, value: &str) -> Result<()> {
    check_key(key)?;
    check_value(value)?;
    global_options()?.insert(key.to_owned(), value.to_owned());
    Ok(())
}

/// Get the value of a library configuration option
///
/// Thread local options are consulted first, then process wide options, then
/// the environment variable of the same name. If none is set, the value passed
/// in the `default` parameter is returned.
pub fn get_config_option(key: &str, default: &str) -> Result<String> {
    check_key(key)?;
    if let Some(v) = THREAD_LOCAL_OPTIONS.with(|opts| opts.borrow().get(key).cloned()) {
        return Ok(v);
    }
    if let Some(v) = global_options()?.get(key).cloned() {
        return Ok(v);
    }
    Ok(std::env::var(key).unwrap_or_else(|_| default.to_owned()))
}

/// Clear the value of a library configuration option
pub fn clear_config_option(key: &str) -> Result<()> {
    check_key(key)?;
    global_options()?.remove(key);
    Ok(())
}

/// Set a library configuration option
/// with **thread local** scope
pub fn set_thread_local_config_option(key: &str, value: &str) -> Result<()> {
    check_key(key)?;
    check_value(value)?;
    THREAD_LOCAL_OPTIONS.with(|opts| {
        opts.borrow_mut().insert(key.to_owned(), value.to_owned());
    });
    Ok(())
}

/// Get the value of a library configuration option
/// with **thread local** scope
///
/// If the config option specified by `key` is not found, the value passed in the `default` parameter is returned.
pub fn get_thread_local_config_option(key: &str, default: &str) -> Result<String> {
    check_key(key)?;
    Ok(THREAD_LOCAL_OPTIONS
        .with(|opts| opts.borrow().get(key).cloned())
        .unwrap_or_else(|| default.to_owned()))
}

/// Clear the value of a library configuration option
/// with **thread local** scope
pub fn clear_thread_local_config_option(key: &str) -> Result<()> {
    check_key(key)?;
    THREAD_LOCAL_OPTIONS.with(|opts| {
        opts.borrow_mut().remove(key);
    });
    Ok(())
}
