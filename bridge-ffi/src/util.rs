//! Conversion helpers shared by the operation modules.

use std::ffi::{c_char, CStr, CString};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use bridge_core::{BridgeError, Entry, Handle, Result};
use client_traits::ClientConfig;

use crate::alloc::calloc_one;
use crate::types::{DepotConfig, HandleStruct};
use crate::universe::Universe;

/// Borrow a required NUL-terminated input string.
pub(crate) unsafe fn required_str<'a>(
    ptr: *const c_char,
    name: &'static str,
) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(BridgeError::NullArgument(name));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| BridgeError::InvalidArgument(format!("{name} is not valid UTF-8")))
}

/// Borrow an optional input string; NULL becomes `None`.
pub(crate) unsafe fn optional_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(str::to_string)
}

/// Allocate an outgoing NUL-terminated string owned by the caller.
/// Interior NULs (possible only in hostile client output) truncate.
pub(crate) fn malloc_cstr(s: &str) -> *mut c_char {
    let bytes = s.as_bytes();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    match CString::new(&bytes[..end]) {
        Ok(owned) => owned.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

pub(crate) unsafe fn free_cstr(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    drop(CString::from_raw(ptr));
}

/// Unix seconds for the boundary; zero stands for "unset".
pub(crate) fn time_to_unix(time: Option<DateTime<Utc>>) -> i64 {
    time.map(|t| t.timestamp()).unwrap_or(0)
}

pub(crate) fn unix_to_time(seconds: i64) -> Option<DateTime<Utc>> {
    if seconds <= 0 {
        return None;
    }
    Utc.timestamp_opt(seconds, 0).single()
}

pub(crate) unsafe fn client_config_from_c(config: &DepotConfig) -> ClientConfig {
    ClientConfig {
        user_agent: optional_str(config.user_agent),
        dial_timeout: if config.dial_timeout_milliseconds > 0 {
            Some(Duration::from_millis(config.dial_timeout_milliseconds as u64))
        } else {
            None
        },
        temp_directory: optional_str(config.temp_directory).map(Into::into),
    }
}

/// Wrap a registry handle for the caller. The struct itself is heap
/// allocated and freed by the matching `depot_free_*`.
pub(crate) fn malloc_handle<T: HandleStruct>(raw: usize) -> *mut T {
    let ptr = calloc_one::<T>();
    // SAFETY: freshly allocated and zeroed.
    unsafe {
        ptr.write(T::new(raw));
    }
    ptr
}

/// Resolve a handle struct to its live registry entry.
pub(crate) unsafe fn lookup<T: HandleStruct>(
    universe: &Universe,
    handle: *mut T,
    name: &'static str,
) -> Result<std::sync::Arc<Entry>> {
    if handle.is_null() {
        return Err(BridgeError::NullArgument(name));
    }
    universe
        .registry()
        .get(Handle::from_raw((*handle).raw()))
        .ok_or(BridgeError::InvalidHandle(name))
}

/// Lock a cursor for one protocol call; poisoning recovers rather than
/// crashing the boundary.
pub(crate) fn lock_cursor<T>(
    cursor: &std::sync::Mutex<bridge_core::LazyCursor<T>>,
) -> std::sync::MutexGuard<'_, bridge_core::LazyCursor<T>> {
    cursor
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Resolve a project handle to its scope and client session.
pub(crate) unsafe fn project_ref(
    universe: &Universe,
    project: *mut crate::types::DepotProject,
) -> Result<(bridge_core::Scope, std::sync::Arc<dyn client_traits::ProjectClient>)> {
    let entry = lookup(universe, project, "project")?;
    let project_entry = entry
        .as_project()
        .ok_or(BridgeError::InvalidHandle("project"))?;
    Ok((
        project_entry.scope.clone(),
        std::sync::Arc::clone(&project_entry.project),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_strings_round_trip() {
        let ptr = malloc_cstr("bucket-name");
        let back = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(back, "bucket-name");
        unsafe { free_cstr(ptr) };
    }

    #[test]
    fn unix_conversion_treats_zero_as_unset() {
        assert_eq!(time_to_unix(None), 0);
        assert!(unix_to_time(0).is_none());
        assert!(unix_to_time(-5).is_none());

        let now = unix_to_time(1_700_000_000).unwrap();
        assert_eq!(time_to_unix(Some(now)), 1_700_000_000);
    }
}
