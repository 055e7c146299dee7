//! Streaming object download.

use std::ffi::c_char;
use std::ptr;

use bridge_core::{BridgeError, DownloadEntry, Entry, Handle, Result};
use client_traits::DownloadOptions;

use crate::alloc::free_one;
use crate::error::{depot_free_error, malloc_error};
use crate::object::object_result;
use crate::types::{
    DepotDownload, DepotDownloadOptions, DepotDownloadResult, DepotError, DepotObjectResult,
    DepotProject, DepotReadResult, HandleStruct,
};
use crate::universe::universe;
use crate::util::{lookup, malloc_handle, project_ref, required_str};

/// Starts a download from the specified key.
#[no_mangle]
pub unsafe extern "C" fn depot_download_object(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    options: *const DepotDownloadOptions,
) -> DepotDownloadResult {
    match download_object_impl(project, bucket_name, object_key, options) {
        Ok(download) => DepotDownloadResult {
            download,
            error: ptr::null_mut(),
        },
        Err(err) => DepotDownloadResult {
            download: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn download_object_impl(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    options: *const DepotDownloadOptions,
) -> Result<*mut DepotDownload> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let object_key = required_str(object_key, "object_key")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;

    let mut opts = DownloadOptions::default();
    if !options.is_null() {
        opts.offset = (*options).offset;
        opts.length = (*options).length;
    }

    let child = scope.child();
    let download = universe.runtime().run(
        &child,
        client.download_object(bucket_name, object_key, opts),
    )?;
    let handle = universe.registry().add(Entry::Download(DownloadEntry {
        scope: child,
        download: std::sync::Mutex::new(download),
    }));
    Ok(malloc_handle(handle.raw()))
}

/// Reads object data into the caller's buffer.
///
/// Exhaustion of the requested range reports zero bytes alongside a
/// non-fatal `DEPOT_ERROR_EOF`; data returned by earlier reads stays valid.
#[no_mangle]
pub unsafe extern "C" fn depot_download_read(
    download: *mut DepotDownload,
    bytes: *mut u8,
    length: usize,
) -> DepotReadResult {
    match download_read_impl(download, bytes, length) {
        Ok(bytes_read) => DepotReadResult {
            bytes_read,
            error: ptr::null_mut(),
        },
        Err(err) => DepotReadResult {
            bytes_read: 0,
            error: malloc_error(&err),
        },
    }
}

unsafe fn download_read_impl(
    download: *mut DepotDownload,
    bytes: *mut u8,
    length: usize,
) -> Result<usize> {
    if bytes.is_null() && length > 0 {
        return Err(BridgeError::NullArgument("bytes"));
    }
    let buf: &mut [u8] = if length == 0 {
        &mut []
    } else {
        std::slice::from_raw_parts_mut(bytes, length)
    };

    let universe = universe()?;
    let entry = lookup(universe, download, "download")?;
    let download_entry = entry
        .as_download()
        .ok_or(BridgeError::InvalidHandle("download"))?;
    let mut guard = download_entry
        .download
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Ok(universe
        .runtime()
        .run(&download_entry.scope, guard.read(buf))?)
}

/// Returns information about the downloaded object.
#[no_mangle]
pub unsafe extern "C" fn depot_download_info(download: *mut DepotDownload) -> DepotObjectResult {
    object_result(download_info_impl(download))
}

unsafe fn download_info_impl(download: *mut DepotDownload) -> Result<client_traits::Object> {
    let universe = universe()?;
    let entry = lookup(universe, download, "download")?;
    let download_entry = entry
        .as_download()
        .ok_or(BridgeError::InvalidHandle("download"))?;
    let guard = download_entry
        .download
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Ok(guard.info())
}

/// Closes the download and releases its handle. Closing twice is a no-op.
#[no_mangle]
pub unsafe extern "C" fn depot_close_download(download: *mut DepotDownload) -> *mut DepotError {
    if download.is_null() {
        return ptr::null_mut();
    }
    let Ok(universe) = universe() else {
        return ptr::null_mut();
    };
    let handle = Handle::from_raw((*download).raw());
    let Some(entry) = universe.registry().get(handle) else {
        return ptr::null_mut();
    };
    let Some(download_entry) = entry.as_download() else {
        return malloc_error(&BridgeError::InvalidHandle("download"));
    };
    if universe.registry().del(handle).is_none() {
        return ptr::null_mut();
    }

    let mut guard = download_entry
        .download
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let result = universe.runtime().run(&download_entry.scope, guard.close());
    drop(guard);
    download_entry.scope.cancel();
    match result {
        Ok(()) => ptr::null_mut(),
        Err(err) => malloc_error(&err.into()),
    }
}

/// Frees a download result. If the download was not closed, its handle is
/// released and its scope canceled, aborting any in-flight read.
#[no_mangle]
pub unsafe extern "C" fn depot_free_download_result(result: DepotDownloadResult) {
    depot_free_error(result.error);
    free_download(result.download);
}

unsafe fn free_download(download: *mut DepotDownload) {
    if download.is_null() {
        return;
    }
    if let Ok(universe) = universe() {
        let handle = Handle::from_raw((*download).raw());
        if let Some(entry) = universe.registry().get(handle) {
            if let Some(download_entry) = entry.as_download() {
                universe.registry().del(handle);
                download_entry.scope.cancel();
            }
        }
    }
    free_one(download);
}
