//! Streaming object upload.

use std::ffi::c_char;
use std::ptr;

use bridge_core::{BridgeError, Entry, Handle, Result, UploadEntry};
use client_traits::UploadOptions;

use crate::alloc::free_one;
use crate::custommetadata::custom_metadata_from_c;
use crate::error::{depot_free_error, malloc_error};
use crate::object::object_result;
use crate::types::{
    DepotCustomMetadata, DepotError, DepotObjectResult, DepotProject, DepotUpload,
    DepotUploadOptions, DepotUploadResult, DepotWriteResult, HandleStruct,
};
use crate::universe::universe;
use crate::util::{lookup, malloc_handle, project_ref, required_str, unix_to_time};

/// Starts an upload to the specified key.
#[no_mangle]
pub unsafe extern "C" fn depot_upload_object(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    options: *const DepotUploadOptions,
) -> DepotUploadResult {
    match upload_object_impl(project, bucket_name, object_key, options) {
        Ok(upload) => DepotUploadResult {
            upload,
            error: ptr::null_mut(),
        },
        Err(err) => DepotUploadResult {
            upload: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn upload_object_impl(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    options: *const DepotUploadOptions,
) -> Result<*mut DepotUpload> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let object_key = required_str(object_key, "object_key")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;

    let mut opts = UploadOptions::default();
    if !options.is_null() {
        opts.expires = unix_to_time((*options).expires);
    }

    // The upload keeps its own child scope so freeing the handle aborts any
    // in-flight write without touching the rest of the session.
    let child = scope.child();
    let upload = universe
        .runtime()
        .run(&child, client.upload_object(bucket_name, object_key, opts))?;
    let handle = universe.registry().add(Entry::Upload(UploadEntry {
        scope: child,
        upload: std::sync::Mutex::new(upload),
    }));
    Ok(malloc_handle(handle.raw()))
}

/// Uploads bytes to the object's data stream, returning how many were
/// consumed.
#[no_mangle]
pub unsafe extern "C" fn depot_upload_write(
    upload: *mut DepotUpload,
    bytes: *const u8,
    length: usize,
) -> DepotWriteResult {
    match upload_write_impl(upload, bytes, length) {
        Ok(bytes_written) => DepotWriteResult {
            bytes_written,
            error: ptr::null_mut(),
        },
        Err(err) => DepotWriteResult {
            bytes_written: 0,
            error: malloc_error(&err),
        },
    }
}

unsafe fn upload_write_impl(
    upload: *mut DepotUpload,
    bytes: *const u8,
    length: usize,
) -> Result<usize> {
    if bytes.is_null() && length > 0 {
        return Err(BridgeError::NullArgument("bytes"));
    }
    let data: &[u8] = if length == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(bytes, length)
    };

    let universe = universe()?;
    let entry = lookup(universe, upload, "upload")?;
    let upload_entry = entry
        .as_upload()
        .ok_or(BridgeError::InvalidHandle("upload"))?;
    let mut guard = upload_entry
        .upload
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Ok(universe
        .runtime()
        .run(&upload_entry.scope, guard.write(data))?)
}

/// Commits the uploaded data.
#[no_mangle]
pub unsafe extern "C" fn depot_upload_commit(upload: *mut DepotUpload) -> *mut DepotError {
    match upload_call(upload, UploadCall::Commit) {
        Ok(()) => ptr::null_mut(),
        Err(err) => malloc_error(&err),
    }
}

/// Aborts the upload, discarding uploaded data.
#[no_mangle]
pub unsafe extern "C" fn depot_upload_abort(upload: *mut DepotUpload) -> *mut DepotError {
    match upload_call(upload, UploadCall::Abort) {
        Ok(()) => ptr::null_mut(),
        Err(err) => malloc_error(&err),
    }
}

enum UploadCall {
    Commit,
    Abort,
}

unsafe fn upload_call(upload: *mut DepotUpload, call: UploadCall) -> Result<()> {
    let universe = universe()?;
    let entry = lookup(universe, upload, "upload")?;
    let upload_entry = entry
        .as_upload()
        .ok_or(BridgeError::InvalidHandle("upload"))?;
    let mut guard = upload_entry
        .upload
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let result = match call {
        UploadCall::Commit => universe.runtime().run(&upload_entry.scope, guard.commit()),
        UploadCall::Abort => universe.runtime().run(&upload_entry.scope, guard.abort()),
    };
    Ok(result?)
}

/// Attaches custom metadata to the object being uploaded. Must happen
/// before commit.
#[no_mangle]
pub unsafe extern "C" fn depot_upload_set_custom_metadata(
    upload: *mut DepotUpload,
    custom: DepotCustomMetadata,
) -> *mut DepotError {
    match set_custom_metadata_impl(upload, &custom) {
        Ok(()) => ptr::null_mut(),
        Err(err) => malloc_error(&err),
    }
}

unsafe fn set_custom_metadata_impl(
    upload: *mut DepotUpload,
    custom: &DepotCustomMetadata,
) -> Result<()> {
    let metadata = custom_metadata_from_c(custom);
    let universe = universe()?;
    let entry = lookup(universe, upload, "upload")?;
    let upload_entry = entry
        .as_upload()
        .ok_or(BridgeError::InvalidHandle("upload"))?;
    let mut guard = upload_entry
        .upload
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Ok(universe
        .runtime()
        .run(&upload_entry.scope, guard.set_custom_metadata(metadata))?)
}

/// Returns the last information about the uploaded object.
#[no_mangle]
pub unsafe extern "C" fn depot_upload_info(upload: *mut DepotUpload) -> DepotObjectResult {
    object_result(upload_info_impl(upload))
}

unsafe fn upload_info_impl(upload: *mut DepotUpload) -> Result<client_traits::Object> {
    let universe = universe()?;
    let entry = lookup(universe, upload, "upload")?;
    let upload_entry = entry
        .as_upload()
        .ok_or(BridgeError::InvalidHandle("upload"))?;
    let guard = upload_entry
        .upload
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Ok(guard.info())
}

/// Frees an upload result. Releasing the handle cancels the upload's scope,
/// aborting any in-flight write.
#[no_mangle]
pub unsafe extern "C" fn depot_free_upload_result(result: DepotUploadResult) {
    depot_free_error(result.error);
    free_upload(result.upload);
}

unsafe fn free_upload(upload: *mut DepotUpload) {
    if upload.is_null() {
        return;
    }
    if let Ok(universe) = universe() {
        let handle = Handle::from_raw((*upload).raw());
        if let Some(entry) = universe.registry().get(handle) {
            if let Some(upload_entry) = entry.as_upload() {
                universe.registry().del(handle);
                upload_entry.scope.cancel();
            }
        }
    }
    free_one(upload);
}
