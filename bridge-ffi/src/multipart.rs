//! Multipart uploads: begin/commit/abort, part streaming and the upload and
//! part listing iterators.

use std::ffi::c_char;
use std::ptr;

use bridge_core::{BridgeError, Entry, Handle, LazyCursor, PartUploadEntry, Result};
use client_traits::{
    CommitUploadOptions, ListUploadPartsOptions, ListUploadsOptions, Part, UploadInfo,
    UploadOptions,
};

use crate::alloc::{calloc_one, free_bytes_nul, free_one, malloc_bytes_nul};
use crate::custommetadata::{
    custom_metadata_from_c, custom_metadata_to_c, depot_free_custom_metadata_data,
};
use crate::error::{depot_free_error, malloc_error};
use crate::iterator::iterator_api;
use crate::object::malloc_object;
use crate::types::{
    DepotCommitUploadOptions, DepotCommitUploadResult, DepotError, DepotListUploadPartsOptions,
    DepotListUploadsOptions, DepotPart, DepotPartIterator, DepotPartResult, DepotPartUpload,
    DepotPartUploadResult, DepotProject, DepotSystemMetadata, DepotUploadInfo,
    DepotUploadInfoResult, DepotUploadIterator, DepotUploadOptions, DepotWriteResult,
    HandleStruct,
};
use crate::universe::universe;
use crate::util::{
    free_cstr, lookup, malloc_cstr, malloc_handle, optional_str, project_ref, required_str,
    time_to_unix, unix_to_time,
};

/// Begins a new multipart upload to a bucket and key.
#[no_mangle]
pub unsafe extern "C" fn depot_begin_upload(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    options: *const DepotUploadOptions,
) -> DepotUploadInfoResult {
    match begin_upload_impl(project, bucket_name, object_key, options) {
        Ok(info) => DepotUploadInfoResult {
            info: malloc_upload_info(&info),
            error: ptr::null_mut(),
        },
        Err(err) => DepotUploadInfoResult {
            info: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn begin_upload_impl(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    options: *const DepotUploadOptions,
) -> Result<UploadInfo> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let object_key = required_str(object_key, "object_key")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;

    let mut opts = UploadOptions::default();
    if !options.is_null() {
        opts.expires = unix_to_time((*options).expires);
    }

    let child = scope.child();
    Ok(universe
        .runtime()
        .run(&child, client.begin_upload(bucket_name, object_key, opts))?)
}

/// Commits a multipart upload started with `depot_begin_upload`, assembling
/// its parts into an object.
#[no_mangle]
pub unsafe extern "C" fn depot_commit_upload(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    upload_id: *const c_char,
    options: *const DepotCommitUploadOptions,
) -> DepotCommitUploadResult {
    match commit_upload_impl(project, bucket_name, object_key, upload_id, options) {
        Ok(object) => DepotCommitUploadResult {
            object: malloc_object(&object),
            error: ptr::null_mut(),
        },
        Err(err) => DepotCommitUploadResult {
            object: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn commit_upload_impl(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    upload_id: *const c_char,
    options: *const DepotCommitUploadOptions,
) -> Result<client_traits::Object> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let object_key = required_str(object_key, "object_key")?;
    let upload_id = required_str(upload_id, "upload_id")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;

    let mut opts = CommitUploadOptions::default();
    if !options.is_null() {
        opts.custom_metadata = custom_metadata_from_c(&(*options).custom_metadata);
    }

    let child = scope.child();
    Ok(universe.runtime().run(
        &child,
        client.commit_upload(bucket_name, object_key, upload_id, opts),
    )?)
}

/// Aborts a multipart upload started with `depot_begin_upload`.
#[no_mangle]
pub unsafe extern "C" fn depot_abort_upload(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    upload_id: *const c_char,
) -> *mut DepotError {
    match abort_upload_impl(project, bucket_name, object_key, upload_id) {
        Ok(()) => ptr::null_mut(),
        Err(err) => malloc_error(&err),
    }
}

unsafe fn abort_upload_impl(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    upload_id: *const c_char,
) -> Result<()> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let object_key = required_str(object_key, "object_key")?;
    let upload_id = required_str(upload_id, "upload_id")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;
    let child = scope.child();
    Ok(universe.runtime().run(
        &child,
        client.abort_upload(bucket_name, object_key, upload_id),
    )?)
}

/// Starts an upload of one part to the specified key and part number.
#[no_mangle]
pub unsafe extern "C" fn depot_upload_part(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    upload_id: *const c_char,
    part_number: u32,
) -> DepotPartUploadResult {
    match upload_part_impl(project, bucket_name, object_key, upload_id, part_number) {
        Ok(part_upload) => DepotPartUploadResult {
            part_upload,
            error: ptr::null_mut(),
        },
        Err(err) => DepotPartUploadResult {
            part_upload: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn upload_part_impl(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    upload_id: *const c_char,
    part_number: u32,
) -> Result<*mut DepotPartUpload> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let object_key = required_str(object_key, "object_key")?;
    let upload_id = required_str(upload_id, "upload_id")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;

    let child = scope.child();
    let part_upload = universe.runtime().run(
        &child,
        client.upload_part(bucket_name, object_key, upload_id, part_number),
    )?;
    let handle = universe.registry().add(Entry::PartUpload(PartUploadEntry {
        scope: child,
        part_upload: std::sync::Mutex::new(part_upload),
    }));
    Ok(malloc_handle(handle.raw()))
}

/// Uploads bytes to the part's data stream.
#[no_mangle]
pub unsafe extern "C" fn depot_part_upload_write(
    upload: *mut DepotPartUpload,
    bytes: *const u8,
    length: usize,
) -> DepotWriteResult {
    match part_upload_write_impl(upload, bytes, length) {
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

unsafe fn part_upload_write_impl(
    upload: *mut DepotPartUpload,
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
    let entry = lookup(universe, upload, "part_upload")?;
    let part_entry = entry
        .as_part_upload()
        .ok_or(BridgeError::InvalidHandle("part upload"))?;
    let mut guard = part_entry
        .part_upload
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Ok(universe.runtime().run(&part_entry.scope, guard.write(data))?)
}

/// Commits the uploaded part data.
#[no_mangle]
pub unsafe extern "C" fn depot_part_upload_commit(upload: *mut DepotPartUpload) -> *mut DepotError {
    match part_upload_call(upload, PartCall::Commit) {
        Ok(()) => ptr::null_mut(),
        Err(err) => malloc_error(&err),
    }
}

/// Aborts the part upload.
#[no_mangle]
pub unsafe extern "C" fn depot_part_upload_abort(upload: *mut DepotPartUpload) -> *mut DepotError {
    match part_upload_call(upload, PartCall::Abort) {
        Ok(()) => ptr::null_mut(),
        Err(err) => malloc_error(&err),
    }
}

enum PartCall {
    Commit,
    Abort,
}

unsafe fn part_upload_call(upload: *mut DepotPartUpload, call: PartCall) -> Result<()> {
    let universe = universe()?;
    let entry = lookup(universe, upload, "part_upload")?;
    let part_entry = entry
        .as_part_upload()
        .ok_or(BridgeError::InvalidHandle("part upload"))?;
    let mut guard = part_entry
        .part_upload
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let result = match call {
        PartCall::Commit => universe.runtime().run(&part_entry.scope, guard.commit()),
        PartCall::Abort => universe.runtime().run(&part_entry.scope, guard.abort()),
    };
    Ok(result?)
}

/// Sets the part's entity tag. Must be called before committing the part.
#[no_mangle]
pub unsafe extern "C" fn depot_part_upload_set_etag(
    upload: *mut DepotPartUpload,
    etag: *const c_char,
) -> *mut DepotError {
    match part_upload_set_etag_impl(upload, etag) {
        Ok(()) => ptr::null_mut(),
        Err(err) => malloc_error(&err),
    }
}

unsafe fn part_upload_set_etag_impl(
    upload: *mut DepotPartUpload,
    etag: *const c_char,
) -> Result<()> {
    let etag = required_str(etag, "etag")?;
    let universe = universe()?;
    let entry = lookup(universe, upload, "part_upload")?;
    let part_entry = entry
        .as_part_upload()
        .ok_or(BridgeError::InvalidHandle("part upload"))?;
    let mut guard = part_entry
        .part_upload
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Ok(guard.set_etag(etag.as_bytes())?)
}

/// Returns the last information about the uploaded part.
#[no_mangle]
pub unsafe extern "C" fn depot_part_upload_info(upload: *mut DepotPartUpload) -> DepotPartResult {
    match part_upload_info_impl(upload) {
        Ok(part) => DepotPartResult {
            part: malloc_part(&part),
            error: ptr::null_mut(),
        },
        Err(err) => DepotPartResult {
            part: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn part_upload_info_impl(upload: *mut DepotPartUpload) -> Result<Part> {
    let universe = universe()?;
    let entry = lookup(universe, upload, "part_upload")?;
    let part_entry = entry
        .as_part_upload()
        .ok_or(BridgeError::InvalidHandle("part upload"))?;
    let guard = part_entry
        .part_upload
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Ok(guard.info())
}

/// Lists pending multipart uploads in a bucket.
///
/// Always returns a usable iterator handle; construction-time failures
/// surface through `depot_upload_iterator_err`.
#[no_mangle]
pub unsafe extern "C" fn depot_list_uploads(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    options: *const DepotListUploadsOptions,
) -> *mut DepotUploadIterator {
    let Ok(universe) = universe() else {
        return malloc_handle(0);
    };
    let cursor = match list_uploads_cursor(project, bucket_name, options) {
        Ok(cursor) => cursor,
        Err(err) => LazyCursor::failed(err),
    };
    let handle = universe
        .registry()
        .add(Entry::UploadIterator(std::sync::Mutex::new(cursor)));
    malloc_handle(handle.raw())
}

unsafe fn list_uploads_cursor(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    options: *const DepotListUploadsOptions,
) -> Result<LazyCursor<UploadInfo>> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;

    let mut opts = ListUploadsOptions::default();
    if !options.is_null() {
        opts.prefix = optional_str((*options).prefix);
        opts.cursor = optional_str((*options).cursor);
        opts.recursive = (*options).recursive;
        opts.system = (*options).system;
        opts.custom = (*options).custom;
    }

    let child = scope.child();
    let stream = client.list_uploads(bucket_name, opts);
    Ok(LazyCursor::new(child, stream))
}

iterator_api! {
    iterator: DepotUploadIterator,
    item: DepotUploadInfo,
    as_cursor: as_upload_iterator,
    malloc_item: malloc_upload_info,
    kind: "upload iterator",
    next: depot_upload_iterator_next,
    err: depot_upload_iterator_err,
    item_fn: depot_upload_iterator_item,
    free: depot_free_upload_iterator,
}

/// Lists the committed parts of a multipart upload.
///
/// Always returns a usable iterator handle; construction-time failures
/// surface through `depot_part_iterator_err`.
#[no_mangle]
pub unsafe extern "C" fn depot_list_upload_parts(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    upload_id: *const c_char,
    options: *const DepotListUploadPartsOptions,
) -> *mut DepotPartIterator {
    let Ok(universe) = universe() else {
        return malloc_handle(0);
    };
    let cursor = match list_upload_parts_cursor(project, bucket_name, object_key, upload_id, options)
    {
        Ok(cursor) => cursor,
        Err(err) => LazyCursor::failed(err),
    };
    let handle = universe
        .registry()
        .add(Entry::PartIterator(std::sync::Mutex::new(cursor)));
    malloc_handle(handle.raw())
}

unsafe fn list_upload_parts_cursor(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
    upload_id: *const c_char,
    options: *const DepotListUploadPartsOptions,
) -> Result<LazyCursor<Part>> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let object_key = required_str(object_key, "object_key")?;
    let upload_id = required_str(upload_id, "upload_id")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;

    let mut opts = ListUploadPartsOptions::default();
    if !options.is_null() {
        opts.cursor = (*options).cursor;
    }

    let child = scope.child();
    let stream = client.list_upload_parts(bucket_name, object_key, upload_id, opts);
    Ok(LazyCursor::new(child, stream))
}

iterator_api! {
    iterator: DepotPartIterator,
    item: DepotPart,
    as_cursor: as_part_iterator,
    malloc_item: malloc_part,
    kind: "part iterator",
    next: depot_part_iterator_next,
    err: depot_part_iterator_err,
    item_fn: depot_part_iterator_item,
    free: depot_free_part_iterator,
}

pub(crate) fn malloc_upload_info(info: &UploadInfo) -> *mut DepotUploadInfo {
    let out = calloc_one::<DepotUploadInfo>();
    // SAFETY: freshly allocated, zeroed.
    unsafe {
        (*out).upload_id = malloc_cstr(&info.upload_id);
        (*out).key = malloc_cstr(&info.key);
        (*out).is_prefix = info.is_prefix;
        (*out).system = DepotSystemMetadata {
            created: time_to_unix(info.system.created),
            expires: time_to_unix(info.system.expires),
            content_length: info.system.content_length,
        };
        (*out).custom = custom_metadata_to_c(&info.custom);
    }
    out
}

/// Frees memory associated with upload info.
#[no_mangle]
pub unsafe extern "C" fn depot_free_upload_info(info: *mut DepotUploadInfo) {
    if info.is_null() {
        return;
    }
    free_cstr((*info).upload_id);
    (*info).upload_id = ptr::null_mut();
    free_cstr((*info).key);
    (*info).key = ptr::null_mut();
    depot_free_custom_metadata_data(&mut (*info).custom);
    free_one(info);
}

/// Frees an upload-info result.
#[no_mangle]
pub unsafe extern "C" fn depot_free_upload_info_result(result: DepotUploadInfoResult) {
    depot_free_error(result.error);
    depot_free_upload_info(result.info);
}

/// Frees a commit-upload result.
#[no_mangle]
pub unsafe extern "C" fn depot_free_commit_upload_result(result: DepotCommitUploadResult) {
    depot_free_error(result.error);
    crate::object::depot_free_object(result.object);
}

pub(crate) fn malloc_part(part: &Part) -> *mut DepotPart {
    let out = calloc_one::<DepotPart>();
    // SAFETY: freshly allocated, zeroed.
    unsafe {
        (*out).part_number = part.part_number;
        (*out).size = part.size;
        (*out).modified = time_to_unix(part.modified);
        (*out).etag = malloc_bytes_nul(&part.etag);
        (*out).etag_length = part.etag.len() as u64;
    }
    out
}

/// Frees memory associated with a part.
#[no_mangle]
pub unsafe extern "C" fn depot_free_part(part: *mut DepotPart) {
    if part.is_null() {
        return;
    }
    free_bytes_nul((*part).etag, (*part).etag_length);
    (*part).etag = ptr::null_mut();
    free_one(part);
}

/// Frees a part result.
#[no_mangle]
pub unsafe extern "C" fn depot_free_part_result(result: DepotPartResult) {
    depot_free_error(result.error);
    depot_free_part(result.part);
}

/// Frees a part-upload result. Releasing the handle cancels the part's
/// scope, aborting any in-flight write.
#[no_mangle]
pub unsafe extern "C" fn depot_free_part_upload_result(result: DepotPartUploadResult) {
    depot_free_error(result.error);
    free_part_upload(result.part_upload);
}

unsafe fn free_part_upload(part_upload: *mut DepotPartUpload) {
    if part_upload.is_null() {
        return;
    }
    if let Ok(universe) = universe() {
        let handle = Handle::from_raw((*part_upload).raw());
        if let Some(entry) = universe.registry().get(handle) {
            if let Some(part_entry) = entry.as_part_upload() {
                universe.registry().del(handle);
                part_entry.scope.cancel();
            }
        }
    }
    free_one(part_upload);
}
