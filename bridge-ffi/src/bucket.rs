//! Bucket operations.

use std::ffi::c_char;
use std::ptr;

use bridge_core::Result;
use client_traits::{Bucket, ClientError};

use crate::alloc::{calloc_one, free_one};
use crate::error::{depot_free_error, malloc_client_error, malloc_error};
use crate::types::{DepotBucket, DepotBucketResult, DepotProject};
use crate::universe::universe;
use crate::util::{free_cstr, malloc_cstr, project_ref, required_str, time_to_unix};

/// Returns information about a bucket.
#[no_mangle]
pub unsafe extern "C" fn depot_stat_bucket(
    project: *mut DepotProject,
    bucket_name: *const c_char,
) -> DepotBucketResult {
    match stat_bucket_impl(project, bucket_name) {
        Ok(bucket) => DepotBucketResult {
            bucket: malloc_bucket(&bucket),
            error: ptr::null_mut(),
        },
        Err(err) => DepotBucketResult {
            bucket: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn stat_bucket_impl(
    project: *mut DepotProject,
    bucket_name: *const c_char,
) -> Result<Bucket> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;
    let child = scope.child();
    Ok(universe
        .runtime()
        .run(&child, client.stat_bucket(bucket_name))?)
}

/// Creates a new bucket.
///
/// When the bucket already exists it returns a valid bucket alongside a
/// non-fatal `DEPOT_ERROR_BUCKET_ALREADY_EXISTS`.
#[no_mangle]
pub unsafe extern "C" fn depot_create_bucket(
    project: *mut DepotProject,
    bucket_name: *const c_char,
) -> DepotBucketResult {
    match create_bucket_impl(project, bucket_name) {
        Ok((bucket, created)) => DepotBucketResult {
            error: if created {
                ptr::null_mut()
            } else {
                malloc_client_error(ClientError::BucketAlreadyExists(bucket.name.clone()))
            },
            bucket: malloc_bucket(&bucket),
        },
        Err(err) => DepotBucketResult {
            bucket: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

/// Creates a new bucket and ignores the error when it already exists.
#[no_mangle]
pub unsafe extern "C" fn depot_ensure_bucket(
    project: *mut DepotProject,
    bucket_name: *const c_char,
) -> DepotBucketResult {
    match create_bucket_impl(project, bucket_name) {
        Ok((bucket, _created)) => DepotBucketResult {
            bucket: malloc_bucket(&bucket),
            error: ptr::null_mut(),
        },
        Err(err) => DepotBucketResult {
            bucket: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn create_bucket_impl(
    project: *mut DepotProject,
    bucket_name: *const c_char,
) -> Result<(Bucket, bool)> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;
    let child = scope.child();
    Ok(universe
        .runtime()
        .run(&child, client.create_bucket(bucket_name))?)
}

/// Deletes a bucket, returning its last known state.
///
/// When the bucket is not empty it returns `DEPOT_ERROR_BUCKET_NOT_EMPTY`.
#[no_mangle]
pub unsafe extern "C" fn depot_delete_bucket(
    project: *mut DepotProject,
    bucket_name: *const c_char,
) -> DepotBucketResult {
    match delete_bucket_impl(project, bucket_name) {
        Ok(bucket) => DepotBucketResult {
            bucket: malloc_bucket(&bucket),
            error: ptr::null_mut(),
        },
        Err(err) => DepotBucketResult {
            bucket: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn delete_bucket_impl(
    project: *mut DepotProject,
    bucket_name: *const c_char,
) -> Result<Bucket> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;
    let child = scope.child();
    Ok(universe
        .runtime()
        .run(&child, client.delete_bucket(bucket_name))?)
}

pub(crate) fn malloc_bucket(bucket: &Bucket) -> *mut DepotBucket {
    let out = calloc_one::<DepotBucket>();
    // SAFETY: freshly allocated, zeroed.
    unsafe {
        (*out).name = malloc_cstr(&bucket.name);
        (*out).created = time_to_unix(bucket.created);
    }
    out
}

/// Frees memory associated with the bucket.
#[no_mangle]
pub unsafe extern "C" fn depot_free_bucket(bucket: *mut DepotBucket) {
    if bucket.is_null() {
        return;
    }
    free_cstr((*bucket).name);
    free_one(bucket);
}

/// Frees a bucket result.
#[no_mangle]
pub unsafe extern "C" fn depot_free_bucket_result(result: DepotBucketResult) {
    depot_free_error(result.error);
    depot_free_bucket(result.bucket);
}
