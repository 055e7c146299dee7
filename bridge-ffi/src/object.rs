//! Object operations: stat, delete, move, copy and marshaling.

use std::ffi::c_char;
use std::ptr;

use bridge_core::Result;
use client_traits::Object;

use crate::alloc::{calloc_one, free_one};
use crate::custommetadata::{custom_metadata_to_c, depot_free_custom_metadata_data};
use crate::error::{depot_free_error, malloc_error};
use crate::types::{
    DepotError, DepotObject, DepotObjectResult, DepotProject, DepotSystemMetadata,
};
use crate::universe::universe;
use crate::util::{free_cstr, malloc_cstr, project_ref, required_str, time_to_unix};

/// Returns information about an object at the specific key.
#[no_mangle]
pub unsafe extern "C" fn depot_stat_object(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
) -> DepotObjectResult {
    object_result(stat_object_impl(project, bucket_name, object_key))
}

unsafe fn stat_object_impl(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
) -> Result<Object> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let object_key = required_str(object_key, "object_key")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;
    let child = scope.child();
    Ok(universe
        .runtime()
        .run(&child, client.stat_object(bucket_name, object_key))?)
}

/// Deletes an object, returning its last known state.
#[no_mangle]
pub unsafe extern "C" fn depot_delete_object(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
) -> DepotObjectResult {
    object_result(delete_object_impl(project, bucket_name, object_key))
}

unsafe fn delete_object_impl(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    object_key: *const c_char,
) -> Result<Object> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let object_key = required_str(object_key, "object_key")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;
    let child = scope.child();
    Ok(universe
        .runtime()
        .run(&child, client.delete_object(bucket_name, object_key))?)
}

/// Moves an object to a different bucket and/or key.
#[no_mangle]
pub unsafe extern "C" fn depot_move_object(
    project: *mut DepotProject,
    old_bucket_name: *const c_char,
    old_object_key: *const c_char,
    new_bucket_name: *const c_char,
    new_object_key: *const c_char,
) -> *mut DepotError {
    match move_object_impl(
        project,
        old_bucket_name,
        old_object_key,
        new_bucket_name,
        new_object_key,
    ) {
        Ok(()) => ptr::null_mut(),
        Err(err) => malloc_error(&err),
    }
}

unsafe fn move_object_impl(
    project: *mut DepotProject,
    old_bucket_name: *const c_char,
    old_object_key: *const c_char,
    new_bucket_name: *const c_char,
    new_object_key: *const c_char,
) -> Result<()> {
    let old_bucket_name = required_str(old_bucket_name, "old_bucket_name")?;
    let old_object_key = required_str(old_object_key, "old_object_key")?;
    let new_bucket_name = required_str(new_bucket_name, "new_bucket_name")?;
    let new_object_key = required_str(new_object_key, "new_object_key")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;
    let child = scope.child();
    Ok(universe.runtime().run(
        &child,
        client.move_object(
            old_bucket_name,
            old_object_key,
            new_bucket_name,
            new_object_key,
        ),
    )?)
}

/// Copies an object to the same or a different bucket and key.
#[no_mangle]
pub unsafe extern "C" fn depot_copy_object(
    project: *mut DepotProject,
    old_bucket_name: *const c_char,
    old_object_key: *const c_char,
    new_bucket_name: *const c_char,
    new_object_key: *const c_char,
) -> DepotObjectResult {
    object_result(copy_object_impl(
        project,
        old_bucket_name,
        old_object_key,
        new_bucket_name,
        new_object_key,
    ))
}

unsafe fn copy_object_impl(
    project: *mut DepotProject,
    old_bucket_name: *const c_char,
    old_object_key: *const c_char,
    new_bucket_name: *const c_char,
    new_object_key: *const c_char,
) -> Result<Object> {
    let old_bucket_name = required_str(old_bucket_name, "old_bucket_name")?;
    let old_object_key = required_str(old_object_key, "old_object_key")?;
    let new_bucket_name = required_str(new_bucket_name, "new_bucket_name")?;
    let new_object_key = required_str(new_object_key, "new_object_key")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;
    let child = scope.child();
    Ok(universe.runtime().run(
        &child,
        client.copy_object(
            old_bucket_name,
            old_object_key,
            new_bucket_name,
            new_object_key,
        ),
    )?)
}

pub(crate) fn object_result(result: Result<Object>) -> DepotObjectResult {
    match result {
        Ok(object) => DepotObjectResult {
            object: malloc_object(&object),
            error: ptr::null_mut(),
        },
        Err(err) => DepotObjectResult {
            object: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

pub(crate) fn system_metadata_to_c(object: &Object) -> DepotSystemMetadata {
    DepotSystemMetadata {
        created: time_to_unix(object.system.created),
        expires: time_to_unix(object.system.expires),
        content_length: object.system.content_length,
    }
}

pub(crate) fn malloc_object(object: &Object) -> *mut DepotObject {
    let out = calloc_one::<DepotObject>();
    // SAFETY: freshly allocated, zeroed.
    unsafe {
        (*out).key = malloc_cstr(&object.key);
        (*out).is_prefix = object.is_prefix;
        (*out).system = system_metadata_to_c(object);
        (*out).custom = custom_metadata_to_c(&object.custom);
    }
    out
}

/// Frees memory associated with the object.
#[no_mangle]
pub unsafe extern "C" fn depot_free_object(object: *mut DepotObject) {
    if object.is_null() {
        return;
    }
    free_cstr((*object).key);
    (*object).key = ptr::null_mut();
    depot_free_custom_metadata_data(&mut (*object).custom);
    free_one(object);
}

/// Frees an object result.
#[no_mangle]
pub unsafe extern "C" fn depot_free_object_result(result: DepotObjectResult) {
    depot_free_error(result.error);
    depot_free_object(result.object);
}
