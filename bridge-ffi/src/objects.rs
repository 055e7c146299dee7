//! Object listing iterator.

use std::ffi::c_char;

use bridge_core::{Entry, LazyCursor, Result};
use client_traits::{ListObjectsOptions, Object};

use crate::iterator::iterator_api;
use crate::object::malloc_object;
use crate::types::{DepotListObjectsOptions, DepotObjectIterator, DepotProject};
use crate::universe::universe;
use crate::util::{malloc_handle, optional_str, project_ref, required_str};

/// Lists objects in a bucket.
///
/// Always returns a usable iterator handle: construction-time failures
/// (null project, null bucket name, invalid handle) surface through
/// `depot_object_iterator_err` after the first `next` returns false.
#[no_mangle]
pub unsafe extern "C" fn depot_list_objects(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    options: *const DepotListObjectsOptions,
) -> *mut DepotObjectIterator {
    let Ok(universe) = universe() else {
        return malloc_handle(0);
    };
    let cursor = match list_objects_cursor(project, bucket_name, options) {
        Ok(cursor) => cursor,
        Err(err) => LazyCursor::failed(err),
    };
    let handle = universe
        .registry()
        .add(Entry::ObjectIterator(std::sync::Mutex::new(cursor)));
    malloc_handle(handle.raw())
}

unsafe fn list_objects_cursor(
    project: *mut DepotProject,
    bucket_name: *const c_char,
    options: *const DepotListObjectsOptions,
) -> Result<LazyCursor<Object>> {
    let bucket_name = required_str(bucket_name, "bucket_name")?;
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;

    let mut opts = ListObjectsOptions::default();
    if !options.is_null() {
        opts.prefix = optional_str((*options).prefix);
        opts.cursor = optional_str((*options).cursor);
        opts.recursive = (*options).recursive;
        opts.system = (*options).system;
        opts.custom = (*options).custom;
    }

    let child = scope.child();
    let stream = client.list_objects(bucket_name, opts);
    Ok(LazyCursor::new(child, stream))
}

iterator_api! {
    iterator: DepotObjectIterator,
    item: crate::types::DepotObject,
    as_cursor: as_object_iterator,
    malloc_item: malloc_object,
    kind: "object iterator",
    next: depot_object_iterator_next,
    err: depot_object_iterator_err,
    item_fn: depot_object_iterator_item,
    free: depot_free_object_iterator,
}
