//! Bucket listing iterator.

use bridge_core::{Entry, LazyCursor, Result};
use client_traits::{Bucket, ListBucketsOptions};

use crate::bucket::malloc_bucket;
use crate::iterator::iterator_api;
use crate::types::{DepotBucketIterator, DepotListBucketsOptions, DepotProject};
use crate::universe::universe;
use crate::util::{malloc_handle, optional_str, project_ref};

/// Lists buckets.
///
/// Always returns a usable iterator handle: construction-time failures
/// (null/invalid project) surface through `depot_bucket_iterator_err` after
/// the first `next` returns false.
#[no_mangle]
pub unsafe extern "C" fn depot_list_buckets(
    project: *mut DepotProject,
    options: *const DepotListBucketsOptions,
) -> *mut DepotBucketIterator {
    let Ok(universe) = universe() else {
        // No registry to park a cursor in; hand out the never-issued handle
        // 0, which every iterator call reports as invalid.
        return malloc_handle(0);
    };
    let cursor = match list_buckets_cursor(project, options) {
        Ok(cursor) => cursor,
        Err(err) => LazyCursor::failed(err),
    };
    let handle = universe
        .registry()
        .add(Entry::BucketIterator(std::sync::Mutex::new(cursor)));
    malloc_handle(handle.raw())
}

unsafe fn list_buckets_cursor(
    project: *mut DepotProject,
    options: *const DepotListBucketsOptions,
) -> Result<LazyCursor<Bucket>> {
    let universe = universe()?;
    let (scope, client) = project_ref(universe, project)?;

    let mut opts = ListBucketsOptions::default();
    if !options.is_null() {
        opts.cursor = optional_str((*options).cursor);
    }

    let child = scope.child();
    let stream = client.list_buckets(opts);
    Ok(LazyCursor::new(child, stream))
}

iterator_api! {
    iterator: DepotBucketIterator,
    item: crate::types::DepotBucket,
    as_cursor: as_bucket_iterator,
    malloc_item: malloc_bucket,
    kind: "bucket iterator",
    next: depot_bucket_iterator_next,
    err: depot_bucket_iterator_err,
    item_fn: depot_bucket_iterator_item,
    free: depot_free_bucket_iterator,
}
