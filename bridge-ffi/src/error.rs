//! Error codes, classification and the owning `DepotError` descriptor.

use bridge_core::BridgeError;
use client_traits::ClientError;

use crate::alloc::{calloc_one, free_one};
use crate::types::DepotError;
use crate::util::{free_cstr, malloc_cstr};

pub const DEPOT_SUCCESS: u32 = 0;
pub const DEPOT_ERROR_EOF: u32 = 1;
pub const DEPOT_ERROR_INTERNAL: u32 = 2;
pub const DEPOT_ERROR_CANCELED: u32 = 3;
pub const DEPOT_ERROR_INVALID_HANDLE: u32 = 4;
pub const DEPOT_ERROR_INVALID_ARGUMENT: u32 = 5;
pub const DEPOT_ERROR_NULL_ARGUMENT: u32 = 6;
pub const DEPOT_ERROR_RATE_LIMITED: u32 = 7;
pub const DEPOT_ERROR_BANDWIDTH_LIMIT_EXCEEDED: u32 = 8;
pub const DEPOT_ERROR_BUCKET_NAME_INVALID: u32 = 9;
pub const DEPOT_ERROR_BUCKET_ALREADY_EXISTS: u32 = 10;
pub const DEPOT_ERROR_BUCKET_NOT_EMPTY: u32 = 11;
pub const DEPOT_ERROR_BUCKET_NOT_FOUND: u32 = 12;
pub const DEPOT_ERROR_OBJECT_KEY_INVALID: u32 = 13;
pub const DEPOT_ERROR_OBJECT_NOT_FOUND: u32 = 14;
pub const DEPOT_ERROR_UPLOAD_DONE: u32 = 15;

/// Classify an error into its stable numeric code.
///
/// Classification happens exactly once, here, and the order below is part of
/// the observable contract: end-of-stream, canceled, bridge-detected
/// structural errors, the domain sentinels in fixed order, then the internal
/// fallback. A condition that classifies as, say, not-found must keep doing
/// so in every future version.
pub(crate) fn error_code(err: &BridgeError) -> u32 {
    match err {
        BridgeError::Client(client) => match client {
            ClientError::EndOfStream => DEPOT_ERROR_EOF,
            ClientError::Canceled => DEPOT_ERROR_CANCELED,
            ClientError::RateLimited(_) => DEPOT_ERROR_RATE_LIMITED,
            ClientError::BandwidthLimitExceeded(_) => DEPOT_ERROR_BANDWIDTH_LIMIT_EXCEEDED,
            ClientError::BucketNameInvalid(_) => DEPOT_ERROR_BUCKET_NAME_INVALID,
            ClientError::BucketAlreadyExists(_) => DEPOT_ERROR_BUCKET_ALREADY_EXISTS,
            ClientError::BucketNotEmpty(_) => DEPOT_ERROR_BUCKET_NOT_EMPTY,
            ClientError::BucketNotFound(_) => DEPOT_ERROR_BUCKET_NOT_FOUND,
            ClientError::ObjectKeyInvalid(_) => DEPOT_ERROR_OBJECT_KEY_INVALID,
            ClientError::ObjectNotFound(_) => DEPOT_ERROR_OBJECT_NOT_FOUND,
            ClientError::UploadAlreadyDone(_) => DEPOT_ERROR_UPLOAD_DONE,
            ClientError::Internal(_) => DEPOT_ERROR_INTERNAL,
        },
        BridgeError::InvalidHandle(_) => DEPOT_ERROR_INVALID_HANDLE,
        BridgeError::NullArgument(_) => DEPOT_ERROR_NULL_ARGUMENT,
        BridgeError::InvalidArgument(_) => DEPOT_ERROR_INVALID_ARGUMENT,
    }
}

/// Allocate an owning error descriptor. Ownership transfers to the caller;
/// release with `depot_free_error`.
pub(crate) fn malloc_error(err: &BridgeError) -> *mut DepotError {
    let error = calloc_one::<DepotError>();
    // SAFETY: freshly allocated, properly aligned, zeroed.
    unsafe {
        (*error).code = error_code(err);
        (*error).message = malloc_cstr(&err.to_string());
    }
    error
}

pub(crate) fn malloc_client_error(err: ClientError) -> *mut DepotError {
    malloc_error(&BridgeError::Client(err))
}

/// Frees error data. NULL is a no-op.
#[no_mangle]
pub unsafe extern "C" fn depot_free_error(error: *mut DepotError) {
    if error.is_null() {
        return;
    }
    free_cstr((*error).message);
    free_one(error);
}
