//! Flat C ABI for the Depot storage client.
//!
//! Foreign callers interact with the managed client exclusively through the
//! `depot_*` functions exported here. The surface follows one uniform
//! protocol:
//!
//! - Handles are one-field structs wrapping an opaque integer issued by the
//!   handle registry — never pointers into managed memory.
//! - Every fallible operation returns either a `*mut DepotError` (void
//!   operations) or a `{payload, error}` result struct. Allocations crossing
//!   outward are zeroed on allocation and owned by the caller until passed to
//!   the matching `depot_free_*` function; every free accepts NULL and
//!   already-freed handles as no-ops.
//! - Input strings are NUL-terminated; output strings are freshly allocated
//!   NUL-terminated buffers. Custom metadata crosses as length-prefixed
//!   entries so embedded NUL bytes survive.
//! - Long-running calls park the calling thread and observe their scope's
//!   cancellation signal, so freeing a session or iterator promptly aborts
//!   any in-flight work started under it.
//!
//! The concrete storage client is injected at startup via [`install_client`];
//! the C surface reports an internal error, never a crash, when none is
//! installed.
//!
//! The matching C declarations live in `include/depot.h`.

#![allow(clippy::missing_safety_doc)]

mod access;
mod alloc;
mod bucket;
mod buckets;
mod custommetadata;
mod download;
mod encryption;
mod error;
mod iterator;
mod multipart;
mod object;
mod objects;
mod project;
mod types;
mod universe;
mod upload;
mod util;

pub use error::{
    depot_free_error, DEPOT_ERROR_BANDWIDTH_LIMIT_EXCEEDED, DEPOT_ERROR_BUCKET_ALREADY_EXISTS,
    DEPOT_ERROR_BUCKET_NAME_INVALID, DEPOT_ERROR_BUCKET_NOT_EMPTY, DEPOT_ERROR_BUCKET_NOT_FOUND,
    DEPOT_ERROR_CANCELED, DEPOT_ERROR_EOF, DEPOT_ERROR_INTERNAL, DEPOT_ERROR_INVALID_ARGUMENT,
    DEPOT_ERROR_INVALID_HANDLE, DEPOT_ERROR_NULL_ARGUMENT, DEPOT_ERROR_OBJECT_KEY_INVALID,
    DEPOT_ERROR_OBJECT_NOT_FOUND, DEPOT_ERROR_RATE_LIMITED, DEPOT_ERROR_UPLOAD_DONE,
    DEPOT_SUCCESS,
};
pub use types::*;
pub use universe::{depot_internal_universe_is_empty, install_client, Universe};

pub use access::*;
pub use bucket::*;
pub use buckets::*;
pub use custommetadata::*;
pub use download::*;
pub use encryption::*;
pub use multipart::*;
pub use object::*;
pub use objects::*;
pub use project::*;
pub use upload::*;
