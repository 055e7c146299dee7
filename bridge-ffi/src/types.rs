//! `#[repr(C)]` mirror of `include/depot.h`.
//!
//! Handle structs carry only the registry integer. Payload structs own their
//! heap fields until handed to the matching `depot_free_*` function.

use std::ffi::c_char;

/// One-field handle structs. The integer is meaningless outside the registry
/// that issued it; zero is never a live handle.
pub(crate) trait HandleStruct: Copy {
    fn new(raw: usize) -> Self;
    fn raw(self) -> usize;
}

macro_rules! handle_struct {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            pub _handle: usize,
        }

        impl HandleStruct for $name {
            fn new(raw: usize) -> Self {
                Self { _handle: raw }
            }

            fn raw(self) -> usize {
                self._handle
            }
        }
    };
}

handle_struct!(
    /// A parsed access grant.
    DepotAccess
);
handle_struct!(
    /// An open project session; owns the root cancellation scope.
    DepotProject
);
handle_struct!(DepotUpload);
handle_struct!(DepotDownload);
handle_struct!(DepotPartUpload);
handle_struct!(DepotBucketIterator);
handle_struct!(DepotObjectIterator);
handle_struct!(DepotUploadIterator);
handle_struct!(DepotPartIterator);
handle_struct!(DepotEncryptionKey);

/// Dialing/session configuration. All fields are optional; NULL/zero means
/// the client default.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DepotConfig {
    pub user_agent: *const c_char,
    pub dial_timeout_milliseconds: i32,
    /// Directory for buffering uploads; NULL buffers in memory.
    pub temp_directory: *const c_char,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            user_agent: std::ptr::null(),
            dial_timeout_milliseconds: 0,
            temp_directory: std::ptr::null(),
        }
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotError {
    pub code: u32,
    pub message: *mut c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotBucket {
    pub name: *mut c_char,
    /// Unix seconds; zero when unknown.
    pub created: i64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DepotSystemMetadata {
    pub created: i64,
    pub expires: i64,
    pub content_length: i64,
}

/// One custom-metadata entry. Keys and values are length-prefixed byte
/// buffers (with a trailing NUL for convenience) so embedded NULs survive.
#[repr(C)]
#[derive(Debug)]
pub struct DepotCustomMetadataEntry {
    pub key: *mut c_char,
    pub key_length: u64,
    pub value: *mut c_char,
    pub value_length: u64,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotCustomMetadata {
    pub entries: *mut DepotCustomMetadataEntry,
    pub count: u64,
}

impl Default for DepotCustomMetadata {
    fn default() -> Self {
        Self {
            entries: std::ptr::null_mut(),
            count: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotObject {
    pub key: *mut c_char,
    pub is_prefix: bool,
    pub system: DepotSystemMetadata,
    pub custom: DepotCustomMetadata,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotUploadInfo {
    pub upload_id: *mut c_char,
    pub key: *mut c_char,
    pub is_prefix: bool,
    pub system: DepotSystemMetadata,
    pub custom: DepotCustomMetadata,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotPart {
    pub part_number: u32,
    pub size: u64,
    /// Unix seconds; zero when unknown.
    pub modified: i64,
    pub etag: *mut c_char,
    pub etag_length: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DepotListBucketsOptions {
    pub cursor: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DepotListObjectsOptions {
    pub prefix: *const c_char,
    pub cursor: *const c_char,
    pub recursive: bool,
    pub system: bool,
    pub custom: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DepotListUploadsOptions {
    pub prefix: *const c_char,
    pub cursor: *const c_char,
    pub recursive: bool,
    pub system: bool,
    pub custom: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DepotListUploadPartsOptions {
    /// Resume listing after this part number.
    pub cursor: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DepotUploadOptions {
    /// Unix seconds; zero or negative means the object never expires.
    pub expires: i64,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotCommitUploadOptions {
    pub custom_metadata: DepotCustomMetadata,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DepotDownloadOptions {
    pub offset: i64,
    /// Negative reads to the end of the object.
    pub length: i64,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotAccessResult {
    pub access: *mut DepotAccess,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotProjectResult {
    pub project: *mut DepotProject,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotBucketResult {
    pub bucket: *mut DepotBucket,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotObjectResult {
    pub object: *mut DepotObject,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotUploadResult {
    pub upload: *mut DepotUpload,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotDownloadResult {
    pub download: *mut DepotDownload,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotPartUploadResult {
    pub part_upload: *mut DepotPartUpload,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotUploadInfoResult {
    pub info: *mut DepotUploadInfo,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotCommitUploadResult {
    pub object: *mut DepotObject,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotPartResult {
    pub part: *mut DepotPart,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotStringResult {
    pub string: *mut c_char,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotEncryptionKeyResult {
    pub encryption_key: *mut DepotEncryptionKey,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotWriteResult {
    pub bytes_written: usize,
    pub error: *mut DepotError,
}

#[repr(C)]
#[derive(Debug)]
pub struct DepotReadResult {
    pub bytes_read: usize,
    pub error: *mut DepotError,
}
