//! Shared data model for buckets, objects and multipart uploads.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Caller-defined metadata attached to an object.
///
/// Keys and values are arbitrary byte strings; embedded NUL bytes and empty
/// keys or values are all legal. The ordered map keeps iteration in
/// lexicographic key order, which is also the canonical order the boundary
/// encodes entries in, regardless of how the map was populated.
pub type CustomMetadata = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub name: String,
    pub created: Option<DateTime<Utc>>,
}

/// Metadata maintained by the storage system itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemMetadata {
    pub created: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub content_length: i64,
}

#[derive(Debug, Clone, Default)]
pub struct Object {
    pub key: String,
    /// True for collapsed prefix entries produced by non-recursive listings.
    pub is_prefix: bool,
    pub system: SystemMetadata,
    pub custom: CustomMetadata,
}

/// A pending multipart upload, as returned by begin/list operations.
#[derive(Debug, Clone, Default)]
pub struct UploadInfo {
    pub upload_id: String,
    pub key: String,
    pub is_prefix: bool,
    pub system: SystemMetadata,
    pub custom: CustomMetadata,
}

/// A single committed part of a multipart upload.
#[derive(Debug, Clone, Default)]
pub struct Part {
    pub part_number: u32,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Opaque entity tag set by the uploader; arbitrary bytes.
    pub etag: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_metadata_iterates_in_key_order() {
        let mut metadata = CustomMetadata::new();
        metadata.insert(b"zebra".to_vec(), b"1".to_vec());
        metadata.insert(b"".to_vec(), b"2".to_vec());
        metadata.insert(b"alpha".to_vec(), b"3".to_vec());

        let keys: Vec<&[u8]> = metadata.keys().map(|k| k.as_slice()).collect();
        assert_eq!(keys, vec![b"".as_slice(), b"alpha".as_slice(), b"zebra".as_slice()]);
    }
}
