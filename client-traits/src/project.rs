//! Project sessions: bucket/object operations and paginated listings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::Result;
use crate::object::{Bucket, CustomMetadata, Object, Part, UploadInfo};
use crate::transfer::{ObjectDownload, ObjectUpload, PartUpload};

/// Lazily produced sequence of listing results.
///
/// Listings surface as streams rather than loaded vectors so the bridge can
/// pull one page at a time under the iterator's cancellation scope. Stream
/// construction itself must not fail; errors surface on first poll.
pub type ListStream<T> = BoxStream<'static, Result<T>>;

#[derive(Debug, Clone, Default)]
pub struct ListBucketsOptions {
    /// Resume listing after this bucket name.
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListObjectsOptions {
    /// Only keys under this prefix are listed.
    pub prefix: Option<String>,
    /// Resume listing after this key.
    pub cursor: Option<String>,
    /// When false, keys below the next `/` are collapsed into prefix entries.
    pub recursive: bool,
    /// Include system metadata in results.
    pub system: bool,
    /// Include custom metadata in results.
    pub custom: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListUploadsOptions {
    pub prefix: Option<String>,
    pub cursor: Option<String>,
    pub recursive: bool,
    pub system: bool,
    pub custom: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListUploadPartsOptions {
    /// Resume listing after this part number.
    pub cursor: u32,
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// When set, the object expires automatically at this time.
    pub expires: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct CommitUploadOptions {
    pub custom_metadata: CustomMetadata,
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Byte offset to start reading from.
    pub offset: i64,
    /// Number of bytes to read; negative reads to the end of the object.
    pub length: i64,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self { offset: 0, length: -1 }
    }
}

/// An open project session.
///
/// All methods may block on the network; the bridge races each call against
/// its scope's cancellation signal, so implementations only need to be
/// honest futures — no internal polling of a cancel flag is required.
#[async_trait]
pub trait ProjectClient: Send + Sync {
    /// Close the session and release its connections. Closing twice is a
    /// no-op.
    async fn close(&self) -> Result<()>;

    async fn stat_bucket(&self, bucket: &str) -> Result<Bucket>;

    /// Create the bucket if missing.
    ///
    /// Returns the bucket and whether this call created it; `false` means it
    /// already existed. The boundary turns the existing case into either a
    /// non-fatal already-exists error (create) or plain success (ensure).
    async fn create_bucket(&self, bucket: &str) -> Result<(Bucket, bool)>;

    /// Delete an empty bucket, returning its last known state.
    async fn delete_bucket(&self, bucket: &str) -> Result<Bucket>;

    fn list_buckets(&self, options: ListBucketsOptions) -> ListStream<Bucket>;

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<Object>;

    /// Delete an object, returning its last known state.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<Object>;

    async fn move_object(
        &self,
        old_bucket: &str,
        old_key: &str,
        new_bucket: &str,
        new_key: &str,
    ) -> Result<()>;

    async fn copy_object(
        &self,
        old_bucket: &str,
        old_key: &str,
        new_bucket: &str,
        new_key: &str,
    ) -> Result<Object>;

    fn list_objects(&self, bucket: &str, options: ListObjectsOptions) -> ListStream<Object>;

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        options: UploadOptions,
    ) -> Result<Box<dyn ObjectUpload>>;

    async fn download_object(
        &self,
        bucket: &str,
        key: &str,
        options: DownloadOptions,
    ) -> Result<Box<dyn ObjectDownload>>;

    /// Begin a multipart upload and return its id.
    async fn begin_upload(&self, bucket: &str, key: &str, options: UploadOptions)
        -> Result<UploadInfo>;

    /// Commit a multipart upload, assembling its parts into an object.
    async fn commit_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        options: CommitUploadOptions,
    ) -> Result<Object>;

    async fn abort_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()>;

    /// Start uploading one part of a multipart upload.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<Box<dyn PartUpload>>;

    fn list_uploads(&self, bucket: &str, options: ListUploadsOptions) -> ListStream<UploadInfo>;

    fn list_upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        options: ListUploadPartsOptions,
    ) -> ListStream<Part>;
}
