//! Streaming transfer handles for uploads, downloads and part uploads.

use async_trait::async_trait;

use crate::error::Result;
use crate::object::{CustomMetadata, Object, Part};

/// An in-progress object upload.
///
/// Data written here is not visible until `commit` succeeds. After `commit`
/// or `abort`, every further call fails with `UploadAlreadyDone`.
#[async_trait]
pub trait ObjectUpload: Send {
    /// Upload `data` to the object's data stream, returning how many bytes
    /// were consumed.
    async fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Commit the uploaded data.
    async fn commit(&mut self) -> Result<()>;

    /// Abort the upload, discarding buffered data.
    async fn abort(&mut self) -> Result<()>;

    /// Attach custom metadata to the object being uploaded.
    async fn set_custom_metadata(&mut self, metadata: CustomMetadata) -> Result<()>;

    /// Last known information about the object being uploaded.
    fn info(&self) -> Object;
}

/// An in-progress object download.
#[async_trait]
pub trait ObjectDownload: Send {
    /// Read up to `buf.len()` bytes of object data.
    ///
    /// Returns `Err(ClientError::EndOfStream)` once the requested range is
    /// exhausted; partial reads return `Ok(n)` with `n > 0`.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Information about the object being downloaded.
    fn info(&self) -> Object;

    /// Close the download and release its resources.
    async fn close(&mut self) -> Result<()>;
}

/// An in-progress upload of one multipart part.
#[async_trait]
pub trait PartUpload: Send {
    async fn write(&mut self, data: &[u8]) -> Result<usize>;

    async fn commit(&mut self) -> Result<()>;

    async fn abort(&mut self) -> Result<()>;

    /// Set the part's entity tag. Must be called before `commit`.
    fn set_etag(&mut self, etag: &[u8]) -> Result<()>;

    /// Last known information about the part.
    fn info(&self) -> Part;
}
