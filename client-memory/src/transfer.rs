//! Streaming transfer implementations over the in-memory store.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use client_traits::{
    ClientError, CustomMetadata, Object, ObjectDownload, ObjectUpload, Part, PartUpload, Result,
    SystemMetadata,
};

use crate::project::{StoredObject, StoredPart, Store};

/// Buffered upload; data becomes visible atomically on commit.
pub(crate) struct MemoryUpload {
    store: Arc<RwLock<Store>>,
    bucket: String,
    key: String,
    expires: Option<DateTime<Utc>>,
    started: DateTime<Utc>,
    buffer: BytesMut,
    custom: CustomMetadata,
    done: bool,
}

impl MemoryUpload {
    pub(crate) fn new(
        store: Arc<RwLock<Store>>,
        bucket: String,
        key: String,
        expires: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            store,
            bucket,
            key,
            expires,
            started: Utc::now(),
            buffer: BytesMut::new(),
            custom: CustomMetadata::new(),
            done: false,
        }
    }

    fn check_active(&self) -> Result<()> {
        if self.done {
            return Err(ClientError::UploadAlreadyDone(self.key.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectUpload for MemoryUpload {
    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.check_active()?;
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }

    async fn commit(&mut self) -> Result<()> {
        self.check_active()?;
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        let state = store
            .buckets
            .get_mut(&self.bucket)
            .ok_or_else(|| ClientError::BucketNotFound(self.bucket.clone()))?;

        let data = std::mem::take(&mut self.buffer).freeze();
        state.objects.insert(
            self.key.clone(),
            StoredObject {
                system: SystemMetadata {
                    created: Some(Utc::now()),
                    expires: self.expires,
                    content_length: data.len() as i64,
                },
                custom: std::mem::take(&mut self.custom),
                data,
            },
        );
        self.done = true;
        debug!(bucket = %self.bucket, key = %self.key, "committed upload");
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.check_active()?;
        self.done = true;
        self.buffer.clear();
        debug!(bucket = %self.bucket, key = %self.key, "aborted upload");
        Ok(())
    }

    async fn set_custom_metadata(&mut self, metadata: CustomMetadata) -> Result<()> {
        self.check_active()?;
        self.custom = metadata;
        Ok(())
    }

    fn info(&self) -> Object {
        Object {
            key: self.key.clone(),
            is_prefix: false,
            system: SystemMetadata {
                created: Some(self.started),
                expires: self.expires,
                content_length: self.buffer.len() as i64,
            },
            custom: self.custom.clone(),
        }
    }
}

/// Download over a snapshot of the object data.
pub(crate) struct MemoryDownload {
    data: Bytes,
    pos: usize,
    object: Object,
}

impl MemoryDownload {
    pub(crate) fn new(data: Bytes, object: Object) -> Self {
        Self {
            data,
            pos: 0,
            object,
        }
    }
}

#[async_trait]
impl ObjectDownload for MemoryDownload {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pos >= self.data.len() {
            return Err(ClientError::EndOfStream);
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn info(&self) -> Object {
        self.object.clone()
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Buffered part upload; the part registers with its multipart session on
/// commit.
pub(crate) struct MemoryPartUpload {
    store: Arc<RwLock<Store>>,
    upload_id: String,
    part_number: u32,
    started: DateTime<Utc>,
    buffer: BytesMut,
    etag: Vec<u8>,
    done: bool,
}

impl MemoryPartUpload {
    pub(crate) fn new(store: Arc<RwLock<Store>>, upload_id: String, part_number: u32) -> Self {
        Self {
            store,
            upload_id,
            part_number,
            started: Utc::now(),
            buffer: BytesMut::new(),
            etag: Vec::new(),
            done: false,
        }
    }

    fn check_active(&self) -> Result<()> {
        if self.done {
            return Err(ClientError::UploadAlreadyDone(self.upload_id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl PartUpload for MemoryPartUpload {
    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.check_active()?;
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }

    async fn commit(&mut self) -> Result<()> {
        self.check_active()?;
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        let upload = store.uploads.get_mut(&self.upload_id).ok_or_else(|| {
            ClientError::Internal(format!("unknown upload id: {:?}", self.upload_id))
        })?;
        if upload.done {
            return Err(ClientError::UploadAlreadyDone(upload.key.clone()));
        }
        upload.parts.insert(
            self.part_number,
            StoredPart {
                data: std::mem::take(&mut self.buffer).freeze(),
                etag: std::mem::take(&mut self.etag),
                modified: Utc::now(),
            },
        );
        self.done = true;
        debug!(
            upload_id = %self.upload_id,
            part_number = self.part_number,
            "committed part"
        );
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.check_active()?;
        self.done = true;
        self.buffer.clear();
        Ok(())
    }

    fn set_etag(&mut self, etag: &[u8]) -> Result<()> {
        self.check_active()?;
        self.etag = etag.to_vec();
        Ok(())
    }

    fn info(&self) -> Part {
        Part {
            part_number: self.part_number,
            size: self.buffer.len() as u64,
            modified: Some(self.started),
            etag: self.etag.clone(),
        }
    }
}
