//! Project sessions over the shared in-memory store.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream;
use futures::StreamExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use client_traits::{
    Bucket, ClientError, CommitUploadOptions, CustomMetadata, DownloadOptions, ListBucketsOptions,
    ListObjectsOptions, ListStream, ListUploadPartsOptions, ListUploadsOptions, Object,
    ObjectDownload, ObjectUpload, Part, PartUpload, ProjectClient, Result, SystemMetadata,
    UploadInfo, UploadOptions,
};

use crate::transfer::{MemoryDownload, MemoryPartUpload, MemoryUpload};

#[derive(Clone)]
pub(crate) struct StoredObject {
    pub data: Bytes,
    pub system: SystemMetadata,
    pub custom: CustomMetadata,
}

pub(crate) struct BucketState {
    pub created: DateTime<Utc>,
    pub objects: BTreeMap<String, StoredObject>,
}

#[derive(Clone)]
pub(crate) struct StoredPart {
    pub data: Bytes,
    pub etag: Vec<u8>,
    pub modified: DateTime<Utc>,
}

pub(crate) struct MultipartUpload {
    pub bucket: String,
    pub key: String,
    pub expires: Option<DateTime<Utc>>,
    pub started: DateTime<Utc>,
    pub parts: BTreeMap<u32, StoredPart>,
    /// Set once the upload is committed or aborted; kept so late calls can
    /// be answered with `UploadAlreadyDone` instead of "unknown id".
    pub done: bool,
}

#[derive(Default)]
pub(crate) struct Store {
    pub buckets: BTreeMap<String, BucketState>,
    pub uploads: BTreeMap<String, MultipartUpload>,
    pub next_upload_id: u64,
}

pub(crate) fn check_bucket_name(bucket: &str) -> Result<()> {
    if bucket.is_empty() {
        return Err(ClientError::BucketNameInvalid(bucket.to_string()));
    }
    Ok(())
}

pub(crate) fn check_object_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ClientError::ObjectKeyInvalid(key.to_string()));
    }
    Ok(())
}

fn bucket_info(name: &str, state: &BucketState) -> Bucket {
    Bucket {
        name: name.to_string(),
        created: Some(state.created),
    }
}

fn object_info(key: &str, stored: &StoredObject, system: bool, custom: bool) -> Object {
    Object {
        key: key.to_string(),
        is_prefix: false,
        system: if system {
            stored.system.clone()
        } else {
            SystemMetadata::default()
        },
        custom: if custom {
            stored.custom.clone()
        } else {
            CustomMetadata::new()
        },
    }
}

/// A session against the in-memory store.
pub struct MemoryProject {
    store: Arc<RwLock<Store>>,
    closed: AtomicBool,
}

impl MemoryProject {
    pub(crate) fn new(store: Arc<RwLock<Store>>) -> Self {
        Self {
            store,
            closed: AtomicBool::new(false),
        }
    }

    fn guard(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Internal("project is closed".to_string()));
        }
        Ok(())
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ProjectClient for MemoryProject {
    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        debug!("closed project");
        Ok(())
    }

    async fn stat_bucket(&self, bucket: &str) -> Result<Bucket> {
        self.guard()?;
        check_bucket_name(bucket)?;
        let store = self.read();
        let state = store
            .buckets
            .get(bucket)
            .ok_or_else(|| ClientError::BucketNotFound(bucket.to_string()))?;
        Ok(bucket_info(bucket, state))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(Bucket, bool)> {
        self.guard()?;
        check_bucket_name(bucket)?;
        let mut store = self.write();
        if let Some(state) = store.buckets.get(bucket) {
            return Ok((bucket_info(bucket, state), false));
        }
        let state = BucketState {
            created: Utc::now(),
            objects: BTreeMap::new(),
        };
        let info = bucket_info(bucket, &state);
        store.buckets.insert(bucket.to_string(), state);
        debug!(bucket, "created bucket");
        Ok((info, true))
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<Bucket> {
        self.guard()?;
        check_bucket_name(bucket)?;
        let mut store = self.write();
        let state = store
            .buckets
            .get(bucket)
            .ok_or_else(|| ClientError::BucketNotFound(bucket.to_string()))?;
        if !state.objects.is_empty() {
            return Err(ClientError::BucketNotEmpty(bucket.to_string()));
        }
        let info = bucket_info(bucket, state);
        store.buckets.remove(bucket);
        debug!(bucket, "deleted bucket");
        Ok(info)
    }

    fn list_buckets(&self, options: ListBucketsOptions) -> ListStream<Bucket> {
        let items: Vec<Result<Bucket>> = match self.guard() {
            Err(err) => vec![Err(err)],
            Ok(()) => {
                let cursor = options.cursor.unwrap_or_default();
                let store = self.read();
                store
                    .buckets
                    .iter()
                    .filter(|(name, _)| name.as_str() > cursor.as_str())
                    .map(|(name, state)| Ok(bucket_info(name, state)))
                    .collect()
            }
        };
        stream::iter(items).boxed()
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<Object> {
        self.guard()?;
        check_bucket_name(bucket)?;
        check_object_key(key)?;
        let store = self.read();
        let state = store
            .buckets
            .get(bucket)
            .ok_or_else(|| ClientError::BucketNotFound(bucket.to_string()))?;
        let stored = state
            .objects
            .get(key)
            .ok_or_else(|| ClientError::ObjectNotFound(key.to_string()))?;
        Ok(object_info(key, stored, true, true))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<Object> {
        self.guard()?;
        check_bucket_name(bucket)?;
        check_object_key(key)?;
        let mut store = self.write();
        let state = store
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| ClientError::BucketNotFound(bucket.to_string()))?;
        let stored = state
            .objects
            .remove(key)
            .ok_or_else(|| ClientError::ObjectNotFound(key.to_string()))?;
        debug!(bucket, key, "deleted object");
        Ok(object_info(key, &stored, true, true))
    }

    async fn move_object(
        &self,
        old_bucket: &str,
        old_key: &str,
        new_bucket: &str,
        new_key: &str,
    ) -> Result<()> {
        self.guard()?;
        check_bucket_name(old_bucket)?;
        check_object_key(old_key)?;
        check_bucket_name(new_bucket)?;
        check_object_key(new_key)?;
        let mut store = self.write();
        if !store.buckets.contains_key(new_bucket) {
            return Err(ClientError::BucketNotFound(new_bucket.to_string()));
        }
        let old_state = store
            .buckets
            .get_mut(old_bucket)
            .ok_or_else(|| ClientError::BucketNotFound(old_bucket.to_string()))?;
        let stored = old_state
            .objects
            .remove(old_key)
            .ok_or_else(|| ClientError::ObjectNotFound(old_key.to_string()))?;
        store
            .buckets
            .get_mut(new_bucket)
            .ok_or_else(|| ClientError::BucketNotFound(new_bucket.to_string()))?
            .objects
            .insert(new_key.to_string(), stored);
        debug!(old_bucket, old_key, new_bucket, new_key, "moved object");
        Ok(())
    }

    async fn copy_object(
        &self,
        old_bucket: &str,
        old_key: &str,
        new_bucket: &str,
        new_key: &str,
    ) -> Result<Object> {
        self.guard()?;
        check_bucket_name(old_bucket)?;
        check_object_key(old_key)?;
        check_bucket_name(new_bucket)?;
        check_object_key(new_key)?;
        let mut store = self.write();
        let stored = store
            .buckets
            .get(old_bucket)
            .ok_or_else(|| ClientError::BucketNotFound(old_bucket.to_string()))?
            .objects
            .get(old_key)
            .ok_or_else(|| ClientError::ObjectNotFound(old_key.to_string()))?
            .clone();
        store
            .buckets
            .get_mut(new_bucket)
            .ok_or_else(|| ClientError::BucketNotFound(new_bucket.to_string()))?
            .objects
            .insert(new_key.to_string(), stored.clone());
        debug!(old_bucket, old_key, new_bucket, new_key, "copied object");
        Ok(object_info(new_key, &stored, true, true))
    }

    fn list_objects(&self, bucket: &str, options: ListObjectsOptions) -> ListStream<Object> {
        let items = self.collect_objects(bucket, options);
        stream::iter(items).boxed()
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        options: UploadOptions,
    ) -> Result<Box<dyn ObjectUpload>> {
        self.guard()?;
        check_bucket_name(bucket)?;
        check_object_key(key)?;
        debug!(bucket, key, "started upload");
        Ok(Box::new(MemoryUpload::new(
            Arc::clone(&self.store),
            bucket.to_string(),
            key.to_string(),
            options.expires,
        )))
    }

    async fn download_object(
        &self,
        bucket: &str,
        key: &str,
        options: DownloadOptions,
    ) -> Result<Box<dyn ObjectDownload>> {
        self.guard()?;
        check_bucket_name(bucket)?;
        check_object_key(key)?;
        let store = self.read();
        let state = store
            .buckets
            .get(bucket)
            .ok_or_else(|| ClientError::BucketNotFound(bucket.to_string()))?;
        let stored = state
            .objects
            .get(key)
            .ok_or_else(|| ClientError::ObjectNotFound(key.to_string()))?;

        let size = stored.data.len();
        if options.offset < 0 || options.offset as usize > size {
            return Err(ClientError::Internal(format!(
                "download offset {} out of range for object of {} bytes",
                options.offset, size
            )));
        }
        let start = options.offset as usize;
        let end = if options.length < 0 {
            size
        } else {
            size.min(start.saturating_add(options.length as usize))
        };
        debug!(bucket, key, start, end, "started download");
        Ok(Box::new(MemoryDownload::new(
            stored.data.slice(start..end),
            object_info(key, stored, true, true),
        )))
    }

    async fn begin_upload(
        &self,
        bucket: &str,
        key: &str,
        options: UploadOptions,
    ) -> Result<UploadInfo> {
        self.guard()?;
        check_bucket_name(bucket)?;
        check_object_key(key)?;
        let mut store = self.write();
        store.next_upload_id += 1;
        let upload_id = format!("mu-{:016x}", store.next_upload_id);
        let started = Utc::now();
        store.uploads.insert(
            upload_id.clone(),
            MultipartUpload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                expires: options.expires,
                started,
                parts: BTreeMap::new(),
                done: false,
            },
        );
        debug!(bucket, key, upload_id = %upload_id, "began multipart upload");
        Ok(UploadInfo {
            upload_id,
            key: key.to_string(),
            is_prefix: false,
            system: SystemMetadata {
                created: Some(started),
                expires: options.expires,
                content_length: 0,
            },
            custom: CustomMetadata::new(),
        })
    }

    async fn commit_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        options: CommitUploadOptions,
    ) -> Result<Object> {
        self.guard()?;
        check_bucket_name(bucket)?;
        check_object_key(key)?;
        let mut store = self.write();
        let upload = store
            .uploads
            .get(upload_id)
            .ok_or_else(|| ClientError::Internal(format!("unknown upload id: {upload_id:?}")))?;
        if upload.bucket != bucket || upload.key != key {
            return Err(ClientError::Internal(format!(
                "upload id {upload_id:?} does not belong to {bucket:?}/{key:?}"
            )));
        }
        if upload.done {
            return Err(ClientError::UploadAlreadyDone(key.to_string()));
        }

        let mut data = Vec::new();
        for part in upload.parts.values() {
            data.extend_from_slice(&part.data);
        }
        let expires = upload.expires;
        if !store.buckets.contains_key(bucket) {
            return Err(ClientError::BucketNotFound(bucket.to_string()));
        }

        let data = Bytes::from(data);
        let content_length = data.len() as i64;
        let stored = StoredObject {
            data,
            system: SystemMetadata {
                created: Some(Utc::now()),
                expires,
                content_length,
            },
            custom: options.custom_metadata,
        };
        let object = object_info(key, &stored, true, true);

        if let Some(upload) = store.uploads.get_mut(upload_id) {
            upload.done = true;
            upload.parts.clear();
        }
        if let Some(state) = store.buckets.get_mut(bucket) {
            state.objects.insert(key.to_string(), stored);
        }
        debug!(bucket, key, upload_id, "committed multipart upload");
        Ok(object)
    }

    async fn abort_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        self.guard()?;
        check_bucket_name(bucket)?;
        check_object_key(key)?;
        let mut store = self.write();
        let upload = store
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| ClientError::Internal(format!("unknown upload id: {upload_id:?}")))?;
        if upload.done {
            return Err(ClientError::UploadAlreadyDone(key.to_string()));
        }
        upload.done = true;
        upload.parts.clear();
        debug!(bucket, key, upload_id, "aborted multipart upload");
        Ok(())
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<Box<dyn PartUpload>> {
        self.guard()?;
        check_bucket_name(bucket)?;
        check_object_key(key)?;
        let store = self.read();
        let upload = store
            .uploads
            .get(upload_id)
            .ok_or_else(|| ClientError::Internal(format!("unknown upload id: {upload_id:?}")))?;
        if upload.done {
            return Err(ClientError::UploadAlreadyDone(key.to_string()));
        }
        debug!(bucket, key, upload_id, part_number, "started part upload");
        Ok(Box::new(MemoryPartUpload::new(
            Arc::clone(&self.store),
            upload_id.to_string(),
            part_number,
        )))
    }

    fn list_uploads(&self, bucket: &str, options: ListUploadsOptions) -> ListStream<UploadInfo> {
        let items: Vec<Result<UploadInfo>> = match self
            .guard()
            .and_then(|()| check_bucket_name(bucket))
        {
            Err(err) => vec![Err(err)],
            Ok(()) => {
                let prefix = options.prefix.unwrap_or_default();
                let cursor = options.cursor.unwrap_or_default();
                let store = self.read();
                store
                    .uploads
                    .iter()
                    .filter(|(_, upload)| {
                        !upload.done && upload.bucket == bucket && upload.key.starts_with(&prefix)
                    })
                    .filter(|(_, upload)| upload.key.as_str() > cursor.as_str())
                    .map(|(id, upload)| {
                        Ok(UploadInfo {
                            upload_id: id.clone(),
                            key: upload.key.clone(),
                            is_prefix: false,
                            system: if options.system {
                                SystemMetadata {
                                    created: Some(upload.started),
                                    expires: upload.expires,
                                    content_length: 0,
                                }
                            } else {
                                SystemMetadata::default()
                            },
                            custom: CustomMetadata::new(),
                        })
                    })
                    .collect()
            }
        };
        stream::iter(items).boxed()
    }

    fn list_upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        options: ListUploadPartsOptions,
    ) -> ListStream<Part> {
        let items: Vec<Result<Part>> = match self.guard().and_then(|()| {
            check_bucket_name(bucket)?;
            check_object_key(key)
        }) {
            Err(err) => vec![Err(err)],
            Ok(()) => {
                let store = self.read();
                match store.uploads.get(upload_id) {
                    None => vec![Err(ClientError::Internal(format!(
                        "unknown upload id: {upload_id:?}"
                    )))],
                    Some(upload) => upload
                        .parts
                        .range((options.cursor.saturating_add(1))..)
                        .map(|(number, part)| {
                            Ok(Part {
                                part_number: *number,
                                size: part.data.len() as u64,
                                modified: Some(part.modified),
                                etag: part.etag.clone(),
                            })
                        })
                        .collect(),
                }
            }
        };
        stream::iter(items).boxed()
    }
}

impl MemoryProject {
    fn collect_objects(&self, bucket: &str, options: ListObjectsOptions) -> Vec<Result<Object>> {
        if let Err(err) = self.guard().and_then(|()| check_bucket_name(bucket)) {
            return vec![Err(err)];
        }
        let prefix = options.prefix.unwrap_or_default();
        let cursor = options.cursor.unwrap_or_default();
        // The cursor names the last emitted entry, relative to the prefix.
        let resume_after = format!("{prefix}{cursor}");

        let store = self.read();
        let Some(state) = store.buckets.get(bucket) else {
            return vec![Err(ClientError::BucketNotFound(bucket.to_string()))];
        };

        let mut items = Vec::new();
        let mut collapsed: BTreeSet<String> = BTreeSet::new();
        for (key, stored) in state.objects.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            let rest = &key[prefix.len()..];
            if !options.recursive {
                if let Some(pos) = rest.find('/') {
                    let entry = format!("{prefix}{}", &rest[..=pos]);
                    if entry.as_str() > resume_after.as_str() && collapsed.insert(entry.clone()) {
                        items.push(Ok(Object {
                            key: entry,
                            is_prefix: true,
                            system: SystemMetadata::default(),
                            custom: CustomMetadata::new(),
                        }));
                    }
                    continue;
                }
            }
            if key.as_str() > resume_after.as_str() {
                items.push(Ok(object_info(
                    key,
                    stored,
                    options.system,
                    options.custom,
                )));
            }
        }
        items
    }
}
