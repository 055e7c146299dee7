//! Opaque handle registry.
//!
//! Foreign callers hold fixed-width integer handles, never pointers into
//! managed memory. The registry maps each handle to a tagged entry; handles
//! are issued from a monotonic counter and never reused, so a racing lookup
//! after deletion observes "not found" rather than an aliased object.
//!
//! The mutex guards only the map itself. Entries are shared out as `Arc`s
//! and carry their own interior locks where mutation is needed, so no
//! blocking client call ever runs under the registry lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use client_traits::{
    AccessGrant, Bucket, EncryptionKey, Object, ObjectDownload, ObjectUpload, Part, PartUpload,
    ProjectClient, UploadInfo,
};

use crate::cursor::LazyCursor;
use crate::scope::Scope;

/// Raw integer value crossing the boundary. Zero is never issued.
pub type RawHandle = usize;

/// An issued registry handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(RawHandle);

impl Handle {
    pub fn from_raw(raw: RawHandle) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> RawHandle {
        self.0
    }
}

/// The fixed set of kinds a handle can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Access,
    Project,
    Upload,
    Download,
    PartUpload,
    BucketIterator,
    ObjectIterator,
    UploadIterator,
    PartIterator,
    EncryptionKey,
}

impl HandleKind {
    pub fn name(self) -> &'static str {
        match self {
            HandleKind::Access => "access",
            HandleKind::Project => "project",
            HandleKind::Upload => "upload",
            HandleKind::Download => "download",
            HandleKind::PartUpload => "part upload",
            HandleKind::BucketIterator => "bucket iterator",
            HandleKind::ObjectIterator => "object iterator",
            HandleKind::UploadIterator => "upload iterator",
            HandleKind::PartIterator => "part iterator",
            HandleKind::EncryptionKey => "encryption key",
        }
    }
}

pub struct AccessEntry {
    pub grant: Arc<dyn AccessGrant>,
}

pub struct ProjectEntry {
    /// Root scope of the session; canceling it tears down every operation
    /// started under this project.
    pub scope: Scope,
    pub project: Arc<dyn ProjectClient>,
}

pub struct UploadEntry {
    pub scope: Scope,
    pub upload: Mutex<Box<dyn ObjectUpload>>,
}

pub struct DownloadEntry {
    pub scope: Scope,
    pub download: Mutex<Box<dyn ObjectDownload>>,
}

pub struct PartUploadEntry {
    pub scope: Scope,
    pub part_upload: Mutex<Box<dyn PartUpload>>,
}

/// Closed union of everything a handle may refer to.
///
/// Lookups check the tag: a handle of the wrong kind reports an invalid
/// handle, it never silently yields the wrong object.
pub enum Entry {
    Access(AccessEntry),
    Project(ProjectEntry),
    Upload(UploadEntry),
    Download(DownloadEntry),
    PartUpload(PartUploadEntry),
    BucketIterator(Mutex<LazyCursor<Bucket>>),
    ObjectIterator(Mutex<LazyCursor<Object>>),
    UploadIterator(Mutex<LazyCursor<UploadInfo>>),
    PartIterator(Mutex<LazyCursor<Part>>),
    EncryptionKey(EncryptionKey),
}

impl Entry {
    pub fn kind(&self) -> HandleKind {
        match self {
            Entry::Access(_) => HandleKind::Access,
            Entry::Project(_) => HandleKind::Project,
            Entry::Upload(_) => HandleKind::Upload,
            Entry::Download(_) => HandleKind::Download,
            Entry::PartUpload(_) => HandleKind::PartUpload,
            Entry::BucketIterator(_) => HandleKind::BucketIterator,
            Entry::ObjectIterator(_) => HandleKind::ObjectIterator,
            Entry::UploadIterator(_) => HandleKind::UploadIterator,
            Entry::PartIterator(_) => HandleKind::PartIterator,
            Entry::EncryptionKey(_) => HandleKind::EncryptionKey,
        }
    }

    pub fn as_access(&self) -> Option<&AccessEntry> {
        match self {
            Entry::Access(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_project(&self) -> Option<&ProjectEntry> {
        match self {
            Entry::Project(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_upload(&self) -> Option<&UploadEntry> {
        match self {
            Entry::Upload(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_download(&self) -> Option<&DownloadEntry> {
        match self {
            Entry::Download(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_part_upload(&self) -> Option<&PartUploadEntry> {
        match self {
            Entry::PartUpload(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_bucket_iterator(&self) -> Option<&Mutex<LazyCursor<Bucket>>> {
        match self {
            Entry::BucketIterator(cursor) => Some(cursor),
            _ => None,
        }
    }

    pub fn as_object_iterator(&self) -> Option<&Mutex<LazyCursor<Object>>> {
        match self {
            Entry::ObjectIterator(cursor) => Some(cursor),
            _ => None,
        }
    }

    pub fn as_upload_iterator(&self) -> Option<&Mutex<LazyCursor<UploadInfo>>> {
        match self {
            Entry::UploadIterator(cursor) => Some(cursor),
            _ => None,
        }
    }

    pub fn as_part_iterator(&self) -> Option<&Mutex<LazyCursor<Part>>> {
        match self {
            Entry::PartIterator(cursor) => Some(cursor),
            _ => None,
        }
    }

    pub fn as_encryption_key(&self) -> Option<&EncryptionKey> {
        match self {
            Entry::EncryptionKey(key) => Some(key),
            _ => None,
        }
    }
}

struct State {
    next_id: RawHandle,
    entries: HashMap<RawHandle, Arc<Entry>>,
}

/// Concurrent map from handles to managed entries.
///
/// Explicitly constructed and injectable: the FFI layer owns one instance
/// per process, tests own as many as they like.
pub struct HandleRegistry {
    state: Mutex<State>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 0,
                entries: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoning panic elsewhere leaves the map itself consistent;
        // recovering keeps the boundary crash-free.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `entry` and return its freshly issued handle. Never fails.
    pub fn add(&self, entry: Entry) -> Handle {
        let kind = entry.kind();
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.entries.insert(id, Arc::new(entry));
        tracing::trace!(handle = id, kind = kind.name(), "registered handle");
        Handle(id)
    }

    /// Look up a live entry. Unknown and deleted handles yield `None`.
    pub fn get(&self, handle: Handle) -> Option<Arc<Entry>> {
        self.lock().entries.get(&handle.0).cloned()
    }

    /// Remove an entry, returning it if it was still present. Deleting an
    /// unknown or already-deleted handle is a no-op.
    pub fn del(&self, handle: Handle) -> Option<Arc<Entry>> {
        let removed = self.lock().entries.remove(&handle.0);
        if removed.is_some() {
            tracing::trace!(handle = handle.0, "released handle");
        }
        removed
    }

    /// True only if no entries remain. Used by leak-detection tests.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_traits::ClientError;

    fn key_entry(byte: u8) -> Entry {
        Entry::EncryptionKey(EncryptionKey::new(vec![byte; 4]))
    }

    #[test]
    fn handles_are_strictly_increasing_and_never_reused() {
        let registry = HandleRegistry::new();
        let a = registry.add(key_entry(1));
        let b = registry.add(key_entry(2));
        assert!(b.raw() > a.raw());

        registry.del(a);
        registry.del(b);
        let c = registry.add(key_entry(3));
        assert!(c.raw() > b.raw());
    }

    #[test]
    fn zero_is_never_a_valid_handle() {
        let registry = HandleRegistry::new();
        assert!(registry.get(Handle::from_raw(0)).is_none());
        let first = registry.add(key_entry(1));
        assert_ne!(first.raw(), 0);
    }

    #[test]
    fn get_after_del_observes_not_found() {
        let registry = HandleRegistry::new();
        let handle = registry.add(key_entry(7));
        assert!(registry.get(handle).is_some());

        assert!(registry.del(handle).is_some());
        assert!(registry.get(handle).is_none());
        // Second delete is a no-op, not an error.
        assert!(registry.del(handle).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn kind_mismatch_is_detectable() {
        let registry = HandleRegistry::new();
        let handle = registry.add(key_entry(9));
        let entry = registry.get(handle).unwrap();

        assert!(entry.as_project().is_none());
        assert!(entry.as_encryption_key().is_some());
        assert_eq!(entry.kind(), HandleKind::EncryptionKey);
    }

    #[test]
    fn failed_cursors_are_storable_entries() {
        let registry = HandleRegistry::new();
        let cursor: LazyCursor<Bucket> = LazyCursor::failed(
            crate::error::BridgeError::Client(ClientError::Internal("nope".to_string())),
        );
        let handle = registry.add(Entry::BucketIterator(Mutex::new(cursor)));
        let entry = registry.get(handle).unwrap();
        assert!(entry.as_bucket_iterator().is_some());
        assert!(entry.as_object_iterator().is_none());
    }

    #[test]
    fn concurrent_add_del_get_stays_consistent() {
        let registry = std::sync::Arc::new(HandleRegistry::new());
        let mut threads = Vec::new();

        for t in 0..8u8 {
            let registry = std::sync::Arc::clone(&registry);
            threads.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    let handle = registry.add(key_entry(t));
                    assert!(registry.get(handle).is_some());
                    assert!(registry.del(handle).is_some());
                    assert!(registry.get(handle).is_none());
                }
            }));
        }
        for thread in threads {
            thread.join().unwrap();
        }
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }
}
