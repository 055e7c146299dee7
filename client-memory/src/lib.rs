//! In-Memory Storage Client
//!
//! A complete implementation of the `client-traits` surface backed by maps
//! in process memory. The bridge integration tests run against it, and it
//! doubles as a demo backend: every sentinel error, pagination quirk and
//! multipart state transition behaves like a real client would, just without
//! a network underneath.

mod project;
mod transfer;

pub use project::MemoryProject;

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

use client_traits::{
    AccessGrant, ClientConfig, ClientError, EncryptionKey, ProjectClient, Result, StorageClient,
};

use project::Store;

/// Client entry point. All projects opened through one `MemoryClient` share
/// the same underlying store, like sessions against the same satellite.
pub struct MemoryClient {
    store: Arc<RwLock<Store>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
        }
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageClient for MemoryClient {
    fn parse_access(&self, serialized: &str) -> Result<Arc<dyn AccessGrant>> {
        if serialized.is_empty() {
            return Err(ClientError::Internal("access grant is empty".to_string()));
        }
        debug!(len = serialized.len(), "parsed access grant");
        Ok(Arc::new(MemoryAccess::new(serialized.to_string())))
    }

    async fn request_access_with_passphrase(
        &self,
        _config: &ClientConfig,
        satellite_address: &str,
        api_key: &str,
        passphrase: &str,
    ) -> Result<Arc<dyn AccessGrant>> {
        if satellite_address.is_empty() {
            return Err(ClientError::Internal(
                "satellite address is required".to_string(),
            ));
        }
        if api_key.is_empty() {
            return Err(ClientError::Internal("api key is required".to_string()));
        }
        let key = self.derive_encryption_key(passphrase, satellite_address.as_bytes())?;
        let serialized = format!(
            "depot:{satellite_address}:{api_key}:{:02x}",
            key.secret().first().copied().unwrap_or(0)
        );
        debug!(satellite = satellite_address, "issued access grant");
        Ok(Arc::new(MemoryAccess::new(serialized)))
    }

    fn derive_encryption_key(&self, passphrase: &str, salt: &[u8]) -> Result<EncryptionKey> {
        if passphrase.is_empty() {
            return Err(ClientError::Internal(
                "passphrase must not be empty".to_string(),
            ));
        }
        // Deterministic FNV-1a fold; a production client substitutes a real
        // key-derivation function here.
        let mut secret = [0u8; 32];
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for (i, byte) in passphrase.bytes().chain(salt.iter().copied()).enumerate() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            secret[i % 32] ^= (hash >> 24) as u8;
        }
        Ok(EncryptionKey::new(secret.to_vec()))
    }

    async fn open_project(
        &self,
        _config: &ClientConfig,
        access: Arc<dyn AccessGrant>,
    ) -> Result<Arc<dyn ProjectClient>> {
        // Round-trip through serialization instead of downcasting; a grant
        // that cannot serialize cannot open a project either.
        let serialized = access.serialize()?;
        debug!(len = serialized.len(), "opened project");
        Ok(Arc::new(MemoryProject::new(Arc::clone(&self.store))))
    }
}

/// Access grant for the in-memory satellite: the serialized form is the
/// grant, plus any encryption-key overrides recorded against it.
pub struct MemoryAccess {
    serialized: String,
    overrides: Mutex<Vec<(String, String)>>,
}

impl MemoryAccess {
    fn new(serialized: String) -> Self {
        Self {
            serialized,
            overrides: Mutex::new(Vec::new()),
        }
    }

    /// Bucket/prefix pairs whose content key has been overridden.
    pub fn overridden_prefixes(&self) -> Vec<(String, String)> {
        self.overrides
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AccessGrant for MemoryAccess {
    fn serialize(&self) -> Result<String> {
        Ok(self.serialized.clone())
    }

    fn override_encryption_key(
        &self,
        bucket: &str,
        prefix: &str,
        _key: &EncryptionKey,
    ) -> Result<()> {
        if bucket.is_empty() {
            return Err(ClientError::BucketNameInvalid(bucket.to_string()));
        }
        self.overrides
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((bucket.to_string(), prefix.to_string()));
        debug!(bucket, prefix, "overrode encryption key");
        Ok(())
    }
}
