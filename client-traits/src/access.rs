//! Access grants, key derivation and the top-level client entry point.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::project::ProjectClient;

/// Configuration supplied by the foreign caller when dialing the storage
/// system or opening a session.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Product identification sent to the storage system, if any.
    pub user_agent: Option<String>,
    /// How long to wait when establishing a connection. `None` means the
    /// client's own default.
    pub dial_timeout: Option<Duration>,
    /// Directory for buffering data during uploads; `None` buffers in memory.
    pub temp_directory: Option<PathBuf>,
}

/// A salted key for encrypting and decrypting object data.
///
/// The derivation scheme belongs to the client; the bridge only carries the
/// key between operations. `Debug` is intentionally opaque so the secret
/// never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    secret: Vec<u8>,
}

impl EncryptionKey {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey").finish_non_exhaustive()
    }
}

/// Everything needed to access a project and its buckets.
pub trait AccessGrant: Send + Sync {
    /// Serialize the grant so it can be persisted and parsed back later.
    fn serialize(&self) -> Result<String>;

    /// Replace the content key used under `bucket`/`prefix` with a derived
    /// key, e.g. for multitenancy inside a single bucket.
    fn override_encryption_key(&self, bucket: &str, prefix: &str, key: &EncryptionKey)
        -> Result<()>;
}

/// Entry point of the storage client library.
///
/// One instance is installed into the bridge at startup; everything else is
/// reached through the grants and sessions it produces.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Parse a serialized access grant.
    fn parse_access(&self, serialized: &str) -> Result<Arc<dyn AccessGrant>>;

    /// Request a new access grant from the satellite using a passphrase.
    async fn request_access_with_passphrase(
        &self,
        config: &ClientConfig,
        satellite_address: &str,
        api_key: &str,
        passphrase: &str,
    ) -> Result<Arc<dyn AccessGrant>>;

    /// Derive a salted encryption key for a passphrase. Pure computation.
    fn derive_encryption_key(&self, passphrase: &str, salt: &[u8]) -> Result<EncryptionKey>;

    /// Open a project session using an access grant.
    async fn open_project(
        &self,
        config: &ClientConfig,
        access: Arc<dyn AccessGrant>,
    ) -> Result<Arc<dyn ProjectClient>>;
}
