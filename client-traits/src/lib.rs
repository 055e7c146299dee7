//! Collaborator Interface for the Depot Bridge
//!
//! This crate defines the surface the bridge needs from a storage client:
//! async traits for sessions, streaming transfers and paginated listings,
//! the shared data model (buckets, objects, parts, custom metadata) and the
//! closed error taxonomy the boundary classifies against.
//!
//! The bridge never depends on a concrete client. Products link a real
//! network client; the test suites use the in-memory implementation from
//! `client-memory`. Either way, every long-running operation here is async
//! and is raced against a cancellation scope by the bridge, so cancellation
//! is a first-class input to every blocking call.

pub mod access;
pub mod error;
pub mod object;
pub mod project;
pub mod transfer;

pub use access::{AccessGrant, ClientConfig, EncryptionKey, StorageClient};
pub use error::{ClientError, Result};
pub use object::{Bucket, CustomMetadata, Object, Part, SystemMetadata, UploadInfo};
pub use project::{
    CommitUploadOptions, DownloadOptions, ListBucketsOptions, ListObjectsOptions, ListStream,
    ListUploadPartsOptions, ListUploadsOptions, ProjectClient, UploadOptions,
};
pub use transfer::{ObjectDownload, ObjectUpload, PartUpload};
