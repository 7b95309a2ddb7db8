//! The content-addressed blob network boundary (external collaborator).

use async_trait::async_trait;

use crate::error::DriveResult;

/// What `put` returns: the SHA-256 of the stored bytes and their length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobDescriptor {
    pub sha256: String,
    pub size: u64,
}

#[async_trait]
pub trait BlobClient: Send + Sync {
    /// Stores `bytes` (ciphertext when encryption is enabled) and returns its descriptor.
    async fn put(&self, bytes: Vec<u8>) -> DriveResult<BlobDescriptor>;

    /// Fetches the bytes keyed by `sha256`.
    async fn get(&self, sha256: &str) -> DriveResult<Vec<u8>>;

    /// Removes the bytes keyed by `sha256`, if present.
    async fn delete(&self, sha256: &str) -> DriveResult<()>;
}
