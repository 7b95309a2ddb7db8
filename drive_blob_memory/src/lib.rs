//! An in-memory content-addressed `BlobClient` test double (spec §1, §6).
//!
//! Grounded on `blob_stores/memory::MemoryStore`: a `DashMap` keyed by the
//! content hash, the same shape `drive_index_memory::MemoryIndexStore` uses
//! for the local index.

use async_trait::async_trait;
use dashmap::DashMap;
use drive_protocol::error::{DriveError, DriveResult};
use drive_protocol::hash::Hash;
use drive_protocol::blob::{BlobClient, BlobDescriptor};

#[derive(Default)]
pub struct MemoryBlobClient {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryBlobClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobClient for MemoryBlobClient {
    async fn put(&self, bytes: Vec<u8>) -> DriveResult<BlobDescriptor> {
        let sha256 = Hash::new(&bytes).to_hex();
        let size = bytes.len() as u64;
        self.blobs.insert(sha256.clone(), bytes);
        Ok(BlobDescriptor { sha256, size })
    }

    async fn get(&self, sha256: &str) -> DriveResult<Vec<u8>> {
        self.blobs
            .get(sha256)
            .map(|b| b.clone())
            .ok_or_else(|| DriveError::not_found(format!("blob {sha256} not found")))
    }

    async fn delete(&self, sha256: &str) -> DriveResult<()> {
        self.blobs.remove(sha256);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_round_trip_keys_by_sha256() {
        let client = MemoryBlobClient::new();
        let descriptor = client.put(b"hello".to_vec()).await.unwrap();
        assert_eq!(descriptor.sha256, Hash::new(b"hello").to_hex());
        assert_eq!(descriptor.size, 5);

        let fetched = client.get(&descriptor.sha256).await.unwrap();
        assert_eq!(fetched, b"hello");
    }

    #[tokio::test]
    async fn get_missing_blob_is_not_found() {
        let client = MemoryBlobClient::new();
        assert!(client.get("missing").await.is_err());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let client = MemoryBlobClient::new();
        let descriptor = client.put(b"data".to_vec()).await.unwrap();
        client.delete(&descriptor.sha256).await.unwrap();
        client.delete(&descriptor.sha256).await.unwrap();
        assert!(client.get(&descriptor.sha256).await.is_err());
    }
}
