//! An in-memory `IndexStore`, for tests and the end-to-end scenarios in
//! spec.md §8. Grounded on `blob_stores/memory::MemoryStore`'s `DashMap`-
//! backed trait implementation.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use drive_index::{IndexFilter, IndexRecord, IndexStore};
use drive_protocol::DriveResult;

#[derive(Clone, Default)]
pub struct MemoryIndexStore {
    records: Arc<DashMap<String, IndexRecord>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn put(&self, record: IndexRecord) -> DriveResult<()> {
        self.records.insert(record.event.id.clone(), record);
        Ok(())
    }

    async fn get(&self, event_id: &str) -> DriveResult<Option<IndexRecord>> {
        Ok(self.records.get(event_id).map(|r| r.clone()))
    }

    async fn delete(&self, event_id: &str) -> DriveResult<()> {
        self.records.remove(event_id);
        Ok(())
    }

    async fn query(&self, filter: &IndexFilter) -> DriveResult<Vec<IndexRecord>> {
        let matched: Vec<IndexRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|r| filter.matches(r))
            .collect();
        Ok(filter.apply_ordering(matched))
    }

    async fn scan_all(&self) -> DriveResult<Vec<IndexRecord>> {
        Ok(self.records.iter().map(|entry| entry.value().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drive_index::testutil::IndexStoreTests;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryIndexStore::new();
        IndexStoreTests::new(&store).run_all().await.unwrap();
    }
}
