//! The durable, single-process `IndexStore` backend.
//!
//! Grounded on `Riateche-rammingen`'s `client/src/db.rs::Db`: one `sled::Tree`
//! per logical table, plain synchronous calls wrapped in otherwise-async
//! methods (sled's own I/O is already non-blocking enough for this crate's
//! access pattern; no `spawn_blocking` indirection is needed).

use std::path::Path;

use async_trait::async_trait;
use drive_protocol::{DriveError, DriveResult};

use crate::record::{IndexFilter, IndexRecord};
use crate::IndexStore;

const TABLE_DRIVE_EVENTS: &str = "drive_events";

pub struct SledIndexStore {
    tree: sled::Tree,
}

impl SledIndexStore {
    pub fn open(path: impl AsRef<Path>) -> DriveResult<Self> {
        let db = sled::open(path).map_err(|e| DriveError::NetworkFailed(e.into()))?;
        let tree = db
            .open_tree(TABLE_DRIVE_EVENTS)
            .map_err(|e| DriveError::NetworkFailed(e.into()))?;
        Ok(Self { tree })
    }
}

#[async_trait]
impl IndexStore for SledIndexStore {
    async fn put(&self, record: IndexRecord) -> DriveResult<()> {
        let key = record.event.id.clone();
        let value = serde_json::to_vec(&record)
            .map_err(|e| DriveError::invalid_argument(format!("failed to serialise index record: {e}")))?;
        self.tree
            .insert(key.as_bytes(), value)
            .map_err(|e| DriveError::NetworkFailed(e.into()))?;
        Ok(())
    }

    async fn get(&self, event_id: &str) -> DriveResult<Option<IndexRecord>> {
        let Some(bytes) = self
            .tree
            .get(event_id.as_bytes())
            .map_err(|e| DriveError::NetworkFailed(e.into()))?
        else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&bytes)
            .map_err(|e| DriveError::invalid_argument(format!("corrupt index record for {event_id}: {e}")))?;
        Ok(Some(record))
    }

    async fn delete(&self, event_id: &str) -> DriveResult<()> {
        self.tree
            .remove(event_id.as_bytes())
            .map_err(|e| DriveError::NetworkFailed(e.into()))?;
        Ok(())
    }

    async fn query(&self, filter: &IndexFilter) -> DriveResult<Vec<IndexRecord>> {
        let matched: Vec<IndexRecord> = self.scan_all().await?.into_iter().filter(|r| filter.matches(r)).collect();
        Ok(filter.apply_ordering(matched))
    }

    async fn scan_all(&self) -> DriveResult<Vec<IndexRecord>> {
        let mut out = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item.map_err(|e| DriveError::NetworkFailed(e.into()))?;
            let record: IndexRecord = serde_json::from_slice(&value)
                .map_err(|e| DriveError::invalid_argument(format!("corrupt index record: {e}")))?;
            out.push(record);
        }
        Ok(out)
    }
}
