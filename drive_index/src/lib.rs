//! The durable local index: `{event-id → (event, decrypted-metadata)}` with
//! predicate-based secondary queries (spec §4.D).
//!
//! `IndexStore` is the seam; [`sled_store::SledIndexStore`] is the durable,
//! single-process implementation, grounded on `Riateche-rammingen`'s `Db`
//! (`client/src/db.rs`), which keeps a `sled::Tree` per logical table and
//! talks to it with plain synchronous calls. `drive_index_memory` provides a
//! `DashMap`-backed test double with the same contract.

pub mod record;
pub mod sled_store;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use record::{ContentType, IndexFilter, IndexRecord};
pub use sled_store::SledIndexStore;

use async_trait::async_trait;
use drive_protocol::DriveResult;

/// The contract every index backend must satisfy (spec §4.D).
///
/// `(type, path) → newest-by-created_at` reduction ("current version",
/// spec invariant 2) is a property of how callers use [`IndexStore::query`],
/// not something the store itself enforces — the store is a flat map plus a
/// predicate scan.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Inserts or overwrites the record for `record.event.id`.
    async fn put(&self, record: IndexRecord) -> DriveResult<()>;

    /// Looks up a single record by event id.
    async fn get(&self, event_id: &str) -> DriveResult<Option<IndexRecord>>;

    /// Removes the record for `event_id`, if present. A no-op, not an error,
    /// when the id is absent (spec §7: NotFound on delete is a no-op).
    async fn delete(&self, event_id: &str) -> DriveResult<()>;

    /// Returns every record matching `filter`.
    async fn query(&self, filter: &IndexFilter) -> DriveResult<Vec<IndexRecord>>;

    /// Returns every record, for cleanup/migration use (spec §4.D).
    async fn scan_all(&self) -> DriveResult<Vec<IndexRecord>>;

    /// The highest `event.created_at` currently stored, or `None` when empty.
    /// The sync engine's only persisted cursor (spec §4.D "Watermark").
    async fn watermark(&self) -> DriveResult<Option<i64>> {
        let max = self
            .scan_all()
            .await?
            .into_iter()
            .map(|r| r.event.created_at)
            .max();
        Ok(max)
    }
}
