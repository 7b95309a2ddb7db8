//! Conformance suite for `IndexStore` implementations (spec §4.D), mirrored
//! from the teacher's `s5_core::testutil::StoreTests` pattern: a struct
//! wrapping a store reference, one method per guarantee, a `run_all`.
//!
//! ```ignore
//! use drive_index::testutil::IndexStoreTests;
//!
//! #[tokio::test]
//! async fn test_my_store() {
//!     let store = MyStore::new(...);
//!     IndexStoreTests::new(&store).run_all().await.unwrap();
//! }
//! ```

use drive_protocol::event::{Event, KIND_DRIVE};
use drive_protocol::signer::{LocalSigner, Signer};
use drive_protocol::{DriveContent, DriveResult};

use crate::record::ContentType;
use crate::{IndexFilter, IndexRecord, IndexStore};

pub struct IndexStoreTests<'a, S> {
    store: &'a S,
}

impl<'a, S: IndexStore> IndexStoreTests<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn run_all(&self) -> DriveResult<()> {
        self.test_put_get().await?;
        self.test_delete_is_idempotent().await?;
        self.test_query_by_pubkey_and_path().await?;
        self.test_query_predicate_and_ordering().await?;
        self.test_watermark().await?;
        Ok(())
    }

    fn folder_record(&self, signer: &LocalSigner, created_at: i64, path: &str) -> IndexRecord {
        let content = DriveContent::Folder { path: path.to_string() };
        let body = serde_json::to_string(&content).unwrap();
        let event = Event::build(signer, created_at, KIND_DRIVE, vec![], body);
        IndexRecord::new(event, content)
    }

    pub async fn test_put_get(&self) -> DriveResult<()> {
        let signer = LocalSigner::generate();
        let record = self.folder_record(&signer, 1, "/a");
        self.store.put(record.clone()).await?;

        let fetched = self.store.get(&record.event.id).await?;
        assert_eq!(fetched, Some(record), "get should return exactly what was put");

        assert!(self.store.get("not-a-real-id").await?.is_none());
        Ok(())
    }

    pub async fn test_delete_is_idempotent(&self) -> DriveResult<()> {
        let signer = LocalSigner::generate();
        let record = self.folder_record(&signer, 2, "/b");
        let id = record.event.id.clone();
        self.store.put(record).await?;

        self.store.delete(&id).await?;
        assert!(self.store.get(&id).await?.is_none());

        // Deleting again, or deleting an unknown id, must not error (spec §7:
        // NotFound on delete is a no-op, not an error).
        self.store.delete(&id).await?;
        self.store.delete("never-existed").await?;
        Ok(())
    }

    pub async fn test_query_by_pubkey_and_path(&self) -> DriveResult<()> {
        let alice = LocalSigner::generate();
        let bob = LocalSigner::generate();
        let alice_record = self.folder_record(&alice, 10, "/shared-path");
        let bob_record = self.folder_record(&bob, 11, "/shared-path");
        self.store.put(alice_record.clone()).await?;
        self.store.put(bob_record).await?;

        let by_path = self.store.query(&IndexFilter::new().with_path("/shared-path")).await?;
        assert_eq!(by_path.len(), 2, "both authors' records share the path");

        let alice_pubkey = hex::encode(alice.pubkey());
        let by_pubkey = self
            .store
            .query(&IndexFilter::new().with_pubkey(alice_pubkey).with_content_type(ContentType::Folder))
            .await?;
        assert_eq!(by_pubkey.len(), 1);
        assert_eq!(by_pubkey[0].event.id, alice_record.event.id);
        Ok(())
    }

    pub async fn test_query_predicate_and_ordering(&self) -> DriveResult<()> {
        let signer = LocalSigner::generate();
        for created_at in [100, 200, 150] {
            self.store.put(self.folder_record(&signer, created_at, "/versions/a")).await?;
        }

        let versions = self
            .store
            .query(&IndexFilter::new().with_path("/versions/a").sorted_desc_by_created_at())
            .await?;
        let created_ats: Vec<i64> = versions.iter().map(|r| r.event.created_at).collect();
        assert_eq!(created_ats, vec![200, 150, 100], "versions must sort newest-first");

        let predicate_hits = self
            .store
            .query(&IndexFilter::new().with_predicate(|r| r.event.created_at >= 150))
            .await?;
        assert!(predicate_hits.iter().all(|r| r.event.created_at >= 150));
        assert_eq!(predicate_hits.len(), 2);
        Ok(())
    }

    pub async fn test_watermark(&self) -> DriveResult<()> {
        let signer = LocalSigner::generate();
        self.store.put(self.folder_record(&signer, 999, "/watermark")).await?;

        let watermark = self.store.watermark().await?;
        assert!(watermark.unwrap_or_default() >= 999);
        Ok(())
    }
}
