//! End-to-end exercise of the sync engine against the in-memory relay/index
//! test doubles (spec §8's scenario harness: "an in-memory index and a stub
//! relay that echoes broadcasts back on the subscription").

use std::sync::Arc;
use std::time::Duration;

use drive_index::{IndexStore, ContentType, IndexFilter};
use drive_index_memory::MemoryIndexStore;
use drive_protocol::event::{build_delete_tags, DriveContent, Event, KIND_DELETE, KIND_DRIVE};
use drive_protocol::error::DriveResult;
use drive_protocol::nip44::Nip44;
use drive_protocol::signer::{LocalSigner, Signer};
use drive_relay_memory::MemoryRelayClient;
use drive_sync::{ChangeKind, SyncEngine, SyncState};

/// A reference `Nip44` stand-in for this crate's own tests: no real
/// encryption, just a transparent pass-through keyed by sender/recipient
/// matching. Good enough to exercise the decrypt/parse/index seam; real
/// hosts supply the host ecosystem's actual construction.
struct PassthroughNip44;

impl Nip44 for PassthroughNip44 {
    fn encrypt(&self, plaintext: &[u8], _to_pubkey: &[u8; 32]) -> DriveResult<String> {
        use base64::Engine;
        Ok(base64::engine::general_purpose::STANDARD.encode(plaintext))
    }

    fn decrypt(&self, ciphertext: &str, _from_pubkey: &[u8; 32]) -> DriveResult<Vec<u8>> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| drive_protocol::error::DriveError::crypto_failed(format!("bad base64: {e}")))
    }
}

async fn wait_until_live(engine: &SyncEngine) {
    for _ in 0..200 {
        if engine.state().await == SyncState::Live {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("engine never reached Live state");
}

#[tokio::test]
async fn folder_event_is_decrypted_and_indexed() {
    let relay = Arc::new(MemoryRelayClient::new());
    let nip44 = Arc::new(PassthroughNip44);
    let index = Arc::new(MemoryIndexStore::new());
    let signer = LocalSigner::generate();
    let me = signer.pubkey();

    let engine = SyncEngine::new(relay.clone(), nip44.clone(), index.clone(), me);
    engine.start().await.unwrap();
    wait_until_live(&engine).await;

    let mut changes = engine.subscribe_changes();

    let content = DriveContent::Folder { path: "/Documents".to_string() };
    let body = serde_json::to_string(&content).unwrap();
    let sealed = nip44.encrypt(body.as_bytes(), &me).unwrap();
    let event = Event::build(&signer, 1, KIND_DRIVE, vec![], sealed);
    relay.publish(event.clone()).await.unwrap();

    let change = tokio::time::timeout(Duration::from_secs(2), changes.recv()).await.unwrap().unwrap();
    assert_eq!(change.kind, ChangeKind::Added);
    assert_eq!(change.path.as_deref(), Some("/Documents"));

    let stored = index.get(&event.id).await.unwrap().expect("event indexed");
    assert_eq!(stored.path(), "/Documents");

    engine.dispose().await;
}

#[tokio::test]
async fn delete_tombstone_removes_record_only_for_matching_author() {
    let relay = Arc::new(MemoryRelayClient::new());
    let nip44 = Arc::new(PassthroughNip44);
    let index = Arc::new(MemoryIndexStore::new());
    let alice = LocalSigner::generate();
    let mallory = LocalSigner::generate();
    let me = alice.pubkey();

    let engine = SyncEngine::new(relay.clone(), nip44.clone(), index.clone(), me);
    engine.start().await.unwrap();
    wait_until_live(&engine).await;
    let mut changes = engine.subscribe_changes();

    let content = DriveContent::Folder { path: "/a".to_string() };
    let body = serde_json::to_string(&content).unwrap();
    let sealed = nip44.encrypt(body.as_bytes(), &me).unwrap();
    let folder_event = Event::build(&alice, 1, KIND_DRIVE, vec![], sealed);
    relay.publish(folder_event.clone()).await.unwrap();
    let added = tokio::time::timeout(Duration::from_secs(2), changes.recv()).await.unwrap().unwrap();
    assert_eq!(added.kind, ChangeKind::Added);

    // A tombstone from a different author must be ignored.
    let forged_delete = Event::build(&mallory, 2, KIND_DELETE, build_delete_tags(&[folder_event.id.clone()]), String::new());
    relay.publish(forged_delete).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(index.get(&folder_event.id).await.unwrap().is_some(), "forged tombstone must not delete");

    // The real author's tombstone does remove it.
    let real_delete = Event::build(&alice, 3, KIND_DELETE, build_delete_tags(&[folder_event.id.clone()]), String::new());
    relay.publish(real_delete).await.unwrap();
    let deleted = tokio::time::timeout(Duration::from_secs(2), changes.recv()).await.unwrap().unwrap();
    assert_eq!(deleted.kind, ChangeKind::Deleted);
    assert_eq!(deleted.path.as_deref(), Some("/a"));
    assert!(index.get(&folder_event.id).await.unwrap().is_none());

    engine.dispose().await;
}

#[tokio::test]
async fn duplicate_delivery_is_idempotent() {
    let relay = Arc::new(MemoryRelayClient::new());
    let nip44 = Arc::new(PassthroughNip44);
    let index = Arc::new(MemoryIndexStore::new());
    let signer = LocalSigner::generate();
    let me = signer.pubkey();

    let engine = SyncEngine::new(relay.clone(), nip44.clone(), index.clone(), me);
    engine.start().await.unwrap();
    wait_until_live(&engine).await;
    let mut changes = engine.subscribe_changes();

    let content = DriveContent::Folder { path: "/dup".to_string() };
    let body = serde_json::to_string(&content).unwrap();
    let sealed = nip44.encrypt(body.as_bytes(), &me).unwrap();
    let event = Event::build(&signer, 1, KIND_DRIVE, vec![], sealed);

    relay.publish(event.clone()).await.unwrap();
    let first = tokio::time::timeout(Duration::from_secs(2), changes.recv()).await.unwrap().unwrap();
    assert_eq!(first.kind, ChangeKind::Added);

    // Re-publishing the same event id must not re-emit a second `added`.
    relay.publish(event.clone()).await.unwrap();
    let race = tokio::time::timeout(Duration::from_millis(200), changes.recv()).await;
    assert!(race.is_err(), "duplicate delivery must not emit a second change");

    let matches = index
        .query(&IndexFilter::new().with_path("/dup").with_content_type(ContentType::Folder))
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);

    engine.dispose().await;
}

#[tokio::test]
async fn undecryptable_event_is_dropped_silently() {
    let relay = Arc::new(MemoryRelayClient::new());
    let nip44 = Arc::new(PassthroughNip44);
    let index = Arc::new(MemoryIndexStore::new());
    let signer = LocalSigner::generate();
    let me = signer.pubkey();

    let engine = SyncEngine::new(relay.clone(), nip44, index.clone(), me);
    engine.start().await.unwrap();
    wait_until_live(&engine).await;
    let mut changes = engine.subscribe_changes();

    let garbled = Event::build(&signer, 1, KIND_DRIVE, vec![], "not valid base64 !!!".to_string());
    relay.publish(garbled.clone()).await.unwrap();

    let race = tokio::time::timeout(Duration::from_millis(200), changes.recv()).await;
    assert!(race.is_err(), "undecryptable event must be dropped, not emitted");
    assert!(index.get(&garbled.id).await.unwrap().is_none());

    engine.dispose().await;
}

#[tokio::test]
async fn dispose_rejects_further_control_operations() {
    let relay = Arc::new(MemoryRelayClient::new());
    let nip44 = Arc::new(PassthroughNip44);
    let index = Arc::new(MemoryIndexStore::new());
    let signer = LocalSigner::generate();
    let me = signer.pubkey();

    let engine = SyncEngine::new(relay, nip44, index, me);
    engine.start().await.unwrap();
    wait_until_live(&engine).await;

    engine.dispose().await;
    assert!(engine.start().await.is_err());
    assert!(engine.sync_now().await.is_err());
}
