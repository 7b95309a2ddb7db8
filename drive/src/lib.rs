//! The public facade (spec §4.F): `Drive` wires together a signer, NIP-44
//! oracle, relay client, blob client and local index behind one handle, the
//! way `s5_fs::api::FS5` wires a [`s5_fs::actor::DirActorHandle`] behind a
//! cloneable API and `s5_node` wires config into a running node.

pub mod config;
pub mod item;

pub use config::DriveConfig;
pub use drive_protocol::event::Event;
pub use drive_protocol::share::{decode_share_key, parse_share_link, SharedFileAccess};
pub use drive_sync::{ChangeEvent, ChangeKind, SyncState};
pub use item::{folder_size, DriveItem, EncryptionInfo};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use drive_index::{ContentType, IndexFilter, IndexRecord, IndexStore};
use drive_protocol::blob::BlobClient;
use drive_protocol::crypto;
use drive_protocol::error::{DriveError, DriveResult};
use drive_protocol::event::{build_delete_tags, DriveContent, Tag, KIND_DELETE, KIND_DRIVE};
use drive_protocol::nip44::{Nip44, Nip44Factory};
use drive_protocol::path;
use drive_protocol::relay::{RelayClient, RelayScope};
use drive_protocol::share::tlv::SharePointer;
use drive_protocol::share::link::build_share_link;
use drive_protocol::signer::{LocalSigner, Signer};
use drive_sync::SyncEngine;
use item::current_versions;
use tokio::sync::broadcast;

fn validate_absolute(candidate: &str) -> DriveResult<String> {
    if !path::is_absolute(candidate) {
        return Err(DriveError::invalid_argument(format!("path must be absolute: {candidate}")));
    }
    Ok(path::normalize(candidate))
}

/// Every collaborator `Drive` needs, bundled so `open` takes one argument
/// instead of seven (spec §1's external collaborators, plus the two extra
/// seams `access_shared_file`/`generate_share_link` need: [`Nip44Factory`]
/// for ephemeral share-key decryption, [`RelayScope`] for the scratch relay).
pub struct DriveDeps {
    pub signer: Arc<dyn Signer>,
    pub nip44: Arc<dyn Nip44>,
    pub nip44_factory: Arc<dyn Nip44Factory>,
    pub relay: Arc<dyn RelayClient>,
    pub scratch_relay: Arc<dyn RelayScope>,
    pub blob: Arc<dyn BlobClient>,
    pub index: Arc<dyn IndexStore>,
}

/// The drive handle. Cheap to clone: every field is an `Arc`.
#[derive(Clone)]
pub struct Drive {
    signer: Arc<dyn Signer>,
    nip44: Arc<dyn Nip44>,
    nip44_factory: Arc<dyn Nip44Factory>,
    relay: Arc<dyn RelayClient>,
    scratch_relay: Arc<dyn RelayScope>,
    blob: Arc<dyn BlobClient>,
    index: Arc<dyn IndexStore>,
    engine: Arc<SyncEngine>,
    config: DriveConfig,
}

impl Drive {
    /// Wires the collaborators together and starts the sync engine's
    /// subscription loop.
    pub async fn open(config: DriveConfig, deps: DriveDeps) -> DriveResult<Self> {
        let me = deps.signer.pubkey();
        let engine = Arc::new(SyncEngine::new(deps.relay.clone(), deps.nip44.clone(), deps.index.clone(), me));
        engine.start().await?;
        Ok(Self {
            signer: deps.signer,
            nip44: deps.nip44,
            nip44_factory: deps.nip44_factory,
            relay: deps.relay,
            scratch_relay: deps.scratch_relay,
            blob: deps.blob,
            index: deps.index,
            engine,
            config,
        })
    }

    fn me_hex(&self) -> String {
        hex::encode(self.signer.pubkey())
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Current sync engine state (spec §4.F state machines).
    pub async fn sync_state(&self) -> SyncState {
        self.engine.state().await
    }

    /// A fresh receiver onto the bounded, drop-oldest change-notification
    /// stream (spec §5, §6).
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.engine.subscribe_changes()
    }

    /// Rebinds the engine to a different logged-in identity and index.
    pub async fn switch_account(&mut self, signer: Arc<dyn Signer>, index: Arc<dyn IndexStore>) -> DriveResult<()> {
        let me = signer.pubkey();
        self.engine.on_account_changed(me, index.clone()).await?;
        self.signer = signer;
        self.index = index;
        Ok(())
    }

    /// Closes the change-notification stream and stops the sync engine;
    /// subsequent operations return [`DriveError::ConcurrencyTerminated`].
    pub async fn dispose(&self) {
        self.engine.dispose().await
    }

    /// Seals `content` to `to_pubkey` under NIP-44 and signs a fresh DRIVE
    /// event carrying it.
    fn seal_and_sign(&self, content: &DriveContent, to_pubkey: &[u8; 32], tags: Vec<Tag>) -> DriveResult<Event> {
        let body = serde_json::to_vec(content)
            .map_err(|e| DriveError::invalid_argument(format!("failed to serialise drive content: {e}")))?;
        let sealed = self.nip44.encrypt(&body, to_pubkey)?;
        let created_at = chrono::Utc::now().timestamp();
        Ok(Event::build(&*self.signer, created_at, KIND_DRIVE, tags, sealed))
    }

    async fn publish(&self, event: Event) -> DriveResult<()> {
        self.relay.publish(event).await
    }

    /// Scans the index for items visible to `me` within `path`'s scope
    /// (spec §4.F `list`), reduced to current versions.
    pub async fn list(&self, path: &str, mime_types: &[String], recursive: bool) -> DriveResult<Vec<DriveItem>> {
        self.engine.ensure_active()?;
        let path = validate_absolute(path)?;
        let me_hex = self.me_hex();
        let mime_lower: Vec<String> = mime_types.iter().map(|m| m.to_lowercase()).collect();

        let filter = IndexFilter::new().with_predicate(move |record: &IndexRecord| {
            if !record.event.is_accessible_to(&me_hex) {
                return false;
            }
            let item_path = record.path();
            let in_scope = item_path == path || if recursive {
                path::is_within(&path, item_path)
            } else {
                path::dirname(item_path) == path
            };
            if !in_scope {
                return false;
            }
            if mime_lower.is_empty() {
                return true;
            }
            match &record.decrypted_content {
                DriveContent::File { file_type: Some(file_type), .. } => mime_lower.contains(&file_type.to_lowercase()),
                _ => false,
            }
        });

        let records = self.index.query(&filter).await?;
        let reduced = current_versions(records);
        Ok(reduced.iter().map(DriveItem::from_record).collect())
    }

    /// All versions of the file at `path`, newest first (spec §4.F
    /// `get_file_versions`).
    pub async fn get_file_versions(&self, path: &str) -> DriveResult<Vec<DriveItem>> {
        self.engine.ensure_active()?;
        let path = validate_absolute(path)?;
        let me_hex = self.me_hex();

        let filter = IndexFilter::new()
            .with_content_type(ContentType::File)
            .with_path(path)
            .with_predicate(move |record: &IndexRecord| record.event.is_accessible_to(&me_hex))
            .sorted_desc_by_created_at();

        let records = self.index.query(&filter).await?;
        Ok(records.iter().map(DriveItem::from_record).collect())
    }

    /// Creates an empty folder. A no-op, not an error, when an accessible
    /// folder already exists at `path` (spec §4.F `create_folder`).
    pub async fn create_folder(&self, path: &str) -> DriveResult<()> {
        self.engine.ensure_active()?;
        let path = validate_absolute(path)?;
        let me_hex = self.me_hex();

        let existing = self
            .index
            .query(
                &IndexFilter::new()
                    .with_content_type(ContentType::Folder)
                    .with_path(path.clone())
                    .with_predicate(move |record: &IndexRecord| record.event.is_accessible_to(&me_hex)),
            )
            .await?;
        if !existing.is_empty() {
            return Ok(());
        }

        let content = DriveContent::Folder { path: path.clone() };
        let me = self.signer.pubkey();
        let event = self.seal_and_sign(&content, &me, Vec::new())?;
        self.index.put(IndexRecord::new(event.clone(), content)).await?;
        self.publish(event).await?;
        self.engine.emit(ChangeKind::Added, Some(path));
        Ok(())
    }

    /// Encrypts (unless `encrypt` is false), uploads, and indexes a new file
    /// version (spec §4.F `upload_file`).
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        path: &str,
        mime: Option<String>,
        encrypt: bool,
    ) -> DriveResult<DriveItem> {
        self.engine.ensure_active()?;
        let path = validate_absolute(path)?;

        let (upload_bytes, encryption_algorithm, decryption_key, decryption_nonce) = if encrypt {
            let encrypted = crypto::encrypt(&bytes);
            (
                encrypted.blob,
                Some(crypto::ALGORITHM_AES_GCM.to_string()),
                Some(crypto::key_to_b64(&encrypted.key)),
                Some(crypto::nonce_to_b64(&encrypted.nonce)),
            )
        } else {
            (bytes, None, None, None)
        };

        let size = upload_bytes.len() as u64;
        let descriptor = self.blob.put(upload_bytes).await?;
        tracing::info!(hash = %descriptor.sha256, %size, %path, "uploaded file");

        let content = DriveContent::File {
            hash: descriptor.sha256,
            path: path.clone(),
            size,
            file_type: mime,
            encryption_algorithm,
            decryption_key,
            decryption_nonce,
        };
        let me = self.signer.pubkey();
        let event = self.seal_and_sign(&content, &me, Vec::new())?;
        let item = DriveItem::from_parts(&event.id, event.created_at, &content);
        self.index.put(IndexRecord::new(event.clone(), content)).await?;
        self.publish(event).await?;
        self.engine.emit(ChangeKind::Added, Some(path));
        Ok(item)
    }

    /// Fetches and, if `key`/`nonce` are present, decrypts the bytes behind
    /// `hash` (spec §4.F `download_file`).
    pub async fn download_file(&self, hash: &str, key_b64: Option<&str>, nonce_b64: Option<&str>) -> DriveResult<Vec<u8>> {
        self.engine.ensure_active()?;
        let bytes = self.blob.get(hash).await?;
        match (key_b64, nonce_b64) {
            (Some(key_b64), Some(nonce_b64)) => {
                let key = crypto::validate_key_b64(key_b64)?;
                let nonce = crypto::validate_nonce_b64(nonce_b64)?;
                let ciphertext_len = bytes.len();
                crypto::decrypt(&bytes, &key, &nonce).map_err(|_| {
                    DriveError::crypto_failed(format!(
                        "decryption failed: {ciphertext_len}-byte ciphertext, {}-byte key, {}-byte nonce",
                        key.len(),
                        nonce.len()
                    ))
                })
            }
            _ => Ok(bytes),
        }
    }

    /// Deletes a single event by id. Refuses unless `event_id` was authored
    /// by me; a missing `event_id` is a no-op, not an error, consistent with
    /// idempotent deletion (spec §4.F `delete_by_id`, §7, §8 Property 7).
    pub async fn delete_by_id(&self, event_id: &str) -> DriveResult<()> {
        self.engine.ensure_active()?;
        self.delete_by_id_internal(event_id, true).await?;
        Ok(())
    }

    /// Shared by `delete_by_id` and `delete_by_path`'s cascade: `emit`
    /// suppresses the per-event notification so the cascading caller can
    /// emit exactly once, on the root path, after every child is gone.
    /// Returns `Ok(None)` without publishing a tombstone or emitting a change
    /// when `event_id` is absent (spec §7 "NotFound on delete is a no-op").
    async fn delete_by_id_internal(&self, event_id: &str, emit: bool) -> DriveResult<Option<String>> {
        let me_hex = self.me_hex();
        let Some(record) = self.index.get(event_id).await? else {
            return Ok(None);
        };
        if record.event.pubkey != me_hex {
            return Err(DriveError::unauthorized("cannot delete an event authored by someone else"));
        }
        let path = record.path().to_string();
        self.index.delete(event_id).await?;

        let tags = build_delete_tags(&[event_id.to_string()]);
        let delete_event = Event::build(&*self.signer, chrono::Utc::now().timestamp(), KIND_DELETE, tags, String::new());
        self.publish(delete_event).await?;

        if emit {
            self.engine.emit(ChangeKind::Deleted, Some(path.clone()));
        }
        Ok(Some(path))
    }

    /// Deletes every own record at `path`; if it names a folder, every own
    /// record anywhere underneath it first (spec §4.F `delete_by_path`). A
    /// no-op, not an error, when no accessible record of mine exists at
    /// `path` (spec §7, §8 Property 7).
    pub async fn delete_by_path(&self, path: &str) -> DriveResult<()> {
        self.engine.ensure_active()?;
        let path = validate_absolute(path)?;
        let me_hex = self.me_hex();

        let own_records = self
            .index
            .query(&IndexFilter::new().with_pubkey(me_hex.clone()).with_path(path.clone()))
            .await?;
        if own_records.is_empty() {
            return Ok(());
        }

        let is_folder = own_records.iter().any(|record| !record.decrypted_content.is_file());
        if is_folder {
            let descendant_of = path.clone();
            let children = self
                .index
                .query(
                    &IndexFilter::new()
                        .with_pubkey(me_hex.clone())
                        .with_predicate(move |record: &IndexRecord| path::is_within(&descendant_of, record.path())),
                )
                .await?;
            for child in children {
                self.delete_by_id_internal(&child.event.id, false).await?;
            }
        }

        for record in &own_records {
            self.delete_by_id_internal(&record.event.id, false).await?;
        }

        self.engine.emit(ChangeKind::Deleted, Some(path));
        Ok(())
    }

    /// Renames every own version of `old` (and, recursively, every child of
    /// a moved folder) to `new` (spec §4.F `move`). A new event is signed
    /// per version rather than carrying a rename tag, preserving the
    /// versioning invariant and keeping the projection rule in
    /// `drive_sync` uniform.
    pub fn move_item<'a>(&'a self, old: &'a str, new: &'a str) -> Pin<Box<dyn Future<Output = DriveResult<()>> + Send + 'a>> {
        Box::pin(async move {
            self.engine.ensure_active()?;
            let old = validate_absolute(old)?;
            let new = validate_absolute(new)?;
            let me_hex = self.me_hex();

            let versions = self
                .index
                .query(&IndexFilter::new().with_pubkey(me_hex.clone()).with_path(old.clone()))
                .await?;
            if versions.is_empty() {
                return Err(DriveError::not_found(format!("no event authored by me at path {old}")));
            }
            let is_folder = versions.iter().any(|record| !record.decrypted_content.is_file());

            let me = self.signer.pubkey();
            for record in &versions {
                let moved_content = record.decrypted_content.with_path(new.clone());
                let tags = record.event.tags.clone();
                let new_event = self.seal_and_sign(&moved_content, &me, tags)?;
                self.index.put(IndexRecord::new(new_event.clone(), moved_content)).await?;
                self.publish(new_event).await?;
                self.delete_by_id_internal(&record.event.id, false).await?;
            }

            if is_folder {
                for child_path in self.direct_children(&me_hex, &old).await? {
                    let child_new = path::join(&new, &path::basename(&child_path));
                    self.move_item(&child_path, &child_new).await?;
                }
            }

            self.engine.emit(ChangeKind::Deleted, Some(old));
            self.engine.emit(ChangeKind::Added, Some(new));
            Ok(())
        })
    }

    /// Same as [`Self::move_item`] but the originals are left untouched and
    /// only `added` is emitted (spec §4.F `copy`).
    pub fn copy_item<'a>(&'a self, src: &'a str, dst: &'a str) -> Pin<Box<dyn Future<Output = DriveResult<()>> + Send + 'a>> {
        Box::pin(async move {
            self.engine.ensure_active()?;
            let src = validate_absolute(src)?;
            let dst = validate_absolute(dst)?;
            let me_hex = self.me_hex();

            let versions = self
                .index
                .query(&IndexFilter::new().with_pubkey(me_hex.clone()).with_path(src.clone()))
                .await?;
            if versions.is_empty() {
                return Err(DriveError::not_found(format!("no event authored by me at path {src}")));
            }
            let is_folder = versions.iter().any(|record| !record.decrypted_content.is_file());

            let me = self.signer.pubkey();
            for record in &versions {
                let copied_content = record.decrypted_content.with_path(dst.clone());
                let tags = record.event.tags.clone();
                let new_event = self.seal_and_sign(&copied_content, &me, tags)?;
                self.index.put(IndexRecord::new(new_event.clone(), copied_content)).await?;
                self.publish(new_event).await?;
            }

            if is_folder {
                for child_path in self.direct_children(&me_hex, &src).await? {
                    let child_dst = path::join(&dst, &path::basename(&child_path));
                    self.copy_item(&child_path, &child_dst).await?;
                }
            }

            self.engine.emit(ChangeKind::Added, Some(dst));
            Ok(())
        })
    }

    /// Distinct paths of my own records whose parent is exactly `parent`
    /// (one level down; `move`/`copy` recurse to reach deeper levels).
    async fn direct_children(&self, me_hex: &str, parent: &str) -> DriveResult<Vec<String>> {
        let me_hex = me_hex.to_string();
        let parent = parent.to_string();
        let records = self
            .index
            .query(
                &IndexFilter::new()
                    .with_pubkey(me_hex)
                    .with_predicate(move |record: &IndexRecord| path::dirname(record.path()) == parent),
            )
            .await?;
        let mut seen = std::collections::HashSet::new();
        let mut children = Vec::new();
        for record in records {
            if seen.insert(record.path().to_string()) {
                children.push(record.path().to_string());
            }
        }
        Ok(children)
    }

    /// Case-insensitive substring match over basename, full path, and (for
    /// files) `file-type`, current-version, sorted ascending by path (spec
    /// §4.F `search`).
    pub async fn search(&self, query: &str) -> DriveResult<Vec<DriveItem>> {
        self.engine.ensure_active()?;
        let me_hex = self.me_hex();
        let needle = query.to_lowercase();

        let filter = IndexFilter::new().with_predicate(move |record: &IndexRecord| {
            if !record.event.is_accessible_to(&me_hex) {
                return false;
            }
            let item_path = record.path();
            if item_path.to_lowercase().contains(&needle) {
                return true;
            }
            if path::basename(item_path).to_lowercase().contains(&needle) {
                return true;
            }
            if let DriveContent::File { file_type: Some(file_type), .. } = &record.decrypted_content {
                if file_type.to_lowercase().contains(&needle) {
                    return true;
                }
            }
            false
        });

        let records = self.index.query(&filter).await?;
        let mut reduced = current_versions(records);
        reduced.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(reduced.iter().map(DriveItem::from_record).collect())
    }

    /// Re-seals `event_id`'s metadata to `recipient_pubkey_hex` and
    /// publishes the share event (spec §4.F `share_with_user`). Returns the
    /// new event so callers (e.g. `generate_share_link`) can reference it.
    pub async fn share_with_user(&self, event_id: &str, recipient_pubkey_hex: &str) -> DriveResult<Event> {
        self.engine.ensure_active()?;
        let me_hex = self.me_hex();
        let record = self
            .index
            .get(event_id)
            .await?
            .ok_or_else(|| DriveError::not_found(format!("no such event: {event_id}")))?;
        if record.event.pubkey != me_hex {
            return Err(DriveError::unauthorized("cannot share an event authored by someone else"));
        }
        let recipient: [u8; 32] = hex::decode(recipient_pubkey_hex)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| DriveError::invalid_argument("recipient pubkey must be 32 bytes of hex"))?;

        let tags = vec![vec!["p".to_string(), recipient_pubkey_hex.to_string()]];
        let share_event = self.seal_and_sign(&record.decrypted_content, &recipient, tags)?;
        let path = record.path().to_string();
        let shared_record = IndexRecord::shared(
            share_event.clone(),
            record.decrypted_content.clone(),
            recipient_pubkey_hex,
            event_id,
        );
        self.index.put(shared_record).await?;
        self.publish(share_event.clone()).await?;
        self.engine.emit(ChangeKind::Shared, Some(path));
        Ok(share_event)
    }

    /// Mints a fresh share keypair, shares `event_id` to its public half,
    /// and wraps the pointer and private key as a share link (spec §4.F
    /// `generate_share_link`).
    pub async fn generate_share_link(
        &self,
        event_id: &str,
        password: Option<&str>,
        base_url: &str,
        relays: Vec<String>,
    ) -> DriveResult<String> {
        self.engine.ensure_active()?;
        let share_signer = LocalSigner::generate();
        let pk_share = share_signer.pubkey();

        let share_event = self.share_with_user(event_id, &hex::encode(pk_share)).await?;
        let event_id_bytes: [u8; 32] = hex::decode(&share_event.id)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| DriveError::invalid_argument("malformed share event id"))?;

        let mut pointer = SharePointer::new(event_id_bytes);
        pointer.relays = relays;
        pointer.author = Some(self.signer.pubkey());
        pointer.kind = Some(KIND_DRIVE);

        let sk_share = share_signer.secret_bytes();
        build_share_link(base_url, &pointer, &sk_share, password)
    }

    /// Resolves a share link's secret over a scratch relay client, with no
    /// side effect on the main index; the scratch client is dropped on every
    /// exit path (spec §4.F `access_shared_file`).
    pub async fn access_shared_file(&self, nevent: &str, sk_share_hex: &str) -> DriveResult<DriveItem> {
        let pointer = SharePointer::decode(nevent)?;
        let sk_share: [u8; 32] = hex::decode(sk_share_hex)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| DriveError::invalid_argument("share secret key must be 32 bytes of hex"))?;
        let pk_share = LocalSigner::from_bytes(&sk_share)
            .map_err(|e| DriveError::invalid_argument(format!("invalid share secret key: {e}")))?
            .pubkey();

        let relays = if pointer.relays.is_empty() {
            self.config.relays.clone()
        } else {
            pointer.relays.clone()
        };
        let scratch = self.scratch_relay.open(&relays);
        let result = self.access_shared_file_via(&scratch, &pointer, &sk_share, &pk_share).await;
        drop(scratch);
        result
    }

    async fn access_shared_file_via(
        &self,
        scratch: &Arc<dyn RelayClient>,
        pointer: &SharePointer,
        sk_share: &[u8; 32],
        pk_share: &[u8; 32],
    ) -> DriveResult<DriveItem> {
        let event_id_hex = hex::encode(pointer.event_id);
        let event = scratch
            .fetch_event(&event_id_hex)
            .await?
            .ok_or_else(|| DriveError::not_found(format!("shared event {event_id_hex} not found on scratch relays")))?;

        let pk_share_hex = hex::encode(pk_share);
        if !event.p_tag_recipients().iter().any(|p| *p == pk_share_hex) {
            return Err(DriveError::unauthorized("share key is not a recipient of the shared event"));
        }

        let author: [u8; 32] = hex::decode(&event.pubkey)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| DriveError::invalid_argument("malformed event author"))?;

        let ephemeral_nip44 = self.nip44_factory.for_secret(sk_share);
        let plaintext = ephemeral_nip44.decrypt(&event.content, &author)?;
        let body = String::from_utf8(plaintext).map_err(|_| DriveError::crypto_failed("decrypted share payload was not utf8"))?;
        let content = drive_protocol::event::parse_drive_content(&body)?;
        Ok(DriveItem::from_parts(&event.id, event.created_at, &content))
    }
}

