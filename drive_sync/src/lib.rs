//! The sync engine (spec §4.E): maintains a live relay subscription,
//! decrypts and deduplicates incoming events, projects them into the local
//! index, and emits change notifications.
//!
//! Grounded on `s5_fs::actor::DirActor::run`/`process_msg` — a single
//! cooperative task owning all mutable state, processing one message (here:
//! one relay event) at a time — generalised from a tree of child actors to a
//! flat event-ingestion loop, because the local index is a flat KV table
//! rather than a tree of directory actors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use drive_index::{IndexRecord, IndexStore};
use drive_protocol::error::{DriveError, DriveResult};
use drive_protocol::event::{parse_drive_content, Event, KIND_DELETE, KIND_DRIVE};
use drive_protocol::nip44::Nip44;
use drive_protocol::relay::{RelayClient, RelayFilter};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Bounded change-notification fan-out (spec §5): slow consumers must not
/// back-pressure the engine, so the buffer drops the oldest unread event on
/// overflow rather than blocking the ingest loop. `tokio::sync::broadcast`
/// implements exactly this policy — a lagging receiver's next `recv()` skips
/// forward past whatever it missed instead of stalling the sender.
const CHANGE_BROADCAST_CAPACITY: usize = 256;

const RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// `Idle → Subscribing → Live ⇄ Reconnecting → Stopped` (spec §4.F state
/// machines).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Subscribing,
    Live,
    Reconnecting,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Deleted,
    Updated,
    Shared,
}

/// `{type, path?, timestamp}` (spec §6).
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: Option<String>,
    pub timestamp: i64,
}

impl ChangeEvent {
    fn new(kind: ChangeKind, path: Option<String>) -> Self {
        Self {
            kind,
            path,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

struct EngineState {
    index: Arc<dyn IndexStore>,
    me: [u8; 32],
}

/// Owns the relay subscription lifecycle and projects incoming events into
/// the local index. One engine instance per logged-in identity.
pub struct SyncEngine {
    relay: Arc<dyn RelayClient>,
    nip44: Arc<dyn Nip44>,
    state: RwLock<EngineState>,
    phase: Arc<RwLock<SyncState>>,
    change_tx: broadcast::Sender<ChangeEvent>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl SyncEngine {
    pub fn new(relay: Arc<dyn RelayClient>, nip44: Arc<dyn Nip44>, index: Arc<dyn IndexStore>, me: [u8; 32]) -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_BROADCAST_CAPACITY);
        Self {
            relay,
            nip44,
            state: RwLock::new(EngineState { index, me }),
            phase: Arc::new(RwLock::new(SyncState::Idle)),
            change_tx,
            task: tokio::sync::Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub async fn state(&self) -> SyncState {
        *self.phase.read().await
    }

    /// A fresh `Receiver` onto the bounded, drop-oldest change-notification
    /// stream. Any number of consumers may subscribe independently.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.change_tx.subscribe()
    }

    /// Publishes a change notification directly, for callers that already
    /// know the outcome of a local write (the facade's own operations)
    /// rather than waiting for the event to round-trip through the relay
    /// subscription. Silently dropped if there are no subscribers.
    pub fn emit(&self, kind: ChangeKind, path: Option<String>) {
        let _ = self.change_tx.send(ChangeEvent::new(kind, path));
    }

    fn check_disposed(&self) -> DriveResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(DriveError::ConcurrencyTerminated);
        }
        Ok(())
    }

    /// Public gate for callers built on top of this engine (the `drive`
    /// facade): returns [`DriveError::ConcurrencyTerminated`] once
    /// [`Self::dispose`] has run, so every write operation can refuse itself
    /// up front the same way the engine's own control methods do.
    pub fn ensure_active(&self) -> DriveResult<()> {
        self.check_disposed()
    }

    /// Reads the watermark, opens the unioned own/inbound-share subscription,
    /// and spawns the ingest loop. Idempotent: a prior subscription is
    /// cancelled first.
    pub async fn start(&self) -> DriveResult<()> {
        self.check_disposed()?;
        self.cancel_task().await;
        *self.phase.write().await = SyncState::Subscribing;

        let relay = self.relay.clone();
        let nip44 = self.nip44.clone();
        let change_tx = self.change_tx.clone();
        let index = self.state.read().await.index.clone();
        let me = self.state.read().await.me;
        let phase = self.phase.clone();

        let handle = tokio::spawn(run_ingest_loop(relay, nip44, index, me, change_tx, phase));
        *self.task.lock().await = Some(handle);
        Ok(())
    }

    /// Cancels the subscription. Cancellation aborts the background reader
    /// between events, never mid-write, so no half-applied index writes are
    /// left behind (spec §5).
    pub async fn stop(&self) {
        self.cancel_task().await;
        *self.phase.write().await = SyncState::Stopped;
    }

    async fn cancel_task(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
        }
    }

    /// Cancels the subscription, rebinds to a new identity/index pair, and
    /// restarts. The watermark is not a field of this engine — it is always
    /// derived from whichever index is active — so "clearing the watermark"
    /// falls out of simply pointing at the new (per-account) index.
    pub async fn on_account_changed(&self, new_me: [u8; 32], new_index: Arc<dyn IndexStore>) -> DriveResult<()> {
        self.check_disposed()?;
        self.cancel_task().await;
        {
            let mut state = self.state.write().await;
            state.me = new_me;
            state.index = new_index;
        }
        self.start().await
    }

    /// A no-op beyond a relay-side flush: when the subscription is already
    /// live there is nothing further to await (spec §4.E).
    pub async fn sync_now(&self) -> DriveResult<()> {
        self.check_disposed()?;
        Ok(())
    }

    /// Closes the change-notification stream and marks the engine terminal;
    /// subsequent operations return `ConcurrencyTerminated`.
    pub async fn dispose(&self) {
        self.cancel_task().await;
        self.disposed.store(true, Ordering::SeqCst);
        *self.phase.write().await = SyncState::Stopped;
    }

}

async fn run_ingest_loop(
    relay: Arc<dyn RelayClient>,
    nip44: Arc<dyn Nip44>,
    index: Arc<dyn IndexStore>,
    me: [u8; 32],
    change_tx: broadcast::Sender<ChangeEvent>,
    phase: Arc<RwLock<SyncState>>,
) {
    let me_hex = hex::encode(me);
    loop {
        let watermark = index.watermark().await.unwrap_or_default();
        let filters = vec![
            RelayFilter::own_events(me_hex.clone(), watermark),
            RelayFilter::inbound_shares(me_hex.clone(), watermark),
        ];

        let subscription = match relay.subscribe(filters).await {
            Ok(sub) => sub,
            Err(error) => {
                tracing::warn!(%error, "relay subscribe failed, retrying");
                *phase.write().await = SyncState::Reconnecting;
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        *phase.write().await = SyncState::Live;
        let mut events = subscription.events;
        while let Some(event) = events.recv().await {
            if let Err(error) = ingest_event(&*index, &*nip44, me, &event, &change_tx).await {
                tracing::warn!(event_id = %event.id, %error, "dropping event after ingest failure");
            }
        }

        tracing::debug!("relay subscription ended, reconnecting");
        *phase.write().await = SyncState::Reconnecting;
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// The per-event state machine of spec §4.E step 1-3 / §4.F "individual event
/// transition": `Received → Decryptable? → Parsable? → Indexed →
/// (optionally) Tombstoned`.
async fn ingest_event(
    index: &dyn IndexStore,
    nip44: &dyn Nip44,
    me: [u8; 32],
    event: &Event,
    change_tx: &broadcast::Sender<ChangeEvent>,
) -> DriveResult<()> {
    // Step 1: idempotence.
    if index.get(&event.id).await?.is_some() {
        return Ok(());
    }

    if event.kind == KIND_DELETE {
        for target_id in event.e_tag_targets() {
            let Some(record) = index.get(target_id).await? else {
                // Blind delete of a not-yet-seen target: nothing to remove
                // locally yet (spec §4.E step 2).
                continue;
            };
            if record.event.pubkey != event.pubkey {
                continue;
            }
            index.delete(target_id).await?;
            let _ = change_tx.send(ChangeEvent::new(ChangeKind::Deleted, Some(record.path().to_string())));
        }
        return Ok(());
    }

    if event.kind != KIND_DRIVE {
        return Ok(());
    }

    let me_hex = hex::encode(me);
    let sender_pubkey = if event.pubkey == me_hex {
        me
    } else {
        match hex::decode(&event.pubkey).ok().and_then(|v| v.try_into().ok()) {
            Some(bytes) => bytes,
            None => return Ok(()), // malformed author, drop silently
        }
    };

    let plaintext = match nip44.decrypt(&event.content, &sender_pubkey) {
        Ok(p) => p,
        Err(error) => {
            tracing::debug!(event_id = %event.id, %error, "undecryptable event dropped");
            return Ok(());
        }
    };
    let Ok(body) = String::from_utf8(plaintext) else {
        return Ok(());
    };
    let content = match parse_drive_content(&body) {
        Ok(c) => c,
        Err(error) => {
            tracing::debug!(event_id = %event.id, %error, "unparsable event content dropped");
            return Ok(());
        }
    };

    let path = content.path().to_string();
    index.put(IndexRecord::new(event.clone(), content)).await?;
    let _ = change_tx.send(ChangeEvent::new(ChangeKind::Added, Some(path)));
    Ok(())
}
