//! The relay transport boundary (external collaborator).
//!
//! A narrow async-trait seam: the sync engine drives this trait without
//! knowing which transport backs it. `drive_relay_memory` supplies the
//! in-memory stub used by this workspace's own tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::DriveResult;
use crate::event::{Event, KIND_DELETE, KIND_DRIVE};

/// One leg of the sync engine's server-side-unioned subscription.
#[derive(Clone, Debug, Default)]
pub struct RelayFilter {
    pub kinds: Vec<u32>,
    pub authors: Vec<String>,
    pub p_tags: Vec<String>,
    pub since: Option<i64>,
}

impl RelayFilter {
    /// `kinds ∈ {DRIVE, DELETE}`, `authors = [me]`, `since = watermark`.
    pub fn own_events(me_pubkey: impl Into<String>, since: Option<i64>) -> Self {
        Self {
            kinds: vec![KIND_DRIVE, KIND_DELETE],
            authors: vec![me_pubkey.into()],
            p_tags: Vec::new(),
            since,
        }
    }

    /// `kinds ∈ {DRIVE}`, `p-tags = [me]`, `since = watermark`.
    pub fn inbound_shares(me_pubkey: impl Into<String>, since: Option<i64>) -> Self {
        Self {
            kinds: vec![KIND_DRIVE],
            authors: Vec::new(),
            p_tags: vec![me_pubkey.into()],
            since,
        }
    }

    /// True if `event` would be delivered by this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&event.kind) {
            return false;
        }
        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }
        let author_ok = self.authors.is_empty() || self.authors.iter().any(|a| a == &event.pubkey);
        let p_tag_ok = self.p_tags.is_empty()
            || event
                .p_tag_recipients()
                .iter()
                .any(|p| self.p_tags.iter().any(|wanted| wanted == p));
        // Each leg gates independently: an absent `authors`/`p_tags` constraint
        // is vacuously satisfied, but a present one must actually match.
        author_ok && p_tag_ok
    }
}

/// A live subscription: events are delivered on a single cooperative channel,
/// matching the sync engine's "single cooperative stream" requirement.
pub struct RelaySubscription {
    pub events: mpsc::Receiver<Event>,
}

#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Publishes a signed event. A failed publish is surfaced to the caller
    /// but never rolled back locally: the index write has already happened.
    async fn publish(&self, event: Event) -> DriveResult<()>;

    /// Opens one subscription carrying `filters`, unioned server-side.
    async fn subscribe(&self, filters: Vec<RelayFilter>) -> DriveResult<RelaySubscription>;

    /// Fetches a single event by id; used by the scratch client behind
    /// `access_shared_file`. `Ok(None)` means the relay does not have it.
    async fn fetch_event(&self, id: &str) -> DriveResult<Option<Event>>;
}

/// Opens a scratch, unshared [`RelayClient`] scoped to a set of relay URLs.
/// Implementations should default to a small bundled relay set when
/// `relays` is empty, and the returned client is torn down by the caller on
/// all exit paths — simply dropping the `Arc`.
pub trait RelayScope: Send + Sync {
    fn open(&self, relays: &[String]) -> Arc<dyn RelayClient>;
}
