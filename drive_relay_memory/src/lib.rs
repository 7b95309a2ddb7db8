//! An in-memory `RelayClient` stub that echoes every broadcast back on its own
//! subscription (spec §8's end-to-end scenario harness: "a stub relay that
//! echoes broadcasts back on the subscription").
//!
//! Grounded on `blob_stores/memory::MemoryStore`'s in-memory test-double
//! pattern, adapted from a keyed store to a publish/subscribe log: every
//! published event is both retained (for late subscribers / historical
//! replay against `since`) and fanned out live via a `tokio::sync::broadcast`
//! channel.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use drive_protocol::error::DriveResult;
use drive_protocol::event::Event;
use drive_protocol::relay::{RelayClient, RelayFilter, RelayScope, RelaySubscription};
use tokio::sync::{broadcast, mpsc};

const LIVE_BROADCAST_CAPACITY: usize = 1024;
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// A single-process relay: all state lives in this struct, nothing crosses a
/// network boundary. Suitable only for tests and the scenarios in spec §8.
pub struct MemoryRelayClient {
    events: Mutex<Vec<Event>>,
    live: broadcast::Sender<Event>,
}

impl Default for MemoryRelayClient {
    fn default() -> Self {
        let (live, _) = broadcast::channel(LIVE_BROADCAST_CAPACITY);
        Self {
            events: Mutex::new(Vec::new()),
            live,
        }
    }
}

impl MemoryRelayClient {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_any(filters: &[RelayFilter], event: &Event) -> bool {
    filters.is_empty() || filters.iter().any(|f| f.matches(event))
}

#[async_trait]
impl RelayClient for MemoryRelayClient {
    async fn publish(&self, event: Event) -> DriveResult<()> {
        self.events.lock().expect("relay event log mutex poisoned").push(event.clone());
        // No subscribers is a normal state (e.g. between `start()` calls);
        // a send error just means nobody is listening right now.
        let _ = self.live.send(event);
        Ok(())
    }

    async fn subscribe(&self, filters: Vec<RelayFilter>) -> DriveResult<RelaySubscription> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let mut live_rx = self.live.subscribe();

        let historical: Vec<Event> = {
            let guard = self.events.lock().expect("relay event log mutex poisoned");
            guard.iter().filter(|e| matches_any(&filters, e)).cloned().collect()
        };

        tokio::spawn(async move {
            for event in historical {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            loop {
                match live_rx.recv().await {
                    Ok(event) => {
                        if matches_any(&filters, &event) && tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    // A lagging subscriber drops the oldest buffered events and
                    // resumes with the next available one rather than erroring.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });

        Ok(RelaySubscription { events: rx })
    }

    async fn fetch_event(&self, id: &str) -> DriveResult<Option<Event>> {
        let guard = self.events.lock().expect("relay event log mutex poisoned");
        Ok(guard.iter().find(|e| e.id == id).cloned())
    }
}

/// Opens the same shared in-process relay regardless of the requested URLs
/// (spec §4.F `access_shared_file`'s "scratch relay client scoped to
/// relays"). A single-process workspace has nowhere else for a scratch
/// client to reach; real deployments hand `RelayScope` a client that opens a
/// fresh connection set per call instead.
pub struct SharedRelayScope {
    relay: Arc<MemoryRelayClient>,
}

impl SharedRelayScope {
    pub fn new(relay: Arc<MemoryRelayClient>) -> Self {
        Self { relay }
    }
}

impl RelayScope for SharedRelayScope {
    fn open(&self, _relays: &[String]) -> Arc<dyn RelayClient> {
        self.relay.clone()
    }
}
