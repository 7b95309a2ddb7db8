//! The stored record shape (spec §3 IndexRecord, §6 persisted-index contract)
//! and the predicate-based filter used to query it (spec §4.D, §9).

use std::sync::Arc;

use drive_protocol::{DriveContent, Event};
use serde::{Deserialize, Serialize};

/// `{event, decrypted_content, derived_fields}` (spec §3). `shared_with` and
/// `original_event_id` are the two derived fields the spec names explicitly;
/// both are only ever set on outbound share events.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IndexRecord {
    #[serde(rename = "nostrEvent")]
    pub event: Event,
    #[serde(rename = "decryptedContent")]
    pub decrypted_content: DriveContent,
    #[serde(rename = "sharedWith", skip_serializing_if = "Option::is_none", default)]
    pub shared_with: Option<String>,
    #[serde(rename = "originalEventId", skip_serializing_if = "Option::is_none", default)]
    pub original_event_id: Option<String>,
}

impl IndexRecord {
    pub fn new(event: Event, decrypted_content: DriveContent) -> Self {
        Self {
            event,
            decrypted_content,
            shared_with: None,
            original_event_id: None,
        }
    }

    pub fn shared(event: Event, decrypted_content: DriveContent, recipient: impl Into<String>, original_event_id: impl Into<String>) -> Self {
        Self {
            event,
            decrypted_content,
            shared_with: Some(recipient.into()),
            original_event_id: Some(original_event_id.into()),
        }
    }

    pub fn path(&self) -> &str {
        self.decrypted_content.path()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    File,
    Folder,
}

type Predicate = Arc<dyn Fn(&IndexRecord) -> bool + Send + Sync>;

/// A composable filter over index records (spec §4.D, §9 "predicate-based
/// index queries"): equality filters compose with an optional full-record
/// predicate used for tag scans and path-prefix scans.
#[derive(Clone, Default)]
pub struct IndexFilter {
    pub pubkey: Option<String>,
    pub content_type: Option<ContentType>,
    pub path: Option<String>,
    predicate: Option<Predicate>,
    pub sort_desc_by_created_at: bool,
    pub limit: Option<usize>,
}

impl IndexFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pubkey(mut self, pubkey: impl Into<String>) -> Self {
        self.pubkey = Some(pubkey.into());
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_predicate(mut self, predicate: impl Fn(&IndexRecord) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn sorted_desc_by_created_at(mut self) -> Self {
        self.sort_desc_by_created_at = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &IndexRecord) -> bool {
        if let Some(pubkey) = &self.pubkey {
            if record.event.pubkey != *pubkey {
                return false;
            }
        }
        if let Some(content_type) = self.content_type {
            let is_file = record.decrypted_content.is_file();
            if (content_type == ContentType::File) != is_file {
                return false;
            }
        }
        if let Some(path) = &self.path {
            if record.path() != path {
                return false;
            }
        }
        if let Some(predicate) = &self.predicate {
            if !predicate(record) {
                return false;
            }
        }
        true
    }

    /// Applies this filter's sort/limit policy to an already-filtered set.
    pub fn apply_ordering(&self, mut records: Vec<IndexRecord>) -> Vec<IndexRecord> {
        if self.sort_desc_by_created_at {
            records.sort_by(|a, b| {
                b.event
                    .created_at
                    .cmp(&a.event.created_at)
                    .then_with(|| a.event.id.cmp(&b.event.id))
            });
        }
        if let Some(limit) = self.limit {
            records.truncate(limit);
        }
        records
    }
}
