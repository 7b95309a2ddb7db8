//! The public `DriveItem` shape (spec §3, §9): a tagged `{File, Folder}`
//! union with a shared prelude, rather than an inheritance hierarchy — the
//! design note's answer to the teacher's class-based `FileRef`/`DirRef`
//! split, reworked as a Rust enum.

use drive_index::IndexRecord;
use drive_protocol::event::DriveContent;
use drive_protocol::path;

/// The AES-GCM parameters carried on an encrypted file (spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptionInfo {
    pub algorithm: String,
    pub key: String,
    pub nonce: String,
}

/// A materialised file or folder (spec §3 DriveItem). Identity for
/// listing/versioning purposes is `(type, path)` (invariant 2); `event_id`
/// identifies the specific version.
#[derive(Clone, Debug, PartialEq)]
pub enum DriveItem {
    File {
        path: String,
        created_at: i64,
        event_id: String,
        hash: String,
        size: u64,
        file_type: Option<String>,
        encryption: Option<EncryptionInfo>,
    },
    Folder {
        path: String,
        created_at: i64,
        event_id: String,
    },
}

impl DriveItem {
    pub fn path(&self) -> &str {
        match self {
            DriveItem::File { path, .. } => path,
            DriveItem::Folder { path, .. } => path,
        }
    }

    pub fn created_at(&self) -> i64 {
        match self {
            DriveItem::File { created_at, .. } => *created_at,
            DriveItem::Folder { created_at, .. } => *created_at,
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            DriveItem::File { event_id, .. } => event_id,
            DriveItem::Folder { event_id, .. } => event_id,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, DriveItem::File { .. })
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, DriveItem::Folder { .. })
    }

    pub fn from_record(record: &IndexRecord) -> Self {
        Self::from_parts(&record.event.id, record.event.created_at, &record.decrypted_content)
    }

    pub fn from_parts(event_id: &str, created_at: i64, content: &DriveContent) -> Self {
        match content {
            DriveContent::File {
                hash,
                path,
                size,
                file_type,
                encryption_algorithm,
                decryption_key,
                decryption_nonce,
            } => {
                let encryption = match (encryption_algorithm, decryption_key, decryption_nonce) {
                    (Some(algorithm), Some(key), Some(nonce)) => Some(EncryptionInfo {
                        algorithm: algorithm.clone(),
                        key: key.clone(),
                        nonce: nonce.clone(),
                    }),
                    _ => None,
                };
                DriveItem::File {
                    path: path.clone(),
                    created_at,
                    event_id: event_id.to_string(),
                    hash: hash.clone(),
                    size: *size,
                    file_type: file_type.clone(),
                    encryption,
                }
            }
            DriveContent::Folder { path } => DriveItem::Folder {
                path: path.clone(),
                created_at,
                event_id: event_id.to_string(),
            },
        }
    }
}

/// Reduces a set of records to one "current version" per `(type, path)`:
/// the record with the greatest `created_at`, breaking ties by the smallest
/// `event.id` (spec §3 invariant 2, §8 property 5: `(path, created_at desc,
/// id asc)`).
pub(crate) fn current_versions(records: Vec<IndexRecord>) -> Vec<IndexRecord> {
    use std::collections::HashMap;

    let mut best: HashMap<(bool, String), IndexRecord> = HashMap::new();
    for record in records {
        let key = (record.decrypted_content.is_file(), record.path().to_string());
        let replace = match best.get(&key) {
            None => true,
            Some(existing) => {
                record.event.created_at > existing.event.created_at
                    || (record.event.created_at == existing.event.created_at && record.event.id < existing.event.id)
            }
        };
        if replace {
            best.insert(key, record);
        }
    }
    best.into_values().collect()
}

/// A pure function over a `list()`/`search()` result (spec §9 "Cyclic
/// `DriveEvent ↔ DriveService` reference": a folder's size is computed by a
/// pure function over a scan result, not by asking a global service for
/// siblings).
pub fn folder_size(items: &[DriveItem], folder_path: &str) -> u64 {
    items
        .iter()
        .filter_map(|item| match item {
            DriveItem::File { path, size, .. } if path::is_within(folder_path, path) => Some(*size),
            _ => None,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use drive_protocol::event::{Event, KIND_DRIVE};
    use drive_protocol::signer::LocalSigner;

    fn file_record(signer: &LocalSigner, created_at: i64, path: &str, size: u64) -> IndexRecord {
        let content = DriveContent::File {
            hash: "deadbeef".to_string(),
            path: path.to_string(),
            size,
            file_type: None,
            encryption_algorithm: None,
            decryption_key: None,
            decryption_nonce: None,
        };
        let body = serde_json::to_string(&content).unwrap();
        let event = Event::build(signer, created_at, KIND_DRIVE, vec![], body);
        IndexRecord::new(event, content)
    }

    #[test]
    fn current_versions_picks_newest_per_path() {
        let signer = LocalSigner::generate();
        let a = file_record(&signer, 100, "/f", 1);
        let b = file_record(&signer, 200, "/f", 2);
        let c = file_record(&signer, 100, "/other", 3);
        let picked = current_versions(vec![a, b.clone(), c.clone()]);
        assert_eq!(picked.len(), 2);
        assert!(picked.iter().any(|r| r.event.id == b.event.id));
        assert!(picked.iter().any(|r| r.event.id == c.event.id));
    }

    #[test]
    fn current_versions_breaks_created_at_ties_by_smallest_id() {
        let signer = LocalSigner::generate();
        let a = file_record(&signer, 100, "/f", 1);
        let b = file_record(&signer, 100, "/f", 2);
        let (smaller, larger) = if a.event.id < b.event.id { (a, b) } else { (b, a) };
        let picked = current_versions(vec![larger, smaller.clone()]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].event.id, smaller.event.id);
    }

    #[test]
    fn folder_size_sums_recursive_file_sizes_only() {
        let items = vec![
            DriveItem::File {
                path: "/docs/a.txt".to_string(),
                created_at: 1,
                event_id: "1".to_string(),
                hash: "h".to_string(),
                size: 10,
                file_type: None,
                encryption: None,
            },
            DriveItem::File {
                path: "/docs/sub/b.txt".to_string(),
                created_at: 1,
                event_id: "2".to_string(),
                hash: "h".to_string(),
                size: 20,
                file_type: None,
                encryption: None,
            },
            DriveItem::File {
                path: "/elsewhere/c.txt".to_string(),
                created_at: 1,
                event_id: "3".to_string(),
                hash: "h".to_string(),
                size: 99,
                file_type: None,
                encryption: None,
            },
            DriveItem::Folder {
                path: "/docs/sub".to_string(),
                created_at: 1,
                event_id: "4".to_string(),
            },
        ];
        assert_eq!(folder_size(&items, "/docs"), 30);
    }
}
