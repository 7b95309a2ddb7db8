//! The two event kinds and their canonical serialisation/signing (spec §3, §4.C).
//!
//! Shape follows `s5_core::stream::types::StreamMessage`'s envelope-plus-typed-body
//! pattern, swapped from CBOR to JSON (the host ecosystem's events are canonical
//! JSON) and from the teacher's own signature scheme to BIP-340 Schnorr via
//! [`crate::signer`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DriveError, DriveResult};
use crate::hash::Hash;
use crate::signer::Signer;

pub const KIND_DELETE: u32 = 5;
pub const KIND_DRIVE: u32 = 9500;

pub type Tag = Vec<String>;

/// File or folder metadata carried, NIP-44-sealed, in a DRIVE event's content.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DriveContent {
    #[serde(rename = "file")]
    File {
        hash: String,
        path: String,
        size: u64,
        #[serde(rename = "file-type", skip_serializing_if = "Option::is_none")]
        file_type: Option<String>,
        #[serde(rename = "encryption-algorithm", skip_serializing_if = "Option::is_none")]
        encryption_algorithm: Option<String>,
        #[serde(rename = "decryption-key", skip_serializing_if = "Option::is_none")]
        decryption_key: Option<String>,
        #[serde(rename = "decryption-nonce", skip_serializing_if = "Option::is_none")]
        decryption_nonce: Option<String>,
    },
    #[serde(rename = "folder")]
    Folder { path: String },
}

impl DriveContent {
    pub fn path(&self) -> &str {
        match self {
            DriveContent::File { path, .. } => path,
            DriveContent::Folder { path } => path,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, DriveContent::File { .. })
    }

    pub fn with_path(&self, new_path: impl Into<String>) -> Self {
        let new_path = new_path.into();
        match self {
            DriveContent::File {
                hash,
                size,
                file_type,
                encryption_algorithm,
                decryption_key,
                decryption_nonce,
                ..
            } => DriveContent::File {
                hash: hash.clone(),
                path: new_path,
                size: *size,
                file_type: file_type.clone(),
                encryption_algorithm: encryption_algorithm.clone(),
                decryption_key: decryption_key.clone(),
                decryption_nonce: decryption_nonce.clone(),
            },
            DriveContent::Folder { .. } => DriveContent::Folder { path: new_path },
        }
    }
}

/// An immutable signed event as it travels the wire (spec §3, §6).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u32,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: String,
}

impl Event {
    /// Canonical serialisation hashed to produce `id`:
    /// `[0, pubkey, created_at, kind, tags, content]`.
    fn canonical(pubkey_hex: &str, created_at: i64, kind: u32, tags: &[Tag], content: &str) -> Vec<u8> {
        let value = serde_json::json!([0, pubkey_hex, created_at, kind, tags, content]);
        serde_json::to_vec(&value).expect("canonical event array always serialises")
    }

    pub fn compute_id(pubkey_hex: &str, created_at: i64, kind: u32, tags: &[Tag], content: &str) -> Hash {
        Hash::new(Self::canonical(pubkey_hex, created_at, kind, tags, content))
    }

    /// Builds and signs a new event with `signer`.
    pub fn build(signer: &dyn Signer, created_at: i64, kind: u32, tags: Vec<Tag>, content: String) -> Self {
        let pubkey = hex::encode(signer.pubkey());
        let id = Self::compute_id(&pubkey, created_at, kind, &tags, &content);
        let sig = signer.sign(id.as_bytes());
        Event {
            id: id.to_hex(),
            pubkey,
            created_at,
            kind,
            tags,
            content,
            sig: hex::encode(sig),
        }
    }

    /// Recomputes `id` from the fields and verifies `sig` against `pubkey`.
    /// Does not touch the encrypted content.
    pub fn validate(&self) -> DriveResult<()> {
        let pubkey_bytes: [u8; 32] = hex::decode(&self.pubkey)
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or_else(|| DriveError::invalid_argument("malformed event pubkey"))?;
        let sig_bytes: [u8; 64] = hex::decode(&self.sig)
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or_else(|| DriveError::invalid_argument("malformed event signature"))?;
        let expected_id = Self::compute_id(&self.pubkey, self.created_at, self.kind, &self.tags, &self.content);
        if expected_id.to_hex() != self.id {
            return Err(DriveError::invalid_argument("event id does not match its fields"));
        }
        if !crate::signer::verify(&pubkey_bytes, expected_id.as_bytes(), &sig_bytes) {
            return Err(DriveError::invalid_argument("event signature does not verify"));
        }
        Ok(())
    }

    pub fn p_tag_recipients(&self) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|t| t.first().map(String::as_str) == Some("p"))
            .filter_map(|t| t.get(1).map(String::as_str))
            .collect()
    }

    pub fn e_tag_targets(&self) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|t| t.first().map(String::as_str) == Some("e"))
            .filter_map(|t| t.get(1).map(String::as_str))
            .collect()
    }

    /// True if `pubkey_hex` is the author or a `p`-tag recipient (spec §4.F list).
    pub fn is_accessible_to(&self, pubkey_hex: &str) -> bool {
        self.pubkey == pubkey_hex || self.p_tag_recipients().iter().any(|p| *p == pubkey_hex)
    }
}

/// Parses `content` as a [`DriveContent`] JSON body. Returns `Err` on any
/// malformed shape; callers drop the event silently on error (spec §3 inv. 3).
pub fn parse_drive_content(content: &str) -> DriveResult<DriveContent> {
    serde_json::from_str::<Value>(content)
        .and_then(serde_json::from_value)
        .map_err(|e| DriveError::invalid_argument(format!("malformed drive content: {e}")))
}

pub fn build_delete_tags(event_ids: &[String]) -> Vec<Tag> {
    event_ids.iter().map(|id| vec!["e".to_string(), id.clone()]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::LocalSigner;

    #[test]
    fn build_and_validate_round_trip() {
        let signer = LocalSigner::generate();
        let event = Event::build(&signer, 1_700_000_000, KIND_DRIVE, vec![], "sealed-body".to_string());
        event.validate().unwrap();
    }

    #[test]
    fn tampered_content_fails_validation() {
        let signer = LocalSigner::generate();
        let mut event = Event::build(&signer, 1_700_000_000, KIND_DRIVE, vec![], "sealed-body".to_string());
        event.content = "tampered".to_string();
        assert!(event.validate().is_err());
    }

    #[test]
    fn parse_file_and_folder_content() {
        let file = parse_drive_content(r#"{"type":"file","hash":"ab","path":"/a","size":3}"#).unwrap();
        assert!(file.is_file());
        assert_eq!(file.path(), "/a");

        let folder = parse_drive_content(r#"{"type":"folder","path":"/b"}"#).unwrap();
        assert!(!folder.is_file());
    }

    #[test]
    fn malformed_content_is_rejected() {
        assert!(parse_drive_content("not json").is_err());
        assert!(parse_drive_content(r#"{"type":"unknown"}"#).is_err());
    }

    #[test]
    fn p_and_e_tags_extracted() {
        let signer = LocalSigner::generate();
        let event = Event::build(
            &signer,
            1,
            KIND_DRIVE,
            vec![vec!["p".to_string(), "recipient".to_string()]],
            "x".to_string(),
        );
        assert_eq!(event.p_tag_recipients(), vec!["recipient"]);
        assert!(event.is_accessible_to("recipient"));
        assert!(event.is_accessible_to(&event.pubkey.clone()));

        let delete = Event::build(&signer, 2, KIND_DELETE, build_delete_tags(&["abc".to_string()]), String::new());
        assert_eq!(delete.e_tag_targets(), vec!["abc"]);
    }
}
