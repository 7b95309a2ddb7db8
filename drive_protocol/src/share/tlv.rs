//! SharePointer TLV encoding, bech32-wrapped with HRP `nevent`.
//!
//! A tagged-byte, ASCII-safe encoding: bech32 (not bech32m — `nevent`
//! pointers use the original bech32 checksum), TLV-framed because a
//! SharePointer carries a variable set of optional fields.

use bech32::{Bech32, Hrp};

use crate::error::{DriveError, DriveResult};

const TYPE_SPECIAL: u8 = 0;
const TYPE_RELAY: u8 = 1;
const TYPE_AUTHOR: u8 = 2;
const TYPE_KIND: u8 = 3;

const HRP_NEVENT: &str = "nevent";

/// A pointer to an event: required `event_id`, optional hint `relays`,
/// `author`, and `kind`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharePointer {
    pub event_id: [u8; 32],
    pub relays: Vec<String>,
    pub author: Option<[u8; 32]>,
    pub kind: Option<u32>,
}

impl SharePointer {
    pub fn new(event_id: [u8; 32]) -> Self {
        Self {
            event_id,
            relays: Vec::new(),
            author: None,
            kind: None,
        }
    }

    fn to_tlv(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_tlv(&mut out, TYPE_SPECIAL, &self.event_id);
        for relay in &self.relays {
            push_tlv(&mut out, TYPE_RELAY, relay.as_bytes());
        }
        if let Some(author) = &self.author {
            push_tlv(&mut out, TYPE_AUTHOR, author);
        }
        if let Some(kind) = self.kind {
            push_tlv(&mut out, TYPE_KIND, &kind.to_be_bytes());
        }
        out
    }

    /// Rejects a missing type-0 TLV; silently ignores unknown types and
    /// malformed-length relay/kind TLVs.
    fn from_tlv(bytes: &[u8]) -> DriveResult<Self> {
        let mut event_id: Option<[u8; 32]> = None;
        let mut relays = Vec::new();
        let mut author = None;
        let mut kind = None;

        let mut i = 0;
        while i + 2 <= bytes.len() {
            let ty = bytes[i];
            let len = bytes[i + 1] as usize;
            let start = i + 2;
            let end = start + len;
            if end > bytes.len() {
                break;
            }
            let value = &bytes[start..end];
            match ty {
                TYPE_SPECIAL if value.len() == 32 => {
                    let mut buf = [0u8; 32];
                    buf.copy_from_slice(value);
                    event_id = Some(buf);
                }
                TYPE_RELAY => {
                    if let Ok(s) = std::str::from_utf8(value) {
                        relays.push(s.to_string());
                    }
                }
                TYPE_AUTHOR if value.len() == 32 => {
                    let mut buf = [0u8; 32];
                    buf.copy_from_slice(value);
                    author = Some(buf);
                }
                TYPE_KIND if value.len() == 4 => {
                    let mut buf = [0u8; 4];
                    buf.copy_from_slice(value);
                    kind = Some(u32::from_be_bytes(buf));
                }
                _ => {}
            }
            i = end;
        }

        let event_id =
            event_id.ok_or_else(|| DriveError::invalid_argument("nevent payload missing required type-0 TLV"))?;
        Ok(Self {
            event_id,
            relays,
            author,
            kind,
        })
    }

    pub fn encode(&self) -> DriveResult<String> {
        let hrp = Hrp::parse(HRP_NEVENT).expect("static HRP is valid");
        bech32::encode::<Bech32>(hrp, &self.to_tlv())
            .map_err(|e| DriveError::invalid_argument(format!("bech32 encoding failed: {e}")))
    }

    pub fn decode(s: &str) -> DriveResult<Self> {
        let (hrp, data) = bech32::decode::<Bech32>(s)
            .map_err(|e| DriveError::invalid_argument(format!("malformed bech32 nevent: {e}")))?;
        if hrp.as_str() != HRP_NEVENT {
            return Err(DriveError::invalid_argument(format!(
                "expected hrp `{HRP_NEVENT}`, got `{}`",
                hrp.as_str()
            )));
        }
        Self::from_tlv(&data)
    }
}

fn push_tlv(out: &mut Vec<u8>, ty: u8, value: &[u8]) {
    debug_assert!(value.len() <= u8::MAX as usize, "TLV value must fit in a u8 length");
    out.push(ty);
    out.push(value.len() as u8);
    out.extend_from_slice(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_minimal() {
        let ptr = SharePointer::new([7u8; 32]);
        let encoded = ptr.encode().unwrap();
        assert!(encoded.starts_with("nevent1"));
        let decoded = SharePointer::decode(&encoded).unwrap();
        assert_eq!(decoded, ptr);
    }

    #[test]
    fn round_trip_full() {
        let mut ptr = SharePointer::new([1u8; 32]);
        ptr.relays = vec!["wss://relay.example".to_string(), "wss://relay2.example".to_string()];
        ptr.author = Some([2u8; 32]);
        ptr.kind = Some(9500);
        let encoded = ptr.encode().unwrap();
        let decoded = SharePointer::decode(&encoded).unwrap();
        assert_eq!(decoded, ptr);
    }

    #[test]
    fn rejects_wrong_hrp() {
        let other = bech32::encode::<Bech32>(Hrp::parse("nsec").unwrap(), &[1, 2, 3]).unwrap();
        assert!(SharePointer::decode(&other).is_err());
    }

    #[test]
    fn rejects_missing_type0() {
        let hrp = Hrp::parse(HRP_NEVENT).unwrap();
        let mut tlv = Vec::new();
        push_tlv(&mut tlv, TYPE_RELAY, b"wss://only-relay");
        let encoded = bech32::encode::<Bech32>(hrp, &tlv).unwrap();
        assert!(SharePointer::decode(&encoded).is_err());
    }

    #[test]
    fn ignores_unknown_tlv_types() {
        let mut tlv = Vec::new();
        push_tlv(&mut tlv, TYPE_SPECIAL, &[9u8; 32]);
        push_tlv(&mut tlv, 99, b"from the future");
        let hrp = Hrp::parse(HRP_NEVENT).unwrap();
        let encoded = bech32::encode::<Bech32>(hrp, &tlv).unwrap();
        let decoded = SharePointer::decode(&encoded).unwrap();
        assert_eq!(decoded.event_id, [9u8; 32]);
    }
}
