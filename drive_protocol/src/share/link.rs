//! Share links: `<base_url>/<nevent1…>/<key>` where `key` is a plain `nsec1…`
//! or password-wrapped `ncryptsec1…` bech32 private key.
//!
//! The `ncryptsec1` envelope here is a reference construction — scrypt key
//! derivation into an AES-256-GCM seal of the raw secret — good enough to
//! exercise the password-protected path end to end. It is not a bit-for-bit
//! implementation of the host ecosystem's NIP-49 envelope, which this crate
//! does not depend on.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use bech32::{Bech32, Hrp};
use rand::RngCore;
use scrypt::Params;

use crate::error::{DriveError, DriveResult};
use crate::share::tlv::SharePointer;

const HRP_NSEC: &str = "nsec";
const HRP_NCRYPTSEC: &str = "ncryptsec";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

// log2(N)=16, r=8, p=1: a conservative interactive-use scrypt cost, matching
// the order of magnitude of the host ecosystem's NIP-49 parameters.
const SCRYPT_LOG_N: u8 = 16;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

fn derive_key(password: &str, salt: &[u8]) -> DriveResult<[u8; KEY_LEN]> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
        .map_err(|e| DriveError::crypto_failed(format!("invalid scrypt parameters: {e}")))?;
    let mut out = [0u8; KEY_LEN];
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut out)
        .map_err(|e| DriveError::crypto_failed(format!("scrypt derivation failed: {e}")))?;
    Ok(out)
}

/// Encodes a raw 32-byte secret key as plain `nsec1…`.
pub fn encode_nsec(secret_key: &[u8; KEY_LEN]) -> DriveResult<String> {
    let hrp = Hrp::parse(HRP_NSEC).expect("static HRP is valid");
    bech32::encode::<Bech32>(hrp, secret_key)
        .map_err(|e| DriveError::invalid_argument(format!("bech32 encoding failed: {e}")))
}

/// Wraps a raw 32-byte secret key under `password` as `ncryptsec1…`.
pub fn encode_ncryptsec(secret_key: &[u8; KEY_LEN], password: &str) -> DriveResult<String> {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let derived = derive_key(password, &salt)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&derived));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = cipher
        .encrypt(&nonce, secret_key.as_slice())
        .map_err(|_| DriveError::crypto_failed("ncryptsec envelope encryption failed"))?;

    let mut payload = Vec::with_capacity(SALT_LEN + NONCE_LEN + sealed.len());
    payload.extend_from_slice(&salt);
    payload.extend_from_slice(nonce.as_slice());
    payload.extend_from_slice(&sealed);

    let hrp = Hrp::parse(HRP_NCRYPTSEC).expect("static HRP is valid");
    bech32::encode::<Bech32>(hrp, &payload).map_err(|e| DriveError::invalid_argument(format!("bech32 encoding failed: {e}")))
}

/// Decodes an `nsec1…` or `ncryptsec1…` key, returning the raw secret key as
/// lowercase hex. `password` is required iff `encoded` is password-protected.
pub fn decode_share_key(encoded: &str, password: Option<&str>) -> DriveResult<String> {
    let (hrp, data) =
        bech32::decode::<Bech32>(encoded).map_err(|e| DriveError::invalid_argument(format!("malformed bech32 key: {e}")))?;

    match hrp.as_str() {
        HRP_NSEC => {
            let key: [u8; KEY_LEN] = data
                .try_into()
                .map_err(|_| DriveError::invalid_argument("nsec payload must be 32 bytes"))?;
            Ok(hex::encode(key))
        }
        HRP_NCRYPTSEC => {
            let password = password.ok_or_else(|| DriveError::invalid_argument("password required for ncryptsec key"))?;
            if data.len() < SALT_LEN + NONCE_LEN {
                return Err(DriveError::invalid_argument("ncryptsec payload too short"));
            }
            let (salt, rest) = data.split_at(SALT_LEN);
            let (nonce_bytes, sealed) = rest.split_at(NONCE_LEN);
            let derived = derive_key(password, salt)?;
            let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&derived));
            let plain = cipher
                .decrypt(Nonce::from_slice(nonce_bytes), sealed)
                .map_err(|_| DriveError::crypto_failed("wrong password for ncryptsec key"))?;
            let key: [u8; KEY_LEN] = plain
                .try_into()
                .map_err(|_| DriveError::crypto_failed("ncryptsec payload did not decrypt to 32 bytes"))?;
            Ok(hex::encode(key))
        }
        other => Err(DriveError::invalid_argument(format!("unrecognised share key hrp `{other}`"))),
    }
}

/// Assembles the user-visible share link.
pub fn build_share_link(base_url: &str, pointer: &SharePointer, secret_key: &[u8; KEY_LEN], password: Option<&str>) -> DriveResult<String> {
    let nevent = pointer.encode()?;
    let encoded_key = match password {
        Some(p) if !p.is_empty() => encode_ncryptsec(secret_key, p)?,
        _ => encode_nsec(secret_key)?,
    };
    let base_url = base_url.trim_end_matches('/');
    Ok(format!("{base_url}/{nevent}/{encoded_key}"))
}

/// The programmatic surface returned by [`parse_share_link`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedFileAccess {
    pub event_id: [u8; 32],
    pub relays: Vec<String>,
    pub author: Option<[u8; 32]>,
    pub kind: Option<u32>,
    pub encoded_private_key: String,
    pub is_password_protected: bool,
    pub nevent: String,
}

/// Splits `link` on `/`; the last two segments are `<nevent>` and
/// `<encoded-key>`. Decoding the key is a separate call, [`decode_share_key`].
pub fn parse_share_link(link: &str) -> DriveResult<SharedFileAccess> {
    let segments: Vec<&str> = link.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Err(DriveError::invalid_argument("share link missing nevent/key segments"));
    }
    let encoded_key = segments[segments.len() - 1].to_string();
    let nevent = segments[segments.len() - 2].to_string();

    let pointer = SharePointer::decode(&nevent)?;
    let is_password_protected = encoded_key.starts_with("ncryptsec1");

    Ok(SharedFileAccess {
        event_id: pointer.event_id,
        relays: pointer.relays,
        author: pointer.author,
        kind: pointer.kind,
        encoded_private_key: encoded_key,
        is_password_protected,
        nevent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_key_round_trip() {
        let secret = [9u8; KEY_LEN];
        let encoded = encode_nsec(&secret).unwrap();
        assert!(encoded.starts_with("nsec1"));
        let decoded = decode_share_key(&encoded, None).unwrap();
        assert_eq!(decoded, hex::encode(secret));
    }

    #[test]
    fn password_protected_round_trip() {
        let secret = [4u8; KEY_LEN];
        let encoded = encode_ncryptsec(&secret, "correct horse").unwrap();
        assert!(encoded.starts_with("ncryptsec1"));
        let decoded = decode_share_key(&encoded, Some("correct horse")).unwrap();
        assert_eq!(decoded, hex::encode(secret));
    }

    #[test]
    fn wrong_password_fails() {
        let secret = [4u8; KEY_LEN];
        let encoded = encode_ncryptsec(&secret, "correct horse").unwrap();
        assert!(decode_share_key(&encoded, Some("wrong password")).is_err());
    }

    #[test]
    fn missing_password_for_ncryptsec_fails() {
        let secret = [4u8; KEY_LEN];
        let encoded = encode_ncryptsec(&secret, "correct horse").unwrap();
        assert!(decode_share_key(&encoded, None).is_err());
    }

    #[test]
    fn build_and_parse_share_link() {
        let secret = [1u8; KEY_LEN];
        let pointer = SharePointer::new([2u8; 32]);
        let link = build_share_link("https://example.com", &pointer, &secret, None).unwrap();
        let access = parse_share_link(&link).unwrap();
        assert_eq!(access.event_id, [2u8; 32]);
        assert!(!access.is_password_protected);
        assert_eq!(decode_share_key(&access.encoded_private_key, None).unwrap(), hex::encode(secret));
    }
}
