//! Content crypto: authenticated AES-256-GCM for file bytes.
//!
//! Generate a random nonce, AEAD-encrypt, verify the tag on the way back.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use base64::Engine;

use crate::error::{DriveError, DriveResult};

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

pub const ALGORITHM_AES_GCM: &str = "aes-gcm";

/// Result of an encryption: `ciphertext ∥ tag`, the key, and the nonce used.
pub struct Encrypted {
    pub blob: Vec<u8>,
    pub key: [u8; KEY_LEN],
    pub nonce: [u8; NONCE_LEN],
}

/// Encrypts `plaintext` with a freshly generated key and nonce.
pub fn encrypt(plaintext: &[u8]) -> Encrypted {
    let key = Aes256Gcm::generate_key(OsRng);
    let cipher = Aes256Gcm::new(&key);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // aes-gcm appends the tag to the ciphertext already: `ciphertext ∥ tag`.
    let blob = cipher
        .encrypt(&nonce, plaintext)
        .expect("AES-GCM encryption over an in-memory buffer cannot fail");

    Encrypted {
        blob,
        key: key.into(),
        nonce: nonce.into(),
    }
}

/// Decrypts `blob` (`ciphertext ∥ tag`) with the given key and nonce.
/// A failed tag check raises [`DriveError::CryptoFailed`] and no plaintext
/// is returned.
pub fn decrypt(blob: &[u8], key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN]) -> DriveResult<Vec<u8>> {
    if blob.len() < TAG_LEN {
        return Err(DriveError::crypto_failed("ciphertext shorter than GCM tag"));
    }
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), blob)
        .map_err(|_| DriveError::crypto_failed("AES-GCM tag verification failed"))
}

/// Validates a base64-encoded key from an untrusted source (share link,
/// inbound share event): must decode to exactly 32 bytes.
pub fn validate_key_b64(key_b64: &str) -> DriveResult<[u8; KEY_LEN]> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(key_b64)
        .map_err(|e| DriveError::crypto_failed(format!("invalid base64 key: {e}")))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| DriveError::crypto_failed(format!("key must be 32 bytes, got {}", v.len())))
}

/// Validates a base64-encoded nonce from an untrusted source: must decode to
/// exactly 12 bytes.
pub fn validate_nonce_b64(nonce_b64: &str) -> DriveResult<[u8; NONCE_LEN]> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(nonce_b64)
        .map_err(|e| DriveError::crypto_failed(format!("invalid base64 nonce: {e}")))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| DriveError::crypto_failed(format!("nonce must be 12 bytes, got {}", v.len())))
}

/// Validates that `algorithm` is the only encryption algorithm this protocol
/// version understands.
pub fn validate_algorithm(algorithm: &str) -> DriveResult<()> {
    if algorithm != ALGORITHM_AES_GCM {
        return Err(DriveError::crypto_failed(format!(
            "unsupported encryption algorithm: {algorithm}"
        )));
    }
    Ok(())
}

pub fn key_to_b64(key: &[u8; KEY_LEN]) -> String {
    base64::engine::general_purpose::STANDARD.encode(key)
}

pub fn nonce_to_b64(nonce: &[u8; NONCE_LEN]) -> String {
    base64::engine::general_purpose::STANDARD.encode(nonce)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let plaintext = b"hello world";
        let enc = encrypt(plaintext);
        let dec = decrypt(&enc.blob, &enc.key, &enc.nonce).unwrap();
        assert_eq!(dec, plaintext);
    }

    #[test]
    fn mutated_ciphertext_fails() {
        let enc = encrypt(b"hello world");
        let mut tampered = enc.blob.clone();
        tampered[0] ^= 0xff;
        assert!(decrypt(&tampered, &enc.key, &enc.nonce).is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let enc = encrypt(b"hello world");
        let wrong_key = [0u8; KEY_LEN];
        assert!(decrypt(&enc.blob, &wrong_key, &enc.nonce).is_err());
    }

    #[test]
    fn boundary_validation_rejects_bad_lengths() {
        assert!(validate_key_b64(&base64::engine::general_purpose::STANDARD.encode([0u8; 31])).is_err());
        assert!(validate_nonce_b64(&base64::engine::general_purpose::STANDARD.encode([0u8; 11])).is_err());
        assert!(validate_algorithm("chacha20-poly1305").is_err());
        assert!(validate_algorithm("aes-gcm").is_ok());
    }
}
