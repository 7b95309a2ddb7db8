//! The NIP-44 external collaborator boundary.
//!
//! Treated as an opaque oracle: `encrypt(plain, to_pubkey)` / `decrypt(cipher,
//! from_pubkey)` given the local signer's own key. The seam is defined as a
//! trait with no production implementation bundled into this crate's
//! dependency graph — real hosts supply the host ecosystem's actual NIP-44
//! construction.

use std::sync::Arc;

use crate::error::DriveResult;

/// Authenticated public-key encryption between the local signer and a peer.
pub trait Nip44: Send + Sync {
    /// Encrypts `plaintext` for `to_pubkey` using the local signer's key.
    /// Self-sealing (own items) is expressed by passing the signer's own pubkey.
    fn encrypt(&self, plaintext: &[u8], to_pubkey: &[u8; 32]) -> DriveResult<String>;

    /// Decrypts `ciphertext` purportedly sent by `from_pubkey`.
    fn decrypt(&self, ciphertext: &str, from_pubkey: &[u8; 32]) -> DriveResult<Vec<u8>>;
}

/// Constructs a [`Nip44`] bound to an arbitrary raw secret key, rather than
/// the host's own logged-in identity.
///
/// The `Nip44` a host supplies for its own operations may be backed by a
/// non-extractable key (a hardware signer that never reveals its private
/// key material). `access_shared_file` operates on an ephemeral share secret
/// that arrives in cleartext over a share link and has no relationship to
/// the host's own identity, so it needs this separate,
/// secret-keyed construction instead.
pub trait Nip44Factory: Send + Sync {
    fn for_secret(&self, secret_key: &[u8; 32]) -> Arc<dyn Nip44>;
}
