//! The Schnorr/secp256k1 signer boundary.
//!
//! Production deployments supply a real BIP-340 signer (e.g. backed by a
//! hardware key or the host OS keychain); this crate only defines the seam.

use k256::schnorr::signature::{Signer as _, Verifier as _};
use k256::schnorr::{Signature, SigningKey, VerifyingKey};

/// Identifies and signs events on behalf of one local identity.
pub trait Signer: Send + Sync {
    /// The 32-byte x-only public key (hex-encoded) identifying this signer.
    fn pubkey(&self) -> [u8; 32];

    /// Produces a 64-byte Schnorr signature over `message`.
    fn sign(&self, message: &[u8]) -> [u8; 64];
}

/// Verifies a Schnorr signature against the given x-only public key.
pub fn verify(pubkey: &[u8; 32], message: &[u8], sig: &[u8; 64]) -> bool {
    let Ok(vk) = VerifyingKey::from_bytes(pubkey) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(sig.as_slice()) else {
        return false;
    };
    vk.verify(message, &signature).is_ok()
}

/// A `Signer` backed by an in-process secp256k1 key. Suitable for tests and
/// for embedding/native hosts that manage the key material themselves.
pub struct LocalSigner {
    signing_key: SigningKey,
    pubkey: [u8; 32],
}

impl LocalSigner {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let pubkey: [u8; 32] = signing_key.verifying_key().to_bytes().into();
        Self { signing_key, pubkey }
    }

    pub fn from_bytes(seed: &[u8; 32]) -> anyhow::Result<Self> {
        let signing_key = SigningKey::from_bytes(seed)?;
        let pubkey: [u8; 32] = signing_key.verifying_key().to_bytes().into();
        Ok(Self { signing_key, pubkey })
    }

    /// The raw 32-byte secret key. Used only where the caller must hold the
    /// key material itself — e.g. wrapping a fresh share keypair's secret in
    /// an `nsec1`/`ncryptsec1` envelope when generating a share link.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl Signer for LocalSigner {
    fn pubkey(&self) -> [u8; 32] {
        self.pubkey
    }

    fn sign(&self, message: &[u8]) -> [u8; 64] {
        let sig: Signature = self.signing_key.try_sign(message).expect("schnorr signing cannot fail for well-formed input");
        sig.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let signer = LocalSigner::generate();
        let msg = b"some canonical event serialisation";
        let sig = signer.sign(msg);
        assert!(verify(&signer.pubkey(), msg, &sig));
        assert!(!verify(&signer.pubkey(), b"different message", &sig));
    }
}
