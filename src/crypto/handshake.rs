//! Key agreement over exchanged public keys.
//!
//! The handshake wire message is one raw 32-byte X25519 public key and
//! nothing else; parsing lives in [`crate::transport::frame`]. This module
//! holds the sans-io half: turning two announced public keys into the one
//! shared session key.
//!
//! There is no additional verification round. Authentication is implicit
//! (trust-on-first-contact): only a peer holding the matching private key
//! can produce ciphertext the other side will accept later.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::core::{CryptoError, PUBLIC_KEY_SIZE, SESSION_KEY_SIZE};

use super::aead::SessionKey;
use super::keys::Keypair;

/// HKDF info string; versioned so a future format bump derives
/// unrelated keys.
const KDF_INFO: &[u8] = b"pairwire v1 session key";

/// Derive the shared symmetric session key from the local keypair and the
/// peer's announced public key.
///
/// Both sides compute HKDF-SHA256 over the X25519 shared secret, salted
/// with both public keys in lexicographic order so that creator and joiner
/// arrive at bit-identical keys.
pub fn derive_session_key(
    local: &Keypair,
    remote_public: &[u8; PUBLIC_KEY_SIZE],
) -> Result<SessionKey, CryptoError> {
    let shared = local.diffie_hellman(remote_public)?;

    // Salt binds both identities to the derived key.
    let mut salt = [0u8; PUBLIC_KEY_SIZE * 2];
    let (lo, hi) = if local.public_key() <= remote_public {
        (local.public_key(), remote_public)
    } else {
        (remote_public, local.public_key())
    };
    salt[..PUBLIC_KEY_SIZE].copy_from_slice(lo);
    salt[PUBLIC_KEY_SIZE..].copy_from_slice(hi);

    let hk = Hkdf::<Sha256>::new(Some(&salt), &shared);
    let mut key = [0u8; SESSION_KEY_SIZE];
    hk.expand(KDF_INFO, &mut key)
        .map_err(|_| CryptoError::KeyDerivation)?;

    Ok(SessionKey::from_bytes(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_sides_derive_identical_keys() {
        let creator = Keypair::generate().unwrap();
        let joiner = Keypair::generate().unwrap();

        let k1 = derive_session_key(&creator, joiner.public_key()).unwrap();
        let k2 = derive_session_key(&joiner, creator.public_key()).unwrap();

        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_different_peers_derive_different_keys() {
        let alice = Keypair::generate().unwrap();
        let bob = Keypair::generate().unwrap();
        let carol = Keypair::generate().unwrap();

        let ab = derive_session_key(&alice, bob.public_key()).unwrap();
        let ac = derive_session_key(&alice, carol.public_key()).unwrap();

        assert_ne!(ab.as_bytes(), ac.as_bytes());
    }

    #[test]
    fn test_session_key_differs_from_raw_shared_secret() {
        let alice = Keypair::generate().unwrap();
        let bob = Keypair::generate().unwrap();

        let shared = alice.diffie_hellman(bob.public_key()).unwrap();
        let key = derive_session_key(&alice, bob.public_key()).unwrap();

        assert_ne!(key.as_bytes(), &shared);
    }

    #[test]
    fn test_low_order_peer_key_rejected() {
        let alice = Keypair::generate().unwrap();
        let low_order = [0u8; PUBLIC_KEY_SIZE];

        assert!(derive_session_key(&alice, &low_order).is_err());
    }
}
