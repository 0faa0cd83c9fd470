//! X25519 keypair handling.
//!
//! Each process generates one fresh keypair at startup. Nothing is ever
//! persisted: the identity lives exactly as long as the process, and only
//! the public half ever leaves it.

use rand::{RngCore, rngs::OsRng};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::core::{CryptoError, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};

/// An ephemeral X25519 keypair for the handshake.
///
/// The private key is zeroized on drop.
pub struct Keypair {
    /// Private key (32 bytes) - zeroized on drop
    private: [u8; PRIVATE_KEY_SIZE],
    /// Public key (32 bytes)
    public: [u8; PUBLIC_KEY_SIZE],
}

impl Keypair {
    /// Generate a new random keypair.
    ///
    /// Fails only when the OS entropy source does, which is fatal: the
    /// process cannot proceed without randomness.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut seed = [0u8; PRIVATE_KEY_SIZE];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|_| CryptoError::Entropy)?;

        let secret = StaticSecret::from(seed);
        let public = PublicKey::from(&secret);
        seed.zeroize();

        Ok(Self {
            private: secret.to_bytes(),
            public: public.to_bytes(),
        })
    }

    /// Get the public key.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public
    }

    /// Compute the X25519 shared secret with a remote public key.
    ///
    /// Returns `KeyDerivation` if the result is non-contributory (the
    /// remote key is a low-order point).
    pub fn diffie_hellman(
        &self,
        remote_public: &[u8; PUBLIC_KEY_SIZE],
    ) -> Result<[u8; 32], CryptoError> {
        let secret = StaticSecret::from(self.private);
        let public = PublicKey::from(*remote_public);
        let shared = secret.diffie_hellman(&public);
        if !shared.was_contributory() {
            return Err(CryptoError::KeyDerivation);
        }
        Ok(*shared.as_bytes())
    }
}

impl Drop for Keypair {
    fn drop(&mut self) {
        self.private.zeroize();
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the private half.
        write!(f, "Keypair({})", fingerprint(&self.public))
    }
}

/// Short hex fingerprint of a public key, for diagnostics.
pub fn fingerprint(public: &[u8; PUBLIC_KEY_SIZE]) -> String {
    public[..4].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp1 = Keypair::generate().unwrap();
        let kp2 = Keypair::generate().unwrap();

        // Keys should be different
        assert_ne!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.public_key().len(), PUBLIC_KEY_SIZE);
    }

    #[test]
    fn test_diffie_hellman_agreement() {
        let alice = Keypair::generate().unwrap();
        let bob = Keypair::generate().unwrap();

        let ab = alice.diffie_hellman(bob.public_key()).unwrap();
        let ba = bob.diffie_hellman(alice.public_key()).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_diffie_hellman_low_order_rejected() {
        let alice = Keypair::generate().unwrap();

        // The identity point is low-order; the shared secret is all zeros.
        let low_order = [0u8; PUBLIC_KEY_SIZE];
        assert_eq!(
            alice.diffie_hellman(&low_order),
            Err(CryptoError::KeyDerivation)
        );
    }

    #[test]
    fn test_fingerprint_is_short_hex() {
        let kp = Keypair::generate().unwrap();
        let fp = fingerprint(kp.public_key());
        assert_eq!(fp.len(), 8);
        assert_eq!(fp, hex::encode(&kp.public_key()[..4]));
    }
}
