//! XChaCha20-Poly1305 AEAD and nonce construction.
//!
//! Both directions share one session key; the direction marker inside the
//! nonce keeps the two nonce streams disjoint, so a counter value may
//! appear once per direction without ever colliding.
//!
//! Nonce layout (24 bytes):
//! ```text
//! [ direction (1) | zeros (15) | counter (8, LE) ]
//! ```

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use zeroize::Zeroize;

use crate::core::{
    AEAD_NONCE_SIZE, AEAD_TAG_SIZE, CryptoError, NONCE_DIR_CREATOR, NONCE_DIR_JOINER,
    SESSION_KEY_SIZE,
};

/// The derived symmetric session key.
///
/// The single most sensitive value in the system: never logged, never
/// serialized, zeroized on drop.
#[derive(Clone)]
pub struct SessionKey {
    key: [u8; SESSION_KEY_SIZE],
}

impl SessionKey {
    /// Create a session key from raw bytes.
    pub fn from_bytes(key: [u8; SESSION_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Get the raw key bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey(..)")
    }
}

/// Direction of traffic, as encoded into the nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Creator -> Joiner (0x00)
    CreatorToJoiner,
    /// Joiner -> Creator (0x01)
    JoinerToCreator,
}

impl Direction {
    /// Byte representation used in the nonce.
    pub fn as_byte(self) -> u8 {
        match self {
            Direction::CreatorToJoiner => NONCE_DIR_CREATOR,
            Direction::JoinerToCreator => NONCE_DIR_JOINER,
        }
    }

    /// The opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            Direction::CreatorToJoiner => Direction::JoinerToCreator,
            Direction::JoinerToCreator => Direction::CreatorToJoiner,
        }
    }
}

/// Construct the 24-byte nonce for a (direction, counter) pair.
pub fn construct_nonce(direction: Direction, counter: u64) -> [u8; AEAD_NONCE_SIZE] {
    let mut nonce = [0u8; AEAD_NONCE_SIZE];
    nonce[0] = direction.as_byte();
    // Bytes 1-15 stay zero.
    nonce[16..24].copy_from_slice(&counter.to_le_bytes());
    nonce
}

/// Encrypt plaintext, appending the 16-byte Poly1305 tag.
///
/// The AAD binds the cleartext wire header to the ciphertext.
pub fn seal(
    key: &SessionKey,
    nonce: &[u8; AEAD_NONCE_SIZE],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let xnonce = XNonce::from_slice(nonce);

    cipher
        .encrypt(
            xnonce,
            chacha20poly1305::aead::Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt ciphertext, verifying the tag.
///
/// A too-short input fails exactly like a forged tag: the caller sees one
/// uniform rejection, nothing that distinguishes error causes.
pub fn open(
    key: &SessionKey,
    nonce: &[u8; AEAD_NONCE_SIZE],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < AEAD_TAG_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let xnonce = XNonce::from_slice(nonce);

    cipher
        .decrypt(
            xnonce,
            chacha20poly1305::aead::Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AuthenticationFailed)
}
