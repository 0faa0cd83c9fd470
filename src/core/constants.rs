//! Protocol constants for the pairwire wire format.
//!
//! The wire format is fixed; both peers must agree on these values
//! bit-exactly.

use std::time::Duration;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// X25519 public key size.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 private key size.
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Derived symmetric session key size (XChaCha20 key).
pub const SESSION_KEY_SIZE: usize = 32;

/// XChaCha20 nonce size.
pub const AEAD_NONCE_SIZE: usize = 24;

/// Poly1305 authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// A handshake datagram is exactly one raw public key, nothing else.
pub const HANDSHAKE_SIZE: usize = PUBLIC_KEY_SIZE;

/// Sequence number header on every data datagram (big-endian u64).
pub const SEQUENCE_HEADER_SIZE: usize = 8;

/// Smallest valid data datagram: sequence header plus a bare tag.
pub const MIN_DATA_DATAGRAM_SIZE: usize = SEQUENCE_HEADER_SIZE + AEAD_TAG_SIZE;

/// Largest datagram we will read off the socket.
pub const MAX_DATAGRAM_SIZE: usize = 65535;

// =============================================================================
// NONCE DIRECTION
// =============================================================================

/// Nonce direction marker: creator -> joiner.
pub const NONCE_DIR_CREATOR: u8 = 0x00;

/// Nonce direction marker: joiner -> creator.
pub const NONCE_DIR_JOINER: u8 = 0x01;

// =============================================================================
// ANTI-REPLAY
// =============================================================================

/// Replay window size in bits.
pub const REPLAY_WINDOW_SIZE: usize = 2048;

// =============================================================================
// CHANNEL DEFAULTS (configuration, not protocol)
// =============================================================================

/// Default bound on the handshake wait.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Consecutive undecryptable datagrams tolerated before the channel aborts.
pub const DEFAULT_ABORT_THRESHOLD: u32 = 5;

/// Default port for local testing.
pub const DEFAULT_PORT: u16 = 45000;
