//! Crypto layer: keypairs, key agreement, AEAD, and the datagram codec.
//!
//! Fixed cryptographic suite, no negotiation:
//!
//! - **Identity**: ephemeral X25519 keypair per process
//! - **Key agreement**: X25519 + HKDF-SHA256 over the exchanged public keys
//! - **AEAD**: XChaCha20-Poly1305 with per-direction counter nonces
//! - **Anti-replay**: 2048-bit sliding window per receive direction

mod aead;
mod handshake;
mod keys;
mod session;

pub use aead::{Direction, SessionKey};
pub use handshake::derive_session_key;
pub use keys::{Keypair, fingerprint};
pub use session::{Opener, ReplayWindow, Role, Sealer, Session};
