//! Error types for the pairwire channel.

use std::time::Duration;

use thiserror::Error;

/// Errors in the crypto layer.
///
/// `AuthenticationFailed` and `ReplayRejected` are per-datagram conditions:
/// the I/O engine recovers from them locally and they never reach the
/// message consumer directly. The remaining variants are fatal to the
/// session.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// The OS entropy source failed - cannot construct an identity.
    #[error("entropy source failure - cannot generate keys")]
    Entropy,

    /// Key agreement or derivation produced no usable key.
    #[error("session key derivation failed")]
    KeyDerivation,

    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// Datagram failed authentication (invalid tag, corrupted, or malformed).
    #[error("datagram failed authentication")]
    AuthenticationFailed,

    /// Sequence number already accepted or below the replay window.
    #[error("replayed or stale sequence number")]
    ReplayRejected,

    /// Send counter exhausted - the session must terminate rather than
    /// reuse a nonce.
    #[error("send counter exhausted - session must terminate")]
    CounterExhausted,
}

/// Errors surfaced by the channel to its caller.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Failed to bind the local socket (address in use, privileges).
    #[error("failed to bind local socket: {0}")]
    Bind(#[source] std::io::Error),

    /// No valid handshake arrived within the configured window.
    #[error("no handshake received within {0:?}")]
    HandshakeTimeout(Duration),

    /// Too many consecutive undecryptable datagrams - possible active
    /// attack or corrupted session.
    #[error("channel aborted after {failures} consecutive undecryptable datagrams")]
    Aborted {
        /// Consecutive failures observed when the channel gave up.
        failures: u32,
    },

    /// The channel is already closed.
    #[error("channel is closed")]
    Closed,

    /// Crypto failure fatal to the session.
    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    /// I/O error on the underlying socket.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
