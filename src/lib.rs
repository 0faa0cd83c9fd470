//! # pairwire
//!
//! A serverless, full-duplex, end-to-end encrypted channel between exactly
//! two peers over UDP. No intermediary, no persisted state, no negotiation:
//!
//! - **Identity**: a fresh X25519 keypair per process, never stored
//! - **Handshake**: each side announces its raw public key once;
//!   trust-on-first-contact, the creator pins the first valid sender
//! - **Encryption**: XChaCha20-Poly1305 with per-direction counter nonces
//!   and a sliding replay window
//! - **Duplex**: independent inbound and outbound flows over one socket,
//!   neither ever blocking the other
//!
//! ## Modules
//!
//! - [`core`]: constants and error types
//! - [`crypto`]: keypairs, key agreement, AEAD, the datagram codec
//! - [`transport`]: UDP socket wrapper and wire format
//! - [`channel`]: handshake negotiation, the duplex engine, and the
//!   [`SecureChannel`] handle
//!
//! ## Usage
//!
//! One side creates, the other joins:
//!
//! ```no_run
//! use pairwire::{ChannelConfig, start_as_creator};
//!
//! # async fn run() -> Result<(), pairwire::ChannelError> {
//! let mut channel = start_as_creator(
//!     "127.0.0.1:45000".parse().unwrap(),
//!     ChannelConfig::default(),
//! )
//! .await?;
//!
//! channel.send(b"kampai!".to_vec()).await?;
//! if let Some(message) = channel.recv().await? {
//!     println!("{}", String::from_utf8_lossy(&message));
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod core;
pub mod crypto;
pub mod transport;

pub use channel::{
    ChannelConfig, ChannelListener, ChannelSender, SecureChannel, start_as_creator,
    start_as_joiner,
};
pub use core::{ChannelError, CryptoError, DEFAULT_PORT};
pub use crypto::{Keypair, Role, Session};
