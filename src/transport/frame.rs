//! Wire format for pairwire datagrams.
//!
//! Two datagram kinds, each filling the whole UDP payload with no extra
//! framing:
//!
//! ```text
//! handshake:  [ public key (32) ]
//! data:       [ sequence (8, BE) | ciphertext | tag (16) ]
//! ```
//!
//! The UDP datagram boundary is the only length delimiter: one plaintext
//! message per datagram.

use crate::core::{HANDSHAKE_SIZE, MIN_DATA_DATAGRAM_SIZE, PUBLIC_KEY_SIZE, SEQUENCE_HEADER_SIZE};

/// Parse a handshake datagram: exactly one raw public key.
///
/// Anything of a different length is malformed and yields `None`; the
/// caller discards it and keeps waiting.
pub fn parse_handshake(payload: &[u8]) -> Option<[u8; PUBLIC_KEY_SIZE]> {
    if payload.len() != HANDSHAKE_SIZE {
        return None;
    }
    let mut key = [0u8; PUBLIC_KEY_SIZE];
    key.copy_from_slice(payload);
    Some(key)
}

/// Encode a data datagram from a sequence number and sealed ciphertext
/// (tag included).
pub fn encode_data(sequence: u64, ciphertext: &[u8]) -> Vec<u8> {
    let mut datagram = Vec::with_capacity(SEQUENCE_HEADER_SIZE + ciphertext.len());
    datagram.extend_from_slice(&sequence.to_be_bytes());
    datagram.extend_from_slice(ciphertext);
    datagram
}

/// Split a data datagram into its sequence number and ciphertext body.
///
/// Returns `None` for anything too short to carry a header and tag.
pub fn parse_data(payload: &[u8]) -> Option<(u64, &[u8])> {
    if payload.len() < MIN_DATA_DATAGRAM_SIZE {
        return None;
    }
    let mut header = [0u8; SEQUENCE_HEADER_SIZE];
    header.copy_from_slice(&payload[..SEQUENCE_HEADER_SIZE]);
    Some((u64::from_be_bytes(header), &payload[SEQUENCE_HEADER_SIZE..]))
}
