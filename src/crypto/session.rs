//! Established session state and the encrypted datagram codec.
//!
//! A [`Session`] is the output of the handshake: role, peer identity, and
//! the derived session key. It splits into a [`Sealer`] (outbound: key +
//! monotone counter) and an [`Opener`] (inbound: key + replay window), so
//! the two duplex flows own disjoint mutable state and need no lock.
//!
//! UDP may duplicate, reorder, or drop datagrams, so `open` never assumes
//! it is called in order: each datagram is judged on its own against the
//! replay window, and no sequence number is ever decrypted twice as new.

use crate::core::{CryptoError, PUBLIC_KEY_SIZE, REPLAY_WINDOW_SIZE};
use crate::transport::frame;

use super::aead::{self, Direction, SessionKey};
use super::handshake::derive_session_key;
use super::keys::Keypair;

/// Which side of the channel this process is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Bound locally and waited for the first handshake.
    Creator,
    /// Sent the first handshake to a known address.
    Joiner,
}

impl Role {
    /// Direction used when this role sends.
    pub fn send_direction(self) -> Direction {
        match self {
            Role::Creator => Direction::CreatorToJoiner,
            Role::Joiner => Direction::JoinerToCreator,
        }
    }

    /// Direction used when this role receives.
    pub fn recv_direction(self) -> Direction {
        self.send_direction().opposite()
    }
}

/// Anti-replay sliding window.
///
/// Tracks the highest accepted sequence number plus a bitmap of the
/// `REPLAY_WINDOW_SIZE` most recent ones. Below-window, at-window-floor,
/// and already-seen sequences are all rejected.
pub struct ReplayWindow {
    /// Bitmap of seen sequences, bit i = (highest - i)
    bitmap: [u64; REPLAY_WINDOW_SIZE / 64],
    /// Highest sequence accepted so far
    highest: u64,
    /// Whether any datagram has been accepted yet
    initialized: bool,
}

impl ReplayWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self {
            bitmap: [0; REPLAY_WINDOW_SIZE / 64],
            highest: 0,
            initialized: false,
        }
    }

    /// Check whether a sequence number is a replay, without updating.
    ///
    /// This check runs BEFORE any decryption attempt: a replayed sequence
    /// must never reach the AEAD (defends duplicate delivery and
    /// tag-forgery timing alike).
    pub fn is_replay(&self, sequence: u64) -> bool {
        if !self.initialized {
            return false;
        }
        if sequence > self.highest {
            return false;
        }
        let diff = self.highest - sequence;
        if diff >= REPLAY_WINDOW_SIZE as u64 {
            return true; // Below window
        }
        let bit_index = diff as usize;
        (self.bitmap[bit_index / 64] & (1 << (bit_index % 64))) != 0
    }

    /// Record a sequence number as accepted, advancing the window.
    ///
    /// Call only after the datagram authenticated: a forged header must
    /// not be able to move the window.
    pub fn accept(&mut self, sequence: u64) {
        if !self.initialized {
            self.highest = sequence;
            self.initialized = true;
            self.mark_seen(sequence);
            return;
        }

        if sequence > self.highest {
            let shift = sequence - self.highest;
            self.shift_window(shift);
            self.highest = sequence;
        }
        self.mark_seen(sequence);
    }

    fn mark_seen(&mut self, sequence: u64) {
        if sequence > self.highest {
            return;
        }
        let diff = self.highest - sequence;
        if diff >= REPLAY_WINDOW_SIZE as u64 {
            return;
        }
        let bit_index = diff as usize;
        self.bitmap[bit_index / 64] |= 1 << (bit_index % 64);
    }

    /// Shift the bitmap towards older positions to make room for a new
    /// highest sequence at bit 0.
    fn shift_window(&mut self, shift: u64) {
        if shift >= REPLAY_WINDOW_SIZE as u64 {
            // Everything previously seen falls outside the window.
            self.bitmap = [0; REPLAY_WINDOW_SIZE / 64];
            return;
        }

        let shift_words = (shift / 64) as usize;
        let shift_bits = (shift % 64) as u32;

        if shift_words > 0 {
            for i in (shift_words..self.bitmap.len()).rev() {
                self.bitmap[i] = self.bitmap[i - shift_words];
            }
            for word in self.bitmap.iter_mut().take(shift_words) {
                *word = 0;
            }
        }

        if shift_bits > 0 {
            let mut carry = 0u64;
            for i in 0..self.bitmap.len() {
                let new_carry = self.bitmap[i] >> (64 - shift_bits);
                self.bitmap[i] = (self.bitmap[i] << shift_bits) | carry;
                carry = new_carry;
            }
        }
    }
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// An established secure session between exactly two peers.
#[derive(Debug)]
pub struct Session {
    role: Role,
    remote_public: [u8; PUBLIC_KEY_SIZE],
    key: SessionKey,
}

impl Session {
    /// Derive a session from the local keypair and the peer's announced
    /// public key.
    pub fn establish(
        local: &Keypair,
        remote_public: [u8; PUBLIC_KEY_SIZE],
        role: Role,
    ) -> Result<Self, CryptoError> {
        let key = derive_session_key(local, &remote_public)?;
        Ok(Self {
            role,
            remote_public,
            key,
        })
    }

    /// Our role in this session.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The peer's public key as received at handshake time.
    pub fn remote_public(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.remote_public
    }

    /// Split into the outbound and inbound codec halves.
    pub fn into_split(self) -> (Sealer, Opener) {
        let sealer = Sealer {
            key: self.key.clone(),
            direction: self.role.send_direction(),
            next_sequence: 0,
        };
        let opener = Opener {
            key: self.key,
            direction: self.role.recv_direction(),
            window: ReplayWindow::new(),
        };
        (sealer, opener)
    }
}

/// Outbound half of the codec: plaintext in, wire datagram out.
///
/// Owns the only path to a send sequence number, so nonce reuse is
/// structurally unreachable rather than avoided by convention.
pub struct Sealer {
    key: SessionKey,
    direction: Direction,
    next_sequence: u64,
}

impl Sealer {
    /// Encrypt one plaintext message into a complete wire datagram.
    ///
    /// Sequence numbers start at 0 and never wrap: when the counter would
    /// overflow the session terminates with `CounterExhausted` instead of
    /// reusing a nonce.
    pub fn seal(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let sequence = self.next_sequence;
        self.next_sequence = self
            .next_sequence
            .checked_add(1)
            .ok_or(CryptoError::CounterExhausted)?;

        let nonce = aead::construct_nonce(self.direction, sequence);
        let aad = sequence.to_be_bytes();
        let ciphertext = aead::seal(&self.key, &nonce, &aad, plaintext)?;

        Ok(frame::encode_data(sequence, &ciphertext))
    }

    #[cfg(test)]
    fn with_next_sequence(mut self, sequence: u64) -> Self {
        self.next_sequence = sequence;
        self
    }
}

/// Inbound half of the codec: wire datagram in, plaintext out.
pub struct Opener {
    key: SessionKey,
    direction: Direction,
    window: ReplayWindow,
}

impl Opener {
    /// Decrypt one received datagram.
    ///
    /// Order of checks:
    /// 1. malformed / too short -> `AuthenticationFailed` (one uniform
    ///    rejection, no cause oracle for an attacker)
    /// 2. replayed or below-window sequence -> `ReplayRejected`, with no
    ///    decryption attempt
    /// 3. tag verification -> `AuthenticationFailed` on mismatch
    ///
    /// The window advances only after a datagram authenticates.
    pub fn open(&mut self, datagram: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let (sequence, body) =
            frame::parse_data(datagram).ok_or(CryptoError::AuthenticationFailed)?;

        if self.window.is_replay(sequence) {
            return Err(CryptoError::ReplayRejected);
        }

        let nonce = aead::construct_nonce(self.direction, sequence);
        let aad = sequence.to_be_bytes();
        let plaintext = aead::open(&self.key, &nonce, &aad, body)?;

        self.window.accept(sequence);
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn establish_pair() -> (Session, Session) {
        let creator_kp = Keypair::generate().unwrap();
        let joiner_kp = Keypair::generate().unwrap();

        let creator = Session::establish(
            &creator_kp,
            *joiner_kp.public_key(),
            Role::Creator,
        )
        .unwrap();
        let joiner = Session::establish(
            &joiner_kp,
            *creator_kp.public_key(),
            Role::Joiner,
        )
        .unwrap();
        (creator, joiner)
    }

    #[test]
    fn test_replay_window_basic() {
        let mut window = ReplayWindow::new();

        assert!(!window.is_replay(0));
        window.accept(0);
        assert!(window.is_replay(0));

        assert!(!window.is_replay(1));
        window.accept(1);

        // Out of order but in window
        window.accept(5);
        assert!(!window.is_replay(3));
        window.accept(3);
        assert!(window.is_replay(3));
        assert!(window.is_replay(5));
        assert!(!window.is_replay(4));
    }

    #[test]
    fn test_replay_window_below_floor() {
        let mut window = ReplayWindow::new();
        window.accept(0);
        window.accept(1);

        // Large jump pushes early sequences below the window
        window.accept(REPLAY_WINDOW_SIZE as u64 + 100);
        assert!(window.is_replay(0));
        assert!(window.is_replay(1));
        assert!(window.is_replay(99));

        // Recent unseen sequences still in window
        assert!(!window.is_replay(REPLAY_WINDOW_SIZE as u64 + 99));
        assert!(!window.is_replay(REPLAY_WINDOW_SIZE as u64));
    }

    #[test]
    fn test_replay_window_full_reset() {
        let mut window = ReplayWindow::new();
        for i in 0..100 {
            window.accept(i);
        }

        window.accept(100 + 2 * REPLAY_WINDOW_SIZE as u64);
        for i in 0..100 {
            assert!(window.is_replay(i));
        }
    }

    #[test]
    fn test_duplex_roundtrip() {
        let (creator, joiner) = establish_pair();
        let (mut c_seal, mut c_open) = creator.into_split();
        let (mut j_seal, mut j_open) = joiner.into_split();

        let out = c_seal.seal(b"hello").unwrap();
        assert_eq!(j_open.open(&out).unwrap(), b"hello");

        let back = j_seal.seal(b"kampai!").unwrap();
        assert_eq!(c_open.open(&back).unwrap(), b"kampai!");
    }

    #[test]
    fn test_first_sequence_is_zero() {
        let (creator, _) = establish_pair();
        let (mut sealer, _) = creator.into_split();

        let datagram = sealer.seal(b"first").unwrap();
        let (sequence, _) = frame::parse_data(&datagram).unwrap();
        assert_eq!(sequence, 0);

        let datagram = sealer.seal(b"second").unwrap();
        let (sequence, _) = frame::parse_data(&datagram).unwrap();
        assert_eq!(sequence, 1);
    }

    #[test]
    fn test_in_order_stream_then_replay() {
        let (creator, joiner) = establish_pair();
        let (mut sealer, _) = creator.into_split();
        let (_, mut opener) = joiner.into_split();

        let messages: Vec<Vec<u8>> = (0..20)
            .map(|i| format!("message {i}").into_bytes())
            .collect();
        let datagrams: Vec<Vec<u8>> = messages
            .iter()
            .map(|m| sealer.seal(m).unwrap())
            .collect();

        for (datagram, message) in datagrams.iter().zip(&messages) {
            assert_eq!(&opener.open(datagram).unwrap(), message);
        }

        // A second decode of any of them is a replay, never an
        // authentication failure.
        for datagram in &datagrams {
            assert_eq!(
                opener.open(datagram),
                Err(CryptoError::ReplayRejected)
            );
        }
    }

    #[test]
    fn test_out_of_order_delivery_accepted() {
        let (creator, joiner) = establish_pair();
        let (mut sealer, _) = creator.into_split();
        let (_, mut opener) = joiner.into_split();

        let d0 = sealer.seal(b"zero").unwrap();
        let d1 = sealer.seal(b"one").unwrap();
        let d2 = sealer.seal(b"two").unwrap();

        assert_eq!(opener.open(&d2).unwrap(), b"two");
        assert_eq!(opener.open(&d0).unwrap(), b"zero");
        assert_eq!(opener.open(&d1).unwrap(), b"one");

        assert_eq!(opener.open(&d0), Err(CryptoError::ReplayRejected));
    }

    #[test]
    fn test_corrupted_tag_never_yields_plaintext() {
        let (creator, joiner) = establish_pair();
        let (mut sealer, _) = creator.into_split();
        let (_, mut opener) = joiner.into_split();

        let mut datagram = sealer.seal(b"secret").unwrap();
        let last = datagram.len() - 1;
        datagram[last] ^= 0x01;

        assert_eq!(
            opener.open(&datagram),
            Err(CryptoError::AuthenticationFailed)
        );

        // A forgery must not advance the window: the genuine datagram
        // still decodes afterwards.
        datagram[last] ^= 0x01;
        assert_eq!(opener.open(&datagram).unwrap(), b"secret");
    }

    #[test]
    fn test_malformed_datagram_rejected_uniformly() {
        let (_, joiner) = establish_pair();
        let (_, mut opener) = joiner.into_split();

        assert_eq!(
            opener.open(b"short"),
            Err(CryptoError::AuthenticationFailed)
        );
        assert_eq!(opener.open(&[]), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn test_counter_exhaustion_terminates() {
        let (creator, _) = establish_pair();
        let (sealer, _) = creator.into_split();
        let mut sealer = sealer.with_next_sequence(u64::MAX - 1);

        // The penultimate counter value is still usable...
        assert!(sealer.seal(b"last").is_ok());
        // ...then the session must end rather than wrap.
        assert_eq!(
            sealer.seal(b"one too many"),
            Err(CryptoError::CounterExhausted)
        );
    }

    #[test]
    fn test_same_direction_codec_rejects_peer_traffic() {
        // Creator traffic fed back to the creator's own opener must not
        // decrypt: directions are disjoint nonce streams.
        let (creator, _) = establish_pair();
        let (mut sealer, mut opener) = creator.into_split();

        let datagram = sealer.seal(b"echo").unwrap();
        assert_eq!(
            opener.open(&datagram),
            Err(CryptoError::AuthenticationFailed)
        );
    }
}
