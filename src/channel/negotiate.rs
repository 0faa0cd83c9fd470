//! Role-asymmetric handshake negotiation over the open socket.
//!
//! Creator: wait for the first valid handshake from anyone, pin that
//! sender, answer with our own public key. Joiner: send our public key to
//! the known address, then wait for the answer from that same address.
//!
//! Malformed datagrams are discarded and the wait continues; only the
//! expiry of the whole window is an error. A failed negotiation is not
//! retried here - the caller restarts the attempt.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, info};

use crate::core::{ChannelError, PUBLIC_KEY_SIZE};
use crate::crypto::{Keypair, fingerprint};
use crate::transport::{ChannelSocket, frame};

/// Outcome of a successful negotiation: the pinned peer and its key.
pub(crate) struct Negotiated {
    /// Address all session traffic is now bound to.
    pub peer: SocketAddr,
    /// The peer's announced public key.
    pub remote_public: [u8; PUBLIC_KEY_SIZE],
}

/// Creator side: wait for the first valid handshake, then answer it.
///
/// Only the first valid sender is accepted. Everything after this point
/// is pinned to that address, so a racing second sender cannot hijack the
/// pending session.
pub(crate) async fn accept(
    socket: &mut ChannelSocket,
    keypair: &Keypair,
    window: Duration,
) -> Result<Negotiated, ChannelError> {
    let deadline = Instant::now() + window;

    loop {
        let received = timeout_at(deadline, socket.recv_from())
            .await
            .map_err(|_| ChannelError::HandshakeTimeout(window))?;

        let (parsed, from) = {
            let (payload, from) = received?;
            (frame::parse_handshake(payload), from)
        };

        let Some(remote_public) = parsed else {
            debug!(%from, "discarding malformed handshake");
            continue;
        };

        info!(
            peer = %from,
            peer_key = %fingerprint(&remote_public),
            local_key = %fingerprint(keypair.public_key()),
            "handshake received, answering"
        );
        socket.send_to(keypair.public_key(), from).await?;

        return Ok(Negotiated {
            peer: from,
            remote_public,
        });
    }
}

/// Joiner side: announce ourselves, then wait for the creator's answer.
///
/// Datagrams from any address other than the target are discarded without
/// inspection beyond the source check.
pub(crate) async fn connect(
    socket: &mut ChannelSocket,
    keypair: &Keypair,
    peer: SocketAddr,
    window: Duration,
) -> Result<Negotiated, ChannelError> {
    info!(
        %peer,
        local_key = %fingerprint(keypair.public_key()),
        "sending handshake"
    );
    socket.send_to(keypair.public_key(), peer).await?;

    let deadline = Instant::now() + window;

    loop {
        let received = timeout_at(deadline, socket.recv_from())
            .await
            .map_err(|_| ChannelError::HandshakeTimeout(window))?;

        let (parsed, from) = {
            let (payload, from) = received?;
            (frame::parse_handshake(payload), from)
        };

        if from != peer {
            debug!(%from, "discarding datagram from unexpected source during handshake");
            continue;
        }

        let Some(remote_public) = parsed else {
            debug!(%from, "discarding malformed handshake");
            continue;
        };

        info!(peer_key = %fingerprint(&remote_public), "handshake answered");
        return Ok(Negotiated {
            peer,
            remote_public,
        });
    }
}
