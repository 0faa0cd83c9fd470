//! The two concurrent flows driving an established channel.
//!
//! Outbound: plaintext from the handle -> sealer -> socket. Inbound:
//! socket -> source-address filter -> opener -> plaintext to the handle.
//! Each flow owns its direction's mutable codec state exclusively; the
//! `Arc<UdpSocket>` is the only shared resource, and UDP supports
//! concurrent independent send/recv.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, trace, warn};

use crate::core::{ChannelError, CryptoError, MAX_DATAGRAM_SIZE};
use crate::crypto::{Opener, Sealer};

/// Terminal fault of a channel, recorded by whichever flow hit it.
///
/// `recv` surfaces it once after the inbound stream ends.
pub(crate) type FaultSlot = Arc<Mutex<Option<ChannelError>>>;

pub(crate) fn record_fault(slot: &FaultSlot, fault: ChannelError) {
    if let Ok(mut guard) = slot.lock() {
        guard.get_or_insert(fault);
    }
}

pub(crate) fn take_fault(slot: &FaultSlot) -> Option<ChannelError> {
    slot.lock().ok().and_then(|mut guard| guard.take())
}

/// Outbound flow: drain the send queue, seal, transmit.
///
/// Ends when the handle closes, the shutdown signal fires, or the send
/// counter exhausts (which is fatal to the whole session).
pub(crate) async fn outbound_flow(
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    mut sealer: Sealer,
    mut queue: mpsc::Receiver<Vec<u8>>,
    shutdown: Arc<watch::Sender<bool>>,
    fault: FaultSlot,
) {
    let mut closed = shutdown.subscribe();

    loop {
        // wait_for honors a value set before this task was first polled;
        // changed() would treat it as already seen and sleep forever.
        let plaintext = tokio::select! {
            _ = closed.wait_for(|c| *c) => break,
            message = queue.recv() => match message {
                Some(plaintext) => plaintext,
                None => break, // handle dropped
            },
        };

        let datagram = match sealer.seal(&plaintext) {
            Ok(datagram) => datagram,
            Err(e @ CryptoError::CounterExhausted) => {
                error!("send counter exhausted, terminating session");
                record_fault(&fault, e.into());
                let _ = shutdown.send(true);
                break;
            }
            Err(e) => {
                record_fault(&fault, e.into());
                let _ = shutdown.send(true);
                break;
            }
        };

        if let Err(e) = socket.send_to(&datagram, peer).await {
            warn!("send failed: {e}");
            record_fault(&fault, e.into());
            let _ = shutdown.send(true);
            break;
        }
        trace!(bytes = datagram.len(), "datagram sent");
    }

    debug!("outbound flow ended");
}

/// Inbound flow: receive, filter by pinned peer address, decode, deliver.
///
/// Per-datagram crypto failures are invisible to the consumer - a forged
/// or replayed datagram looks like nothing arrived. They are counted
/// though: more than `abort_threshold` consecutive failures aborts the
/// channel instead of degrading silently under an active attack.
pub(crate) async fn inbound_flow(
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    mut opener: Opener,
    delivery: mpsc::Sender<Vec<u8>>,
    shutdown: Arc<watch::Sender<bool>>,
    fault: FaultSlot,
    abort_threshold: u32,
) {
    let mut closed = shutdown.subscribe();
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut consecutive_failures: u32 = 0;

    loop {
        let (len, from) = tokio::select! {
            _ = closed.wait_for(|c| *c) => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(ok) => ok,
                Err(e) => {
                    record_fault(&fault, e.into());
                    let _ = shutdown.send(true);
                    break;
                }
            },
        };

        if from != peer {
            // Off-path datagrams never reach the codec.
            trace!(%from, "discarding datagram from unknown source");
            continue;
        }

        match opener.open(&buf[..len]) {
            Ok(plaintext) => {
                consecutive_failures = 0;
                if delivery.send(plaintext).await.is_err() {
                    break; // handle dropped
                }
            }
            Err(e @ (CryptoError::AuthenticationFailed | CryptoError::ReplayRejected)) => {
                consecutive_failures += 1;
                debug!(%e, consecutive_failures, "dropping undecryptable datagram");
                if consecutive_failures > abort_threshold {
                    error!(
                        consecutive_failures,
                        "too many undecryptable datagrams, aborting channel"
                    );
                    record_fault(
                        &fault,
                        ChannelError::Aborted {
                            failures: consecutive_failures,
                        },
                    );
                    let _ = shutdown.send(true);
                    break;
                }
            }
            Err(e) => {
                record_fault(&fault, e.into());
                let _ = shutdown.send(true);
                break;
            }
        }
    }

    debug!("inbound flow ended");
}
