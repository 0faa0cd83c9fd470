//! The duplex secure channel: handshake, engine, and the public handle.
//!
//! Two entry points, one per role:
//!
//! - [`start_as_creator`] binds locally and waits for the first peer
//! - [`start_as_joiner`] announces itself to a known address
//!
//! Both return a [`SecureChannel`] whose [`send`](SecureChannel::send) and
//! [`recv`](SecureChannel::recv) run concurrently without blocking each
//! other for the lifetime of the session.
//!
//! ```no_run
//! use pairwire::{ChannelConfig, start_as_joiner};
//!
//! # async fn run() -> Result<(), pairwire::ChannelError> {
//! let mut channel = start_as_joiner(
//!     "127.0.0.1:0".parse().unwrap(),
//!     "127.0.0.1:45000".parse().unwrap(),
//!     ChannelConfig::default(),
//! )
//! .await?;
//!
//! channel.send(b"hello".to_vec()).await?;
//! while let Some(message) = channel.recv().await? {
//!     println!("{}", String::from_utf8_lossy(&message));
//! }
//! # Ok(())
//! # }
//! ```

mod engine;
mod negotiate;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::core::{
    ChannelError, DEFAULT_ABORT_THRESHOLD, DEFAULT_HANDSHAKE_TIMEOUT,
};
use crate::crypto::{Keypair, Role, Session};
use crate::transport::ChannelSocket;

use engine::FaultSlot;
use negotiate::Negotiated;

/// Plaintext messages queued per direction before backpressure.
const CHANNEL_DEPTH: usize = 64;

/// Tunables for one channel. Configuration, not protocol.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// How long to wait for the peer's handshake.
    pub handshake_timeout: Duration,

    /// Consecutive undecryptable datagrams tolerated before the channel
    /// aborts. One more than this value triggers the abort.
    pub abort_threshold: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            abort_threshold: DEFAULT_ABORT_THRESHOLD,
        }
    }
}

/// A creator bound to its local address, not yet negotiated.
///
/// The two-phase start lets a caller bind port 0 and learn the real port
/// before the peer joins.
#[derive(Debug)]
pub struct ChannelListener {
    socket: ChannelSocket,
    keypair: Keypair,
    config: ChannelConfig,
}

impl ChannelListener {
    /// Bind the creator's socket and generate its ephemeral identity.
    pub async fn bind(addr: SocketAddr, config: ChannelConfig) -> Result<Self, ChannelError> {
        let socket = ChannelSocket::bind(addr).await?;
        let keypair = Keypair::generate()?;
        info!(local = %socket.local_addr()?, "creator listening");
        Ok(Self {
            socket,
            keypair,
            config,
        })
    }

    /// The bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr, ChannelError> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for the first valid handshake and establish the channel.
    ///
    /// Consumes the listener: one listener, one session.
    pub async fn accept(mut self) -> Result<SecureChannel, ChannelError> {
        let negotiated = negotiate::accept(
            &mut self.socket,
            &self.keypair,
            self.config.handshake_timeout,
        )
        .await?;
        spawn_channel(
            self.socket,
            &self.keypair,
            negotiated,
            Role::Creator,
            &self.config,
        )
    }
}

/// Start a channel as the session creator: bind locally, wait for the
/// first peer to announce itself, answer, and establish.
pub async fn start_as_creator(
    local: SocketAddr,
    config: ChannelConfig,
) -> Result<SecureChannel, ChannelError> {
    ChannelListener::bind(local, config).await?.accept().await
}

/// Start a channel as the joiner: bind locally, announce to the known
/// peer address, await its answer, and establish.
pub async fn start_as_joiner(
    local: SocketAddr,
    remote: SocketAddr,
    config: ChannelConfig,
) -> Result<SecureChannel, ChannelError> {
    let mut socket = ChannelSocket::bind(local).await?;
    let keypair = Keypair::generate()?;
    let negotiated =
        negotiate::connect(&mut socket, &keypair, remote, config.handshake_timeout).await?;
    spawn_channel(socket, &keypair, negotiated, Role::Joiner, &config)
}

/// Derive the session and launch the two engine flows.
fn spawn_channel(
    socket: ChannelSocket,
    keypair: &Keypair,
    negotiated: Negotiated,
    role: Role,
    config: &ChannelConfig,
) -> Result<SecureChannel, ChannelError> {
    let session = Session::establish(keypair, negotiated.remote_public, role)?;
    let (sealer, opener) = session.into_split();

    let local_addr = socket.local_addr()?;
    let peer = negotiated.peer;
    let udp = socket.socket_arc();

    let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_DEPTH);
    let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_DEPTH);
    let (shutdown, _) = watch::channel(false);
    let shutdown = Arc::new(shutdown);
    let fault: FaultSlot = Arc::new(Mutex::new(None));

    tokio::spawn(engine::outbound_flow(
        Arc::clone(&udp),
        peer,
        sealer,
        outbound_rx,
        Arc::clone(&shutdown),
        Arc::clone(&fault),
    ));
    tokio::spawn(engine::inbound_flow(
        udp,
        peer,
        opener,
        inbound_tx,
        Arc::clone(&shutdown),
        Arc::clone(&fault),
        config.abort_threshold,
    ));

    info!(%peer, ?role, "secure channel established");

    Ok(SecureChannel {
        outbound_tx,
        inbound_rx,
        shutdown,
        fault,
        peer,
        local_addr,
    })
}

/// Cloneable handle for queueing outbound messages.
///
/// Lets a different task feed the channel while the owning task sits in
/// [`SecureChannel::recv`].
#[derive(Clone)]
pub struct ChannelSender {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChannelSender {
    /// Queue one plaintext message for encrypted delivery to the peer.
    pub async fn send(&self, plaintext: Vec<u8>) -> Result<(), ChannelError> {
        self.tx.send(plaintext).await.map_err(|_| ChannelError::Closed)
    }
}

/// Handle to an established full-duplex encrypted channel.
///
/// Dropping the handle closes the channel.
pub struct SecureChannel {
    outbound_tx: mpsc::Sender<Vec<u8>>,
    inbound_rx: mpsc::Receiver<Vec<u8>>,
    shutdown: Arc<watch::Sender<bool>>,
    fault: FaultSlot,
    peer: SocketAddr,
    local_addr: SocketAddr,
}

impl SecureChannel {
    /// Queue one plaintext message for encrypted delivery to the peer.
    pub async fn send(&self, plaintext: Vec<u8>) -> Result<(), ChannelError> {
        self.outbound_tx
            .send(plaintext)
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Receive the next decrypted message, suspending until one arrives.
    ///
    /// Returns `Ok(None)` once the channel has closed cleanly. A terminal
    /// fault (abort threshold exceeded, counter exhaustion, socket error)
    /// is surfaced here exactly once. Forged or replayed datagrams are
    /// never visible: they are indistinguishable from no message at all.
    pub async fn recv(&mut self) -> Result<Option<Vec<u8>>, ChannelError> {
        match self.inbound_rx.recv().await {
            Some(plaintext) => Ok(Some(plaintext)),
            None => match engine::take_fault(&self.fault) {
                Some(fault) => Err(fault),
                None => Ok(None),
            },
        }
    }

    /// Close the channel: both flows terminate promptly and no further
    /// traffic is generated. Key material is zeroized as the codec halves
    /// drop.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Get a cloneable sending handle.
    pub fn sender(&self) -> ChannelSender {
        ChannelSender {
            tx: self.outbound_tx.clone(),
        }
    }

    /// The pinned peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// The local socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for SecureChannel {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
