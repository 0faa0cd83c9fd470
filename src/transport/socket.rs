//! Async UDP socket wrapper.
//!
//! A thin layer over `tokio::net::UdpSocket`: bind, best-effort send,
//! suspending receive. No retry, ordering, or fragmentation handling here;
//! those concerns belong to the handshake and the codec.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;

use crate::core::{ChannelError, MAX_DATAGRAM_SIZE};

/// UDP socket bound to a local address, exchanging raw datagrams with one
/// known remote peer.
#[derive(Debug)]
pub struct ChannelSocket {
    /// The underlying UDP socket.
    socket: Arc<UdpSocket>,
    /// Receive buffer.
    recv_buffer: Vec<u8>,
}

impl ChannelSocket {
    /// Bind to the given local address.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ChannelError> {
        let socket = UdpSocket::bind(addr).await.map_err(ChannelError::Bind)?;
        Ok(Self {
            socket: Arc::new(socket),
            recv_buffer: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    /// Get the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Send one datagram to a specific address. Best effort - UDP gives
    /// no delivery guarantee.
    pub async fn send_to(&self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(data, addr).await
    }

    /// Receive one datagram, suspending until something arrives.
    ///
    /// Yields the sender's address, which may be anyone: unsolicited or
    /// spoofed datagrams are the caller's problem to filter.
    pub async fn recv_from(&mut self) -> io::Result<(&[u8], SocketAddr)> {
        let (len, addr) = self.socket.recv_from(&mut self.recv_buffer).await?;
        Ok((&self.recv_buffer[..len], addr))
    }

    /// Get a clone of the Arc-wrapped socket.
    ///
    /// UDP sockets support concurrent independent send and receive, so
    /// the two channel flows can share this without extra locking.
    pub fn socket_arc(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_socket_bind_ephemeral() {
        let socket = ChannelSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        assert_ne!(socket.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_socket_bind_conflict() {
        let first = ChannelSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = first.local_addr().unwrap();

        let second = ChannelSocket::bind(addr).await;
        assert!(matches!(second, Err(ChannelError::Bind(_))));
    }

    #[tokio::test]
    async fn test_socket_send_recv() {
        let mut receiver = ChannelSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let receiver_addr = receiver.local_addr().unwrap();

        let sender = ChannelSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        let data = b"one datagram";
        sender.send_to(data, receiver_addr).await.unwrap();

        let (received, from) = receiver.recv_from().await.unwrap();
        assert_eq!(received, data);
        assert_eq!(from, sender.local_addr().unwrap());
    }
}
