//! Transport layer: the UDP socket wrapper and the datagram wire format.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Duplex channel                 │
//! ├─────────────────────────────────────────┤
//! │          Crypto layer                   │
//! ├─────────────────────────────────────────┤
//! │          Transport layer                │  <- this module
//! │      socket, wire format                │
//! ├─────────────────────────────────────────┤
//! │              UDP                        │
//! └─────────────────────────────────────────┘
//! ```

pub mod frame;
mod socket;

pub use socket::ChannelSocket;
