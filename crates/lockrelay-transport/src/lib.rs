//! Transport abstraction layer for Lockrelay.
//!
//! Provides the [`Transport`] trait that abstracts over unreliable
//! datagram transports. Peers are identified by their socket address;
//! there is no connection handshake and no delivery guarantee — loss,
//! reordering, and duplication are all the upper layers' problem.
//!
//! Two implementations ship here: [`UdpTransport`] for real sockets and
//! [`LoopbackTransport`] for in-process tests.

#![allow(async_fn_in_trait)]

mod error;
mod loopback;
mod udp;

pub use error::TransportError;
pub use loopback::{LoopbackHub, LoopbackPeer, LoopbackTransport};
pub use udp::UdpTransport;

use std::net::SocketAddr;

/// Largest datagram the server will send or accept.
///
/// Comfortably under the UDP payload ceiling; anything bigger than this
/// is a protocol bug, not a legitimate message.
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// One received datagram: who sent it and what they sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// The sender's endpoint.
    pub peer: SocketAddr,
    /// The raw payload.
    pub bytes: Vec<u8>,
}

/// An unreliable, unordered datagram transport.
///
/// Both methods take `&self` so a reader task can sit in `recv_from`
/// while the main loop sends replies through the same handle.
pub trait Transport: Send + Sync + 'static {
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming datagram.
    fn recv_from(&self) -> impl Future<Output = Result<Datagram, Self::Error>> + Send;

    /// Sends one datagram to the given peer, best effort.
    fn send_to(
        &self,
        peer: SocketAddr,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
