//! UDP transport implementation over `tokio::net::UdpSocket`.

use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::{Datagram, Transport, TransportError, MAX_DATAGRAM};

/// A UDP-based [`Transport`] bound to a local port.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Binds a new UDP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "UDP transport listening");
        Ok(Self { socket })
    }

    /// Returns the local address the socket is bound to.
    ///
    /// Useful with a `:0` bind to discover the assigned port.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket.local_addr().map_err(TransportError::BindFailed)
    }
}

impl Transport for UdpTransport {
    type Error = TransportError;

    async fn recv_from(&self) -> Result<Datagram, Self::Error> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, peer) = self
            .socket
            .recv_from(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        buf.truncate(len);
        tracing::trace!(%peer, len, "datagram received");
        Ok(Datagram { peer, bytes: buf })
    }

    async fn send_to(&self, peer: SocketAddr, data: &[u8]) -> Result<(), Self::Error> {
        if data.len() > MAX_DATAGRAM {
            return Err(TransportError::DatagramTooLarge(data.len()));
        }
        self.socket
            .send_to(data, peer)
            .await
            .map_err(TransportError::SendFailed)?;
        Ok(())
    }
}
