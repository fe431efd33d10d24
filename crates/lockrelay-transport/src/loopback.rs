//! In-process loopback transport for tests.
//!
//! [`LoopbackTransport::new`] returns the transport plus a [`LoopbackHub`]
//! that can mint any number of [`LoopbackPeer`] handles. Each peer gets a
//! synthetic `127.0.0.1` address, so server code that keys state by
//! endpoint behaves exactly as it does over UDP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{mpsc, Mutex};

use crate::{Datagram, Transport, TransportError};

type PeerRegistry = StdMutex<HashMap<SocketAddr, mpsc::UnboundedSender<Vec<u8>>>>;

struct Shared {
    to_server: mpsc::UnboundedSender<Datagram>,
    peers: PeerRegistry,
    next_port: AtomicU16,
}

/// The server side of a loopback link.
pub struct LoopbackTransport {
    inbound: Mutex<mpsc::UnboundedReceiver<Datagram>>,
    shared: Arc<Shared>,
}

impl LoopbackTransport {
    /// Creates a loopback transport and the hub that mints peers for it.
    pub fn new() -> (Self, LoopbackHub) {
        let (to_server, inbound) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            to_server,
            peers: StdMutex::new(HashMap::new()),
            next_port: AtomicU16::new(40_000),
        });
        let transport = Self {
            inbound: Mutex::new(inbound),
            shared: Arc::clone(&shared),
        };
        (transport, LoopbackHub { shared })
    }
}

impl Transport for LoopbackTransport {
    type Error = TransportError;

    async fn recv_from(&self) -> Result<Datagram, Self::Error> {
        self.inbound
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::Closed)
    }

    async fn send_to(&self, peer: SocketAddr, data: &[u8]) -> Result<(), Self::Error> {
        let sender = {
            let peers = self
                .shared
                .peers
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            peers.get(&peer).cloned()
        };
        // Unknown or dropped peers swallow the datagram, like UDP would.
        if let Some(sender) = sender {
            let _ = sender.send(data.to_vec());
        }
        Ok(())
    }
}

/// Mints [`LoopbackPeer`] handles for a [`LoopbackTransport`].
#[derive(Clone)]
pub struct LoopbackHub {
    shared: Arc<Shared>,
}

impl LoopbackHub {
    /// Creates a new peer with a fresh synthetic address.
    pub fn peer(&self) -> LoopbackPeer {
        let port = self.shared.next_port.fetch_add(1, Ordering::Relaxed);
        let addr: SocketAddr = ([127, 0, 0, 1], port).into();
        let (to_peer, from_server) = mpsc::unbounded_channel();
        self.shared
            .peers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(addr, to_peer);
        LoopbackPeer {
            addr,
            to_server: self.shared.to_server.clone(),
            from_server,
        }
    }
}

/// A simulated client endpoint.
pub struct LoopbackPeer {
    addr: SocketAddr,
    to_server: mpsc::UnboundedSender<Datagram>,
    from_server: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl LoopbackPeer {
    /// The peer's synthetic address, as the server sees it.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Sends one datagram to the server.
    pub fn send(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.to_server
            .send(Datagram {
                peer: self.addr,
                bytes,
            })
            .map_err(|_| TransportError::Closed)
    }

    /// Waits for the next datagram from the server.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.from_server.recv().await
    }

    /// Returns an already-delivered datagram, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.from_server.try_recv().ok()
    }
}
