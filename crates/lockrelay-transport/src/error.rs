/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the local socket failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Sending a datagram failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a datagram failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The datagram exceeds [`MAX_DATAGRAM`](crate::MAX_DATAGRAM).
    #[error("datagram too large: {0} bytes")]
    DatagramTooLarge(usize),

    /// The transport was shut down.
    #[error("transport closed")]
    Closed,
}
