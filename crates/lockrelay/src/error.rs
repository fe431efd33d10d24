//! Unified error type for the Lockrelay server.

use lockrelay_protocol::ProtocolError;
use lockrelay_room::RoomError;
use lockrelay_session::SessionError;
use lockrelay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Server code and demos deal with this single type; the `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LockrelayError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (framing, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, invalid state).
    #[error(transparent)]
    Room(#[from] RoomError),
}
