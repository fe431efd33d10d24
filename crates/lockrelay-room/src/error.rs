//! Error types for the room layer.

use lockrelay_protocol::{RoomId, UserId};

use crate::RoomState;

/// Errors that can occur during room operations.
///
/// These map onto the wire status codes: `Full` → 403, `NotFound` → 404,
/// `InvalidState`/`NotAMember` → 409. The handler layer renders them
/// into error replies; nothing here mutates room state.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room has no free member slots.
    #[error("room {0} is full")]
    Full(RoomId),

    /// The player is not a member of this room.
    #[error("user {user_id} is not in room {room_id}")]
    NotAMember { room_id: RoomId, user_id: UserId },

    /// The room's current state doesn't allow this operation.
    #[error("room {room_id} is {state}, cannot {op}")]
    InvalidState {
        room_id: RoomId,
        state: RoomState,
        op: &'static str,
    },
}
