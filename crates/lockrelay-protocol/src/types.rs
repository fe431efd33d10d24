//! Identity types and the opcode table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// A player's account identity. 0 means "not yet assigned" — a session
/// that has connected but not joined a room.
///
/// Newtype over `u32` so a `UserId` can't be confused with a `RoomId`
/// even though both are plain integers on the wire.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u32);

impl UserId {
    /// The unassigned sentinel.
    pub const UNASSIGNED: UserId = UserId(0);

    /// Whether this id has been assigned to a real player.
    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A room's identity — one match instance.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// Every message kind the protocol knows, client→server (CS) and
/// server→client (SC).
///
/// A closed enum instead of raw integers: dispatch is a match on a known
/// set, and an i32 from the wire that names nothing becomes a
/// [`ProtocolError::UnknownOpcode`] at the decode boundary instead of a
/// silent miss deep in a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Opcode {
    // -- Liveness --
    /// CS: "I'm still here."
    Heartbeat = 1,
    /// SC: "I see you."
    HeartbeatAck = 2,

    // -- Client requests --
    /// CS: join (or rejoin) a room.
    Join = 10,
    /// CS: leave the current room.
    Leave = 11,
    /// CS: toggle readiness.
    Ready = 12,
    /// CS: scene load finished, ready for the match to start.
    LoadComplete = 13,
    /// CS: this tick's input.
    PlayerInput = 14,

    // -- Server notices and broadcasts --
    /// SC: room snapshot, sent to a joiner only.
    RoomInfo = 20,
    /// SC: a player joined, broadcast to the room.
    PlayerJoin = 21,
    /// SC: a player left, broadcast to the room.
    PlayerLeave = 22,
    /// SC: a player toggled ready, broadcast to the room.
    PlayerReady = 23,
    /// SC: everyone is ready — start loading.
    LoadGame = 24,
    /// SC: everyone loaded — the match begins at tick 0.
    GameStart = 25,
    /// SC: the per-tick aggregated input frame.
    Frame = 26,
    /// SC: the match is over.
    GameOver = 27,
    /// SC: post-match settlement.
    Balance = 28,
}

impl Opcode {
    /// Decodes a wire opcode, rejecting values outside the table.
    pub fn from_wire(raw: i32) -> Result<Self, ProtocolError> {
        Ok(match raw {
            1 => Self::Heartbeat,
            2 => Self::HeartbeatAck,
            10 => Self::Join,
            11 => Self::Leave,
            12 => Self::Ready,
            13 => Self::LoadComplete,
            14 => Self::PlayerInput,
            20 => Self::RoomInfo,
            21 => Self::PlayerJoin,
            22 => Self::PlayerLeave,
            23 => Self::PlayerReady,
            24 => Self::LoadGame,
            25 => Self::GameStart,
            26 => Self::Frame,
            27 => Self::GameOver,
            28 => Self::Balance,
            other => return Err(ProtocolError::UnknownOpcode(other)),
        })
    }

    /// The wire representation.
    pub fn to_wire(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_display_and_sentinel() {
        assert_eq!(UserId(7).to_string(), "U-7");
        assert!(!UserId::UNASSIGNED.is_assigned());
        assert!(UserId(1).is_assigned());
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId(3).to_string(), "R-3");
    }

    #[test]
    fn test_user_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&UserId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_opcode_wire_round_trip_for_whole_table() {
        let all = [
            Opcode::Heartbeat,
            Opcode::HeartbeatAck,
            Opcode::Join,
            Opcode::Leave,
            Opcode::Ready,
            Opcode::LoadComplete,
            Opcode::PlayerInput,
            Opcode::RoomInfo,
            Opcode::PlayerJoin,
            Opcode::PlayerLeave,
            Opcode::PlayerReady,
            Opcode::LoadGame,
            Opcode::GameStart,
            Opcode::Frame,
            Opcode::GameOver,
            Opcode::Balance,
        ];
        for op in all {
            assert_eq!(Opcode::from_wire(op.to_wire()).unwrap(), op);
        }
    }

    #[test]
    fn test_opcode_unknown_value_is_rejected() {
        assert!(matches!(
            Opcode::from_wire(999),
            Err(ProtocolError::UnknownOpcode(999))
        ));
        assert!(matches!(
            Opcode::from_wire(-1),
            Err(ProtocolError::UnknownOpcode(-1))
        ));
    }
}
