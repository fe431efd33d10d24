//! The room-protocol message catalogue.
//!
//! One struct per opcode. Bodies are the struct's fields flat-encoded in
//! declaration order — no tags, no schema evolution. A message knows its
//! own opcode via [`Message::OPCODE`], which is what lets
//! [`Packet::read`](crate::Packet::read) check that the envelope and the
//! requested type agree.

use crate::{Frame, InputSet, Opcode, ProtocolError, RoomId, UserId, WireReader, WireWriter};

/// A typed wire message: an opcode plus field encode/decode.
pub trait Message: Sized {
    /// The opcode this message travels under.
    const OPCODE: Opcode;

    /// Writes the fields in declaration order.
    fn write(&self, w: &mut WireWriter);

    /// Reads the fields in declaration order.
    fn read(r: &mut WireReader<'_>) -> Result<Self, ProtocolError>;
}

macro_rules! empty_message {
    ($(#[$doc:meta])* $name:ident, $opcode:expr) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl Message for $name {
            const OPCODE: Opcode = $opcode;

            fn write(&self, _w: &mut WireWriter) {}

            fn read(_r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
                Ok(Self)
            }
        }
    };
}

empty_message!(
    /// CS liveness ping. The act of arrival is the payload.
    Heartbeat,
    Opcode::Heartbeat
);
empty_message!(
    /// SC liveness reply.
    HeartbeatAck,
    Opcode::HeartbeatAck
);
empty_message!(
    /// SC: all members ready — load your scenes.
    LoadGame,
    Opcode::LoadGame
);
empty_message!(
    /// SC: all members loaded — the match starts, frames begin at 0.
    GameStart,
    Opcode::GameStart
);
empty_message!(
    /// SC: the match ended.
    GameOver,
    Opcode::GameOver
);
empty_message!(
    /// SC: post-match settlement.
    Balance,
    Opcode::Balance
);

macro_rules! user_id_message {
    ($(#[$doc:meta])* $name:ident, $opcode:expr) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            /// The player the request is about.
            pub user_id: UserId,
        }

        impl Message for $name {
            const OPCODE: Opcode = $opcode;

            fn write(&self, w: &mut WireWriter) {
                w.put_u32(self.user_id.0);
            }

            fn read(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
                Ok(Self {
                    user_id: UserId(r.u32()?),
                })
            }
        }
    };
}

user_id_message!(
    /// CS: join a room (the server picks or creates one).
    Join,
    Opcode::Join
);
user_id_message!(
    /// CS: leave the current room.
    Leave,
    Opcode::Leave
);
user_id_message!(
    /// CS: toggle readiness.
    Ready,
    Opcode::Ready
);
user_id_message!(
    /// CS: scene load finished.
    LoadComplete,
    Opcode::LoadComplete
);
user_id_message!(
    /// SC notice: a member toggled ready.
    PlayerReady,
    Opcode::PlayerReady
);

/// CS: one tick's worth of input from one player.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlayerInput {
    /// The keyed input values. `input.owner` names the submitting player.
    pub input: InputSet,
}

impl Message for PlayerInput {
    const OPCODE: Opcode = Opcode::PlayerInput;

    fn write(&self, w: &mut WireWriter) {
        self.input.write(w);
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            input: InputSet::read(r)?,
        })
    }
}

impl Message for Frame {
    const OPCODE: Opcode = Opcode::Frame;

    fn write(&self, w: &mut WireWriter) {
        Frame::write(self, w);
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Frame::read(r)
    }
}

/// SC: full room snapshot, pushed to a joining session only.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RoomInfo {
    /// The room's id.
    pub room_id: RoomId,
    /// The room's display name.
    pub name: String,
    /// Simulation seed shared by every member, so clients can run the
    /// same deterministic simulation.
    pub seed: u32,
    /// Player capacity of the room.
    pub max_users: u16,
}

impl Message for RoomInfo {
    const OPCODE: Opcode = Opcode::RoomInfo;

    fn write(&self, w: &mut WireWriter) {
        w.put_u32(self.room_id.0);
        w.put_str(&self.name);
        w.put_u32(self.seed);
        w.put_u16(self.max_users);
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            room_id: RoomId(r.u32()?),
            name: r.str()?,
            seed: r.u32()?,
            max_users: r.u16()?,
        })
    }
}

/// SC notice: a player joined the room.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlayerJoin {
    /// Who joined.
    pub user_id: UserId,
    /// Their display name.
    pub name: String,
    /// Their avatar resource path (may be empty).
    pub avatar: String,
}

impl Message for PlayerJoin {
    const OPCODE: Opcode = Opcode::PlayerJoin;

    fn write(&self, w: &mut WireWriter) {
        w.put_u32(self.user_id.0);
        w.put_str(&self.name);
        w.put_str(&self.avatar);
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            user_id: UserId(r.u32()?),
            name: r.str()?,
            avatar: r.str()?,
        })
    }
}

/// SC notice: a player left the room.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLeave {
    /// The room they left.
    pub room_id: RoomId,
    /// Who left.
    pub user_id: UserId,
}

impl Message for PlayerLeave {
    const OPCODE: Opcode = Opcode::PlayerLeave;

    fn write(&self, w: &mut WireWriter) {
        w.put_u32(self.room_id.0);
        w.put_u32(self.user_id.0);
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            room_id: RoomId(r.u32()?),
            user_id: UserId(r.u32()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Packet;

    #[test]
    fn test_empty_messages_have_empty_bodies() {
        let packet = Packet::message(&Heartbeat);
        assert!(packet.body.is_empty());
        let _: Heartbeat = packet.read().unwrap();
    }

    #[test]
    fn test_room_info_round_trip() {
        let info = RoomInfo {
            room_id: RoomId(12),
            name: "room-12".into(),
            seed: 0xC0FFEE,
            max_users: 2,
        };
        let decoded: RoomInfo =
            Packet::decode(&Packet::message(&info).encode())
                .unwrap()
                .read()
                .unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn test_player_join_with_empty_avatar() {
        let join = PlayerJoin {
            user_id: UserId(5),
            name: "player-5".into(),
            avatar: String::new(),
        };
        let decoded: PlayerJoin =
            Packet::decode(&Packet::message(&join).encode())
                .unwrap()
                .read()
                .unwrap();
        assert_eq!(decoded, join);
    }

    #[test]
    fn test_player_input_carries_owner_and_keys() {
        let mut input = InputSet::empty(UserId(3));
        input.set(1, 0.5);
        input.set(2, -1.0);
        let msg = PlayerInput { input };

        let decoded: PlayerInput =
            Packet::decode(&Packet::message(&msg).encode())
                .unwrap()
                .read()
                .unwrap();
        assert_eq!(decoded.input.owner, UserId(3));
        assert_eq!(decoded.input.get(2), -1.0);
    }

    #[test]
    fn test_frame_is_a_message() {
        let frame = Frame {
            frame: 7,
            inputs: vec![InputSet::empty(UserId(1)), InputSet::empty(UserId(2))],
        };
        let packet = Packet::message(&frame);
        assert_eq!(packet.opcode, Opcode::Frame);

        let decoded: Frame =
            Packet::decode(&packet.encode()).unwrap().read().unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_truncated_body_is_rejected() {
        let mut packet = Packet::message(&Join { user_id: UserId(9) });
        packet.body.truncate(2);
        assert!(matches!(
            packet.read::<Join>(),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn test_body_with_trailing_bytes_is_rejected() {
        let mut packet = Packet::message(&Join { user_id: UserId(9) });
        packet.body.push(0);
        assert!(matches!(
            packet.read::<Join>(),
            Err(ProtocolError::TrailingBytes(1))
        ));
    }
}
