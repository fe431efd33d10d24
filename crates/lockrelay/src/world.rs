//! The server's mutable state, owned by the control loop.

use lockrelay_protocol::Packet;
use lockrelay_room::{RoomConfig, RoomLogic, RoomManager};
use lockrelay_session::{SessionConfig, SessionId, SessionTable};

/// Everything a message handler may touch: all sessions and all rooms.
///
/// One `World` exists per server and only the control loop holds it, so
/// handlers get plain `&mut` access with no locking.
pub struct World<L: RoomLogic> {
    /// All live sessions, keyed by endpoint.
    pub sessions: SessionTable,
    /// All live rooms.
    pub rooms: RoomManager<L>,
}

impl<L: RoomLogic> World<L> {
    /// Creates an empty world.
    pub fn new(session_config: SessionConfig, room_config: RoomConfig) -> Self {
        Self {
            sessions: SessionTable::new(session_config),
            rooms: RoomManager::new(room_config),
        }
    }

    /// Queues a reply to one session. Unknown sessions are ignored —
    /// the sender may have been evicted since the packet arrived.
    pub fn reply(&self, session_id: SessionId, packet: &Packet) {
        if let Some(session) = self.sessions.get(session_id) {
            session.send(packet.encode());
        }
    }
}
