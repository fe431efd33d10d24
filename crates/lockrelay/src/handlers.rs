//! Built-in handlers for the room protocol.
//!
//! Registered by [`App`](crate::App) at startup. Each handler decodes
//! its body, runs the room operation, and renders failures into
//! status/reason replies. Bodies that fail to decode are dropped with a
//! log line and no reply — a malformed datagram earns nothing.

use lockrelay_protocol::{
    status, Join, LoadComplete, Opcode, Packet, PlayerInput, ProtocolError,
};
use lockrelay_room::{RoomError, RoomLogic};
use lockrelay_session::SessionId;

use crate::{Dispatcher, World};

/// Subscribes the room-protocol handlers.
pub(crate) fn register_builtin<L: RoomLogic>(dispatcher: &mut Dispatcher<L>) {
    dispatcher.subscribe(Opcode::Join, handle_join);
    dispatcher.subscribe(Opcode::Leave, handle_leave);
    dispatcher.subscribe(Opcode::Ready, handle_ready);
    dispatcher.subscribe(Opcode::LoadComplete, handle_load_complete);
    dispatcher.subscribe(Opcode::PlayerInput, handle_input);
}

/// Maps a room failure to its wire status code.
fn status_of(err: &RoomError) -> u16 {
    match err {
        RoomError::Full(_) => status::FULL,
        RoomError::NotFound(_) => status::NOT_FOUND,
        RoomError::NotAMember { .. } | RoomError::InvalidState { .. } => status::INVALID_STATE,
    }
}

fn reply_error<L: RoomLogic>(
    world: &World<L>,
    session_id: SessionId,
    opcode: Opcode,
    err: &RoomError,
) {
    tracing::debug!(session = %session_id, ?opcode, error = %err, "request rejected");
    world.reply(session_id, &Packet::error(opcode, status_of(err), err.to_string()));
}

fn drop_undecodable(session_id: SessionId, opcode: Opcode, err: &ProtocolError) {
    tracing::warn!(session = %session_id, ?opcode, error = %err, "malformed body dropped");
}

/// The session's current room, as a room error when it has none.
fn current_room<L: RoomLogic>(
    world: &World<L>,
    session_id: SessionId,
) -> Result<lockrelay_protocol::RoomId, RoomError> {
    world
        .sessions
        .get(session_id)
        .and_then(|s| s.room)
        .ok_or(RoomError::NotFound(lockrelay_protocol::RoomId(0)))
}

fn handle_join<L: RoomLogic>(world: &mut World<L>, session_id: SessionId, packet: &Packet) {
    let join: Join = match packet.read() {
        Ok(msg) => msg,
        Err(e) => return drop_undecodable(session_id, packet.opcode, &e),
    };

    // A reconnecting player goes back to the room that still holds
    // their seat; everyone else gets the first open room.
    let reconnect = world
        .rooms
        .get_by_user(join.user_id)
        .filter(|room| room.state().is_joinable())
        .map(|room| room.id());
    let room_id = match reconnect {
        Some(id) => id,
        None => world.rooms.get_free(&mut world.sessions),
    };
    let Some(room) = world.rooms.get_mut(room_id) else {
        return;
    };
    if let Err(e) = room.join(&mut world.sessions, session_id, join.user_id) {
        reply_error(world, session_id, Opcode::Join, &e);
    }
}

fn handle_leave<L: RoomLogic>(world: &mut World<L>, session_id: SessionId, packet: &Packet) {
    if let Err(e) = packet.read::<lockrelay_protocol::Leave>() {
        return drop_undecodable(session_id, packet.opcode, &e);
    }

    let result = current_room(world, session_id).and_then(|room_id| {
        let room = world
            .rooms
            .get_mut(room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        room.leave(&mut world.sessions, session_id)
    });
    if let Err(e) = result {
        reply_error(world, session_id, Opcode::Leave, &e);
    }
}

fn handle_ready<L: RoomLogic>(world: &mut World<L>, session_id: SessionId, packet: &Packet) {
    if let Err(e) = packet.read::<lockrelay_protocol::Ready>() {
        return drop_undecodable(session_id, packet.opcode, &e);
    }

    let result = current_room(world, session_id).and_then(|room_id| {
        let room = world
            .rooms
            .get_mut(room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        room.ready(&mut world.sessions, session_id)
    });
    if let Err(e) = result {
        reply_error(world, session_id, Opcode::Ready, &e);
    }
}

fn handle_load_complete<L: RoomLogic>(
    world: &mut World<L>,
    session_id: SessionId,
    packet: &Packet,
) {
    if let Err(e) = packet.read::<LoadComplete>() {
        return drop_undecodable(session_id, packet.opcode, &e);
    }

    let result = current_room(world, session_id).and_then(|room_id| {
        let room = world
            .rooms
            .get_mut(room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        room.load_complete(&mut world.sessions, session_id)
    });
    if let Err(e) = result {
        reply_error(world, session_id, Opcode::LoadComplete, &e);
    }
}

fn handle_input<L: RoomLogic>(world: &mut World<L>, session_id: SessionId, packet: &Packet) {
    let msg: PlayerInput = match packet.read() {
        Ok(msg) => msg,
        Err(e) => return drop_undecodable(session_id, packet.opcode, &e),
    };

    // The session, not the packet, says who the input belongs to.
    let Some(session) = world.sessions.get(session_id) else {
        return;
    };
    let Some(room_id) = session.room else {
        tracing::debug!(session = %session_id, "input without a room dropped");
        return;
    };
    let mut input = msg.input;
    input.owner = session.user_id;

    if let Some(room) = world.rooms.get_mut(room_id) {
        room.input(&mut world.sessions, input);
    }
}
