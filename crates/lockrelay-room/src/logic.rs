//! The `RoomLogic` trait — the extension point for game rules.
//!
//! The room owns its lifecycle; the logic only observes it. Every
//! transition the room makes fires a hook, and the hooks get a
//! [`RoomCtx`] to read membership and queue datagrams — but they can
//! never force or skip a transition. The one thing a logic decides is
//! whether the match is over, via [`Step`] from `on_fixed_update`.

use std::time::Duration;

use lockrelay_protocol::{InputSet, Message, Packet, UserId};
use lockrelay_session::SessionTable;

use crate::RoomCore;

/// What a room's hooks see: the room's own data plus the session table,
/// for looking members up and sending to them.
pub struct RoomCtx<'a> {
    /// The room being driven.
    pub core: &'a mut RoomCore,
    /// All live sessions.
    pub sessions: &'a mut SessionTable,
}

impl RoomCtx<'_> {
    /// Queues one message to every member, in join order.
    pub fn broadcast<M: Message>(&mut self, msg: &M) {
        let bytes = Packet::message(msg).encode();
        for member in &self.core.members {
            if let Some(session) = self.sessions.get(member.session) {
                session.send(bytes.clone());
            }
        }
    }

    /// Queues one message to a single member. Unknown members are
    /// ignored; by the time a reply is queued they may be gone.
    pub fn send_to<M: Message>(&mut self, user_id: UserId, msg: &M) {
        let Some(member) = self.core.members.iter().find(|m| m.user_id == user_id) else {
            return;
        };
        if let Some(session) = self.sessions.get(member.session) {
            session.send(Packet::message(msg).encode());
        }
    }
}

/// Verdict returned by [`RoomLogic::on_fixed_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep the match running.
    Continue,
    /// End the match; the room runs its game-over transition.
    GameOver,
}

/// Hooks a game implements to ride along with the room lifecycle.
///
/// Every method has a no-op default, so a logic implements only what it
/// cares about. `Default` is required because rooms are pool-recycled:
/// a reclaimed room gets a fresh logic value.
pub trait RoomLogic: Default + Send + 'static {
    /// The room was (re)created and is about to accept members.
    fn on_awake(&mut self, _ctx: &mut RoomCtx<'_>) {}

    /// A member was added.
    fn on_user_join(&mut self, _ctx: &mut RoomCtx<'_>, _user_id: UserId) {}

    /// A stale slot for a rejoining player is being evicted.
    fn on_user_kick(&mut self, _ctx: &mut RoomCtx<'_>, _user_id: UserId) {}

    /// A member left (or was evicted for silence).
    fn on_user_leave(&mut self, _ctx: &mut RoomCtx<'_>, _user_id: UserId) {}

    /// A member toggled their ready flag.
    fn on_user_ready(&mut self, _ctx: &mut RoomCtx<'_>, _user_id: UserId) {}

    /// A member submitted input for the current tick.
    fn on_user_input(&mut self, _ctx: &mut RoomCtx<'_>, _input: InputSet) {}

    /// Everyone is ready; members are told to load.
    fn on_load_game(&mut self, _ctx: &mut RoomCtx<'_>) {}

    /// Everyone loaded; the match starts at tick 0.
    fn on_game_start(&mut self, _ctx: &mut RoomCtx<'_>) {}

    /// The match is ending.
    fn on_game_over(&mut self, _ctx: &mut RoomCtx<'_>) {}

    /// Settlement phase, right before the room goes to `End`.
    fn on_balance(&mut self, _ctx: &mut RoomCtx<'_>) {}

    /// Variable-rate update, every control-loop iteration.
    fn on_update(&mut self, _ctx: &mut RoomCtx<'_>, _dt: Duration) {}

    /// Fixed-rate update while `Running`. Fires once per tick, before
    /// the room increments its tick counter.
    fn on_fixed_update(&mut self, _ctx: &mut RoomCtx<'_>) -> Step {
        Step::Continue
    }
}
