//! The lockstep engine: per-tick input aggregation and frame relay.
//!
//! The server never simulates. Each tick it gathers whatever inputs
//! arrived, fills the gaps with empty input sets so every member is
//! represented, and relays the combined [`Frame`] to the whole room.
//! Clients run the simulation themselves; identical frames plus the
//! shared room seed keep them in agreement.

use std::collections::{HashMap, VecDeque};

use lockrelay_pool::Pool;
use lockrelay_protocol::{Frame, InputSet, UserId};

use crate::{RoomCtx, RoomLogic, Step};

/// How many broadcast frames a room keeps around, oldest evicted first.
/// Enough for a client to re-request a short gap after packet loss.
pub const FRAME_HISTORY: usize = 20;

/// The built-in [`RoomLogic`] that turns a room into a lockstep relay.
#[derive(Debug)]
pub struct LockstepLogic {
    /// This tick's submissions, keyed by player. A player submitting
    /// twice in one tick overwrites their earlier entry.
    pending: HashMap<UserId, InputSet>,
    /// The last [`FRAME_HISTORY`] frames broadcast.
    history: VecDeque<Frame>,
    /// Frame slots recycled across ticks.
    frames: Pool<Frame>,
}

impl Default for LockstepLogic {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            history: VecDeque::with_capacity(FRAME_HISTORY),
            frames: Pool::new(),
        }
    }
}

impl LockstepLogic {
    /// The retained frames, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Frame> {
        self.history.iter()
    }

    /// Looks up a retained frame by tick number.
    pub fn frame_at(&self, tick: u64) -> Option<&Frame> {
        self.history.iter().find(|f| f.frame == tick)
    }
}

impl RoomLogic for LockstepLogic {
    fn on_game_start(&mut self, _ctx: &mut RoomCtx<'_>) {
        // Inputs that raced the start belong to no tick.
        self.pending.clear();
        for frame in self.history.drain(..) {
            self.frames.release(frame);
        }
    }

    fn on_user_input(&mut self, _ctx: &mut RoomCtx<'_>, input: InputSet) {
        // Last write wins within a tick.
        self.pending.insert(input.owner, input);
    }

    fn on_fixed_update(&mut self, ctx: &mut RoomCtx<'_>) -> Step {
        let mut frame = self.frames.acquire();
        frame.frame = ctx.core.tick;
        for member in &ctx.core.members {
            let input = self
                .pending
                .remove(&member.user_id)
                .unwrap_or_else(|| InputSet::empty(member.user_id));
            frame.push(input);
        }
        // Anything left came from players no longer seated.
        self.pending.clear();

        if tracing::enabled!(tracing::Level::TRACE) {
            if let Ok(json) = serde_json::to_string(&frame) {
                tracing::trace!(room = %ctx.core.id, frame = %json, "frame relayed");
            }
        }
        ctx.broadcast(&frame);

        self.history.push_back(frame);
        if self.history.len() > FRAME_HISTORY {
            if let Some(evicted) = self.history.pop_front() {
                self.frames.release(evicted);
            }
        }

        match ctx.core.config.max_ticks {
            Some(max) if ctx.core.tick + 1 >= max => {
                tracing::info!(room = %ctx.core.id, max, "tick cap reached");
                Step::GameOver
            }
            _ => Step::Continue,
        }
    }
}
