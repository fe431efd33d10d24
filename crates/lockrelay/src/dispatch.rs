//! Opcode dispatch: routes decoded packets to subscribed handlers.
//!
//! Dispatch is a match over the closed [`Opcode`] enum, not a lookup in
//! an open integer table — an opcode that decodes is an opcode that can
//! be subscribed to. Handlers for one opcode fire in subscription
//! order; an opcode nobody subscribed to is dropped with a log line.

use std::collections::HashMap;

use lockrelay_protocol::{Opcode, Packet};
use lockrelay_room::RoomLogic;
use lockrelay_session::SessionId;

use crate::World;

/// Token returned by [`Dispatcher::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler<L> = Box<dyn FnMut(&mut World<L>, SessionId, &Packet) + Send>;

/// Registry of per-opcode message handlers.
pub struct Dispatcher<L: RoomLogic> {
    handlers: HashMap<Opcode, Vec<(HandlerId, Handler<L>)>>,
    next_id: u64,
}

impl<L: RoomLogic> Dispatcher<L> {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 1,
        }
    }

    /// Subscribes a handler to an opcode. Handlers fire in the order
    /// they were subscribed.
    pub fn subscribe<F>(&mut self, opcode: Opcode, handler: F) -> HandlerId
    where
        F: FnMut(&mut World<L>, SessionId, &Packet) + Send + 'static,
    {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers
            .entry(opcode)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Removes a handler. Unknown ids are a no-op; returns whether
    /// anything was removed.
    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        for handlers in self.handlers.values_mut() {
            if let Some(pos) = handlers.iter().position(|(hid, _)| *hid == id) {
                handlers.remove(pos);
                return true;
            }
        }
        false
    }

    /// Routes one packet to every handler subscribed to its opcode.
    pub fn dispatch(&mut self, world: &mut World<L>, session_id: SessionId, packet: &Packet) {
        let Some(handlers) = self.handlers.get_mut(&packet.opcode) else {
            tracing::debug!(opcode = ?packet.opcode, session = %session_id, "no handler, dropped");
            return;
        };
        for (_, handler) in handlers.iter_mut() {
            handler(world, session_id, packet);
        }
    }

    /// Drops every subscription. Used by server shutdown.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Number of live subscriptions across all opcodes.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// True when nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: RoomLogic> Default for Dispatcher<L> {
    fn default() -> Self {
        Self::new()
    }
}
