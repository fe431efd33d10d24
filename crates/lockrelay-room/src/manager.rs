//! Room manager: allocates, tracks, and reclaims rooms.
//!
//! Rooms are pool-backed: `End`ed rooms go back to a free list and
//! the next match reuses the slot with a fresh id and seed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use lockrelay_pool::Pool;
use lockrelay_protocol::{RoomId, UserId};
use lockrelay_session::SessionTable;
use rand::Rng;

use crate::{Room, RoomConfig, RoomLogic, RoomState};

/// Counter for generating unique room IDs.
static NEXT_ROOM_ID: AtomicU32 = AtomicU32::new(1);

/// Registry of all live rooms.
///
/// Owned by the control loop alongside the [`SessionTable`]; the two
/// are passed around together because nearly every room operation also
/// touches sessions.
pub struct RoomManager<L: RoomLogic> {
    rooms: HashMap<RoomId, Room<L>>,
    pool: Pool<Room<L>>,
    /// Template stamped into every new room.
    config: RoomConfig,
}

impl<L: RoomLogic> RoomManager<L> {
    /// Creates an empty manager; `config` is the template for every
    /// room it allocates.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            pool: Pool::new(),
            config,
        }
    }

    /// Allocates a room (reusing a pooled slot when one is free) and
    /// returns its id.
    pub fn create(&mut self, sessions: &mut SessionTable) -> RoomId {
        let id = RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed));
        let mut room = self.pool.acquire();
        let seed = rand::rng().random();
        room.awake(sessions, id, self.config.clone(), seed);
        self.rooms.insert(id, room);
        tracing::info!(room = %id, "room created");
        id
    }

    /// Returns a joinable room with a free slot, allocating one when
    /// every live room is full or already playing.
    pub fn get_free(&mut self, sessions: &mut SessionTable) -> RoomId {
        let open = self.rooms.values().find_map(|room| {
            let core = room.core();
            (core.state.is_joinable()
                && core.members.len() < usize::from(core.config.max_users))
            .then_some(core.id)
        });
        match open {
            Some(id) => id,
            None => self.create(sessions),
        }
    }

    /// Returns the room with the given id.
    pub fn get(&self, id: RoomId) -> Option<&Room<L>> {
        self.rooms.get(&id)
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut Room<L>> {
        self.rooms.get_mut(&id)
    }

    /// Finds the room a player is seated in.
    pub fn get_by_user(&mut self, user_id: UserId) -> Option<&mut Room<L>> {
        self.rooms
            .values_mut()
            .find(|room| room.core().has_member(user_id))
    }

    /// Number of live rooms, reclaimed ones excluded.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// True when no rooms are live.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Variable-rate update for every room.
    pub fn update_all(&mut self, sessions: &mut SessionTable, dt: Duration) {
        for room in self.rooms.values_mut() {
            room.update(sessions, dt);
        }
    }

    /// Fixed-rate update for every room; lockstep frames fire here.
    pub fn fixed_update_all(&mut self, sessions: &mut SessionTable) {
        for room in self.rooms.values_mut() {
            room.fixed_update(sessions);
        }
    }

    /// Reclaims every `End`ed room, returning slots to the pool.
    ///
    /// Run once per control-loop iteration, before updates, so a room
    /// that ended during iteration N stays observable through N and
    /// disappears at the top of N+1.
    pub fn reap(&mut self) {
        let ended: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| room.state() == RoomState::End)
            .map(|room| room.id())
            .collect();
        for id in ended {
            if let Some(room) = self.rooms.remove(&id) {
                tracing::info!(room = %id, "room reclaimed");
                self.pool.release(room);
            }
        }
    }

    /// Destroys every room. Used by server shutdown.
    pub fn clear(&mut self) {
        for (_, room) in self.rooms.drain() {
            self.pool.release(room);
        }
    }
}

#[cfg(test)]
mod tests {
    use lockrelay_session::SessionConfig;

    use crate::LockstepLogic;

    use super::*;

    fn sessions() -> SessionTable {
        SessionTable::new(SessionConfig::default())
    }

    #[test]
    fn test_get_free_reuses_open_room() {
        let mut sessions = sessions();
        let mut rooms: RoomManager<LockstepLogic> =
            RoomManager::new(RoomConfig::default());
        let a = rooms.get_free(&mut sessions);
        let b = rooms.get_free(&mut sessions);
        assert_eq!(a, b);
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn test_get_free_skips_full_room() {
        let mut sessions = sessions();
        let mut rooms: RoomManager<LockstepLogic> = RoomManager::new(RoomConfig {
            max_users: 1,
            max_ticks: None,
        });
        let a = rooms.get_free(&mut sessions);
        let s = sessions.resolve(([127, 0, 0, 1], 1).into());
        rooms
            .get_mut(a)
            .unwrap()
            .join(&mut sessions, s, UserId(1))
            .unwrap();

        let b = rooms.get_free(&mut sessions);
        assert_ne!(a, b);
        assert_eq!(rooms.len(), 2);
    }

    #[test]
    fn test_get_by_user_finds_seated_player() {
        let mut sessions = sessions();
        let mut rooms: RoomManager<LockstepLogic> =
            RoomManager::new(RoomConfig::default());
        let id = rooms.get_free(&mut sessions);
        let s = sessions.resolve(([127, 0, 0, 1], 1).into());
        rooms
            .get_mut(id)
            .unwrap()
            .join(&mut sessions, s, UserId(5))
            .unwrap();

        assert_eq!(rooms.get_by_user(UserId(5)).unwrap().id(), id);
        assert!(rooms.get_by_user(UserId(6)).is_none());
    }

    #[test]
    fn test_reap_reclaims_only_ended_rooms() {
        let mut sessions = sessions();
        let mut rooms: RoomManager<LockstepLogic> = RoomManager::new(RoomConfig {
            max_users: 1,
            max_ticks: None,
        });
        let open = rooms.get_free(&mut sessions);
        let ended = rooms.create(&mut sessions);
        rooms.get_mut(ended).unwrap().game_over(&mut sessions);

        rooms.reap();
        assert!(rooms.get(open).is_some());
        assert!(rooms.get(ended).is_none());
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn test_reclaimed_room_slot_is_reset_on_reuse() {
        let mut sessions = sessions();
        let mut rooms: RoomManager<LockstepLogic> = RoomManager::new(RoomConfig {
            max_users: 1,
            max_ticks: None,
        });
        let first = rooms.create(&mut sessions);
        let s = sessions.resolve(([127, 0, 0, 1], 1).into());
        rooms
            .get_mut(first)
            .unwrap()
            .join(&mut sessions, s, UserId(1))
            .unwrap();
        rooms.get_mut(first).unwrap().game_over(&mut sessions);
        rooms.reap();

        let second = rooms.create(&mut sessions);
        let room = rooms.get(second).unwrap();
        assert_ne!(first, second);
        assert_eq!(room.state(), RoomState::Waiting);
        assert!(room.core().members.is_empty());
        assert_eq!(room.core().tick, 0);
    }
}
