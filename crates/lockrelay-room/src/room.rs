//! The room: membership plus the lifecycle state machine.
//!
//! All transitions live here and only here. The attached
//! [`RoomLogic`] observes them through hooks; handlers upstream call
//! the public operations (`join`, `leave`, `ready`, `load_complete`,
//! `input`) and render the `Result` into wire replies.

use std::time::Duration;

use lockrelay_pool::Recycle;
use lockrelay_protocol::{
    Balance, GameOver, GameStart, InputSet, LoadGame, PlayerJoin, PlayerLeave, PlayerReady,
    RoomId, RoomInfo, UserId,
};
use lockrelay_session::{SessionId, SessionTable, UserState};

use crate::{RoomConfig, RoomCtx, RoomError, RoomLogic, RoomState, Step};

/// One occupied member slot. Order in the members `Vec` is join order,
/// which is also the input order inside every broadcast frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    /// The session currently occupying the slot.
    pub session: SessionId,
    /// The player in the slot. Survives a reconnect; the session doesn't.
    pub user_id: UserId,
}

/// The data half of a room, separate from its logic so hooks can borrow
/// it mutably while the logic runs.
#[derive(Debug, Default)]
pub struct RoomCore {
    /// This room's id.
    pub id: RoomId,
    /// Display name, `"room-{id}"`.
    pub name: String,
    /// Lifecycle state.
    pub state: RoomState,
    /// Capacity and tick cap.
    pub config: RoomConfig,
    /// Simulation seed published to every member in `RoomInfo`.
    pub seed: u32,
    /// Current tick. Meaningful only while `Running`; resets to 0 at
    /// game start and increments once per fixed update.
    pub tick: u64,
    /// Occupied slots in join order.
    pub members: Vec<Member>,
}

impl RoomCore {
    /// Whether `user_id` holds a slot in this room.
    pub fn has_member(&self, user_id: UserId) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    /// The `RoomInfo` snapshot sent to a joiner.
    fn snapshot(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.id,
            name: self.name.clone(),
            seed: self.seed,
            max_users: self.config.max_users,
        }
    }
}

/// A room instance: core data plus the game logic riding along.
#[derive(Debug, Default)]
pub struct Room<L: RoomLogic> {
    core: RoomCore,
    logic: L,
}

impl<L: RoomLogic> Room<L> {
    /// Read access to the room's data.
    pub fn core(&self) -> &RoomCore {
        &self.core
    }

    /// Read access to the attached game logic.
    pub fn logic(&self) -> &L {
        &self.logic
    }

    /// The room's id.
    pub fn id(&self) -> RoomId {
        self.core.id
    }

    /// The room's lifecycle state.
    pub fn state(&self) -> RoomState {
        self.core.state
    }

    /// Stamps identity and config into a freshly acquired slot and
    /// fires `on_awake`.
    pub(crate) fn awake(
        &mut self,
        sessions: &mut SessionTable,
        id: RoomId,
        config: RoomConfig,
        seed: u32,
    ) {
        self.core.id = id;
        self.core.name = format!("room-{}", id.0);
        self.core.config = config;
        self.core.seed = seed;
        tracing::info!(room = %id, seed, "room awake");
        self.logic.on_awake(&mut RoomCtx {
            core: &mut self.core,
            sessions,
        });
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// Adds a player to the room.
    ///
    /// Only legal while `Waiting`. If `user_id` already holds a slot the
    /// stale slot is kicked first — the player is reconnecting from a
    /// new endpoint and the old session is dead weight.
    ///
    /// On success: a join notice goes to every member, then the joiner
    /// alone gets the room snapshot plus one notice per existing member.
    pub fn join(
        &mut self,
        sessions: &mut SessionTable,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<(), RoomError> {
        if !self.core.state.is_joinable() {
            return Err(RoomError::InvalidState {
                room_id: self.core.id,
                state: self.core.state,
                op: "join",
            });
        }

        if let Some(pos) = self.core.members.iter().position(|m| m.user_id == user_id) {
            let stale = self.core.members.remove(pos);
            tracing::info!(
                room = %self.core.id,
                %user_id,
                old_session = %stale.session,
                "kicking stale slot for reconnecting player"
            );
            if let Some(old) = sessions.get_mut(stale.session) {
                old.room = None;
                old.state = UserState::Idle;
            }
            self.logic.on_user_kick(
                &mut RoomCtx {
                    core: &mut self.core,
                    sessions,
                },
                user_id,
            );
        }

        if self.core.members.len() >= usize::from(self.core.config.max_users) {
            return Err(RoomError::Full(self.core.id));
        }

        self.core.members.push(Member {
            session: session_id,
            user_id,
        });
        if let Some(session) = sessions.get_mut(session_id) {
            session.user_id = user_id;
            session.state = UserState::Idle;
            session.room = Some(self.core.id);
        }
        tracing::info!(
            room = %self.core.id,
            %user_id,
            members = self.core.members.len(),
            "player joined"
        );

        let mut ctx = RoomCtx {
            core: &mut self.core,
            sessions,
        };
        ctx.broadcast(&PlayerJoin {
            user_id,
            name: format!("player-{}", user_id.0),
            avatar: String::new(),
        });

        // The joiner alone gets the full picture: the room snapshot and
        // one join notice per member already seated.
        let snapshot = ctx.core.snapshot();
        ctx.send_to(user_id, &snapshot);
        let seated: Vec<UserId> = ctx
            .core
            .members
            .iter()
            .map(|m| m.user_id)
            .filter(|&existing| existing != user_id)
            .collect();
        for existing in seated {
            ctx.send_to(
                user_id,
                &PlayerJoin {
                    user_id: existing,
                    name: format!("player-{}", existing.0),
                    avatar: String::new(),
                },
            );
        }

        self.logic.on_user_join(
            &mut RoomCtx {
                core: &mut self.core,
                sessions,
            },
            user_id,
        );
        Ok(())
    }

    /// Removes a member. Legal in any state.
    ///
    /// A `Running` room whose last member leaves ends the match
    /// immediately; frames without recipients are pointless.
    pub fn leave(
        &mut self,
        sessions: &mut SessionTable,
        session_id: SessionId,
    ) -> Result<(), RoomError> {
        let Some(pos) = self.core.members.iter().position(|m| m.session == session_id) else {
            let user_id = sessions
                .get(session_id)
                .map(|s| s.user_id)
                .unwrap_or(UserId::UNASSIGNED);
            return Err(RoomError::NotAMember {
                room_id: self.core.id,
                user_id,
            });
        };
        let member = self.core.members.remove(pos);
        if let Some(session) = sessions.get_mut(member.session) {
            session.room = None;
            session.state = UserState::Idle;
        }
        tracing::info!(
            room = %self.core.id,
            user_id = %member.user_id,
            members = self.core.members.len(),
            "player left"
        );

        let mut ctx = RoomCtx {
            core: &mut self.core,
            sessions,
        };
        ctx.broadcast(&PlayerLeave {
            room_id: ctx.core.id,
            user_id: member.user_id,
        });
        self.logic.on_user_leave(
            &mut RoomCtx {
                core: &mut self.core,
                sessions,
            },
            member.user_id,
        );

        if self.core.state.is_running() && self.core.members.is_empty() {
            tracing::info!(room = %self.core.id, "room emptied mid-match");
            self.game_over(sessions);
        }
        Ok(())
    }

    /// Toggles a member's ready flag.
    ///
    /// Only legal while `Waiting`. When the toggle leaves the room at
    /// capacity with every member ready, the room moves to `Prepare`
    /// and tells everyone to load.
    pub fn ready(
        &mut self,
        sessions: &mut SessionTable,
        session_id: SessionId,
    ) -> Result<(), RoomError> {
        if self.core.state != RoomState::Waiting {
            return Err(RoomError::InvalidState {
                room_id: self.core.id,
                state: self.core.state,
                op: "ready",
            });
        }
        let Some(member) = self.core.members.iter().find(|m| m.session == session_id) else {
            let user_id = sessions
                .get(session_id)
                .map(|s| s.user_id)
                .unwrap_or(UserId::UNASSIGNED);
            return Err(RoomError::NotAMember {
                room_id: self.core.id,
                user_id,
            });
        };
        let user_id = member.user_id;

        let Some(session) = sessions.get_mut(session_id) else {
            return Err(RoomError::NotAMember {
                room_id: self.core.id,
                user_id,
            });
        };
        session.state = match session.state {
            UserState::Ready => UserState::Idle,
            _ => UserState::Ready,
        };
        let now_ready = session.state == UserState::Ready;
        tracing::debug!(room = %self.core.id, %user_id, ready = now_ready, "ready toggled");

        let mut ctx = RoomCtx {
            core: &mut self.core,
            sessions,
        };
        ctx.broadcast(&PlayerReady { user_id });
        self.logic.on_user_ready(
            &mut RoomCtx {
                core: &mut self.core,
                sessions,
            },
            user_id,
        );

        if self.all_in_state(sessions, UserState::Ready)
            && self.core.members.len() == usize::from(self.core.config.max_users)
        {
            self.core.state = RoomState::Prepare;
            tracing::info!(room = %self.core.id, "all ready, loading");
            self.logic.on_load_game(&mut RoomCtx {
                core: &mut self.core,
                sessions,
            });
            RoomCtx {
                core: &mut self.core,
                sessions,
            }
            .broadcast(&LoadGame);
        }
        Ok(())
    }

    /// Acknowledges a member's scene load.
    ///
    /// Only legal while `Prepare`. When the last member acknowledges,
    /// the match starts: `Running`, tick 0, `GameStart` to everyone.
    pub fn load_complete(
        &mut self,
        sessions: &mut SessionTable,
        session_id: SessionId,
    ) -> Result<(), RoomError> {
        if self.core.state != RoomState::Prepare {
            return Err(RoomError::InvalidState {
                room_id: self.core.id,
                state: self.core.state,
                op: "load_complete",
            });
        }
        let Some(member) = self.core.members.iter().find(|m| m.session == session_id) else {
            let user_id = sessions
                .get(session_id)
                .map(|s| s.user_id)
                .unwrap_or(UserId::UNASSIGNED);
            return Err(RoomError::NotAMember {
                room_id: self.core.id,
                user_id,
            });
        };
        let user_id = member.user_id;
        if let Some(session) = sessions.get_mut(session_id) {
            session.state = UserState::Gaming;
        }
        tracing::debug!(room = %self.core.id, %user_id, "load complete");

        if self.all_in_state(sessions, UserState::Gaming) {
            self.core.state = RoomState::Running;
            self.core.tick = 0;
            tracing::info!(room = %self.core.id, "game start");
            self.logic.on_game_start(&mut RoomCtx {
                core: &mut self.core,
                sessions,
            });
            RoomCtx {
                core: &mut self.core,
                sessions,
            }
            .broadcast(&GameStart);
        }
        Ok(())
    }

    /// Feeds one member's input for the current tick to the logic.
    ///
    /// Inputs that race the match boundary (arriving before `Running`
    /// or after the match ended) are dropped quietly; on an unreliable
    /// transport that is traffic, not an error.
    pub fn input(&mut self, sessions: &mut SessionTable, input: InputSet) {
        if !self.core.state.is_running() {
            tracing::debug!(
                room = %self.core.id,
                user_id = %input.owner,
                state = %self.core.state,
                "input outside running state dropped"
            );
            return;
        }
        if !self.core.has_member(input.owner) {
            tracing::debug!(
                room = %self.core.id,
                user_id = %input.owner,
                "input from non-member dropped"
            );
            return;
        }
        self.logic.on_user_input(
            &mut RoomCtx {
                core: &mut self.core,
                sessions,
            },
            input,
        );
    }

    /// Ends the match: `GameOver` out, settlement, then `End`.
    ///
    /// Remaining members are unseated and their sessions reset; the
    /// manager reclaims the room on its next sweep.
    pub fn game_over(&mut self, sessions: &mut SessionTable) {
        tracing::info!(room = %self.core.id, tick = self.core.tick, "game over");
        self.logic.on_game_over(&mut RoomCtx {
            core: &mut self.core,
            sessions,
        });
        RoomCtx {
            core: &mut self.core,
            sessions,
        }
        .broadcast(&GameOver);

        self.core.state = RoomState::Balance;
        self.logic.on_balance(&mut RoomCtx {
            core: &mut self.core,
            sessions,
        });
        RoomCtx {
            core: &mut self.core,
            sessions,
        }
        .broadcast(&Balance);

        for member in self.core.members.drain(..) {
            if let Some(session) = sessions.get_mut(member.session) {
                session.room = None;
                session.state = UserState::Idle;
            }
        }
        self.core.state = RoomState::End;
    }

    // -----------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------

    /// Variable-rate update.
    pub fn update(&mut self, sessions: &mut SessionTable, dt: Duration) {
        self.logic.on_update(
            &mut RoomCtx {
                core: &mut self.core,
                sessions,
            },
            dt,
        );
    }

    /// Fixed-rate update. While `Running`, fires the logic's tick hook
    /// and then advances the tick counter; a `GameOver` verdict ends
    /// the match in the same call.
    pub fn fixed_update(&mut self, sessions: &mut SessionTable) {
        if !self.core.state.is_running() {
            return;
        }
        let step = self.logic.on_fixed_update(&mut RoomCtx {
            core: &mut self.core,
            sessions,
        });
        self.core.tick += 1;
        if step == Step::GameOver {
            self.game_over(sessions);
        }
    }

    fn all_in_state(&self, sessions: &SessionTable, state: UserState) -> bool {
        self.core.members.iter().all(|m| {
            sessions
                .get(m.session)
                .is_some_and(|s| s.state == state)
        })
    }
}

impl<L: RoomLogic> Recycle for Room<L> {
    fn recycle(&mut self) {
        self.core.id = RoomId::default();
        self.core.name.clear();
        self.core.state = RoomState::Waiting;
        self.core.config = RoomConfig::default();
        self.core.seed = 0;
        self.core.tick = 0;
        self.core.members.clear();
        // A reclaimed room starts with a fresh logic value.
        self.logic = L::default();
    }
}

#[cfg(test)]
mod tests {
    use lockrelay_session::{SessionConfig, SessionTable};

    use super::*;

    #[derive(Default)]
    struct NoLogic;
    impl RoomLogic for NoLogic {}

    fn setup(max_users: u16) -> (Room<NoLogic>, SessionTable) {
        let mut sessions = SessionTable::new(SessionConfig::default());
        let mut room = Room::default();
        room.awake(
            &mut sessions,
            RoomId(1),
            RoomConfig {
                max_users,
                max_ticks: None,
            },
            77,
        );
        (room, sessions)
    }

    fn seat(
        room: &mut Room<NoLogic>,
        sessions: &mut SessionTable,
        port: u16,
        user: u32,
    ) -> SessionId {
        let id = sessions.resolve(([127, 0, 0, 1], port).into());
        room.join(sessions, id, UserId(user)).unwrap();
        id
    }

    #[test]
    fn test_join_respects_capacity() {
        let (mut room, mut sessions) = setup(2);
        seat(&mut room, &mut sessions, 1, 1);
        seat(&mut room, &mut sessions, 2, 2);

        let third = sessions.resolve(([127, 0, 0, 1], 3).into());
        assert!(matches!(
            room.join(&mut sessions, third, UserId(3)),
            Err(RoomError::Full(_))
        ));
        assert_eq!(room.core().members.len(), 2);
    }

    #[test]
    fn test_join_same_user_kicks_stale_slot() {
        let (mut room, mut sessions) = setup(2);
        let old = seat(&mut room, &mut sessions, 1, 1);

        let new = sessions.resolve(([127, 0, 0, 1], 9).into());
        room.join(&mut sessions, new, UserId(1)).unwrap();

        assert_eq!(room.core().members.len(), 1);
        assert_eq!(room.core().members[0].session, new);
        assert!(sessions.get(old).unwrap().room.is_none());
    }

    #[test]
    fn test_ready_toggles_back_to_idle() {
        let (mut room, mut sessions) = setup(2);
        let a = seat(&mut room, &mut sessions, 1, 1);

        room.ready(&mut sessions, a).unwrap();
        assert_eq!(sessions.get(a).unwrap().state, UserState::Ready);
        room.ready(&mut sessions, a).unwrap();
        assert_eq!(sessions.get(a).unwrap().state, UserState::Idle);
        // Room never left Waiting: capacity was not reached.
        assert_eq!(room.state(), RoomState::Waiting);
    }

    #[test]
    fn test_all_ready_below_capacity_stays_waiting() {
        let (mut room, mut sessions) = setup(2);
        let a = seat(&mut room, &mut sessions, 1, 1);
        room.ready(&mut sessions, a).unwrap();
        assert_eq!(room.state(), RoomState::Waiting);
    }

    #[test]
    fn test_all_ready_at_capacity_enters_prepare() {
        let (mut room, mut sessions) = setup(2);
        let a = seat(&mut room, &mut sessions, 1, 1);
        let b = seat(&mut room, &mut sessions, 2, 2);

        room.ready(&mut sessions, a).unwrap();
        assert_eq!(room.state(), RoomState::Waiting);
        room.ready(&mut sessions, b).unwrap();
        assert_eq!(room.state(), RoomState::Prepare);
    }

    #[test]
    fn test_ready_outside_waiting_is_invalid_state() {
        let (mut room, mut sessions) = setup(2);
        let a = seat(&mut room, &mut sessions, 1, 1);
        let b = seat(&mut room, &mut sessions, 2, 2);
        room.ready(&mut sessions, a).unwrap();
        room.ready(&mut sessions, b).unwrap();

        assert!(matches!(
            room.ready(&mut sessions, a),
            Err(RoomError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_join_outside_waiting_is_invalid_state() {
        let (mut room, mut sessions) = setup(1);
        let a = seat(&mut room, &mut sessions, 1, 1);
        room.ready(&mut sessions, a).unwrap();
        assert_eq!(room.state(), RoomState::Prepare);

        let late = sessions.resolve(([127, 0, 0, 1], 9).into());
        assert!(matches!(
            room.join(&mut sessions, late, UserId(9)),
            Err(RoomError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_load_complete_from_everyone_starts_running_at_tick_zero() {
        let (mut room, mut sessions) = setup(2);
        let a = seat(&mut room, &mut sessions, 1, 1);
        let b = seat(&mut room, &mut sessions, 2, 2);
        room.ready(&mut sessions, a).unwrap();
        room.ready(&mut sessions, b).unwrap();

        room.load_complete(&mut sessions, a).unwrap();
        assert_eq!(room.state(), RoomState::Prepare);
        room.load_complete(&mut sessions, b).unwrap();
        assert_eq!(room.state(), RoomState::Running);
        assert_eq!(room.core().tick, 0);
        assert_eq!(sessions.get(a).unwrap().state, UserState::Gaming);
    }

    #[test]
    fn test_fixed_update_increments_tick_only_while_running() {
        let (mut room, mut sessions) = setup(1);
        let a = seat(&mut room, &mut sessions, 1, 1);

        room.fixed_update(&mut sessions);
        assert_eq!(room.core().tick, 0);

        room.ready(&mut sessions, a).unwrap();
        room.load_complete(&mut sessions, a).unwrap();
        assert_eq!(room.state(), RoomState::Running);

        room.fixed_update(&mut sessions);
        room.fixed_update(&mut sessions);
        assert_eq!(room.core().tick, 2);
    }

    #[test]
    fn test_last_leave_while_running_ends_the_match() {
        let (mut room, mut sessions) = setup(1);
        let a = seat(&mut room, &mut sessions, 1, 1);
        room.ready(&mut sessions, a).unwrap();
        room.load_complete(&mut sessions, a).unwrap();
        assert_eq!(room.state(), RoomState::Running);

        room.leave(&mut sessions, a).unwrap();
        assert_eq!(room.state(), RoomState::End);
        assert!(room.core().members.is_empty());
        assert!(sessions.get(a).unwrap().room.is_none());
    }

    #[test]
    fn test_leave_while_waiting_keeps_room_open() {
        let (mut room, mut sessions) = setup(2);
        let a = seat(&mut room, &mut sessions, 1, 1);
        seat(&mut room, &mut sessions, 2, 2);

        room.leave(&mut sessions, a).unwrap();
        assert_eq!(room.state(), RoomState::Waiting);
        assert_eq!(room.core().members.len(), 1);
    }

    #[test]
    fn test_leave_by_non_member_is_an_error() {
        let (mut room, mut sessions) = setup(2);
        let stranger = sessions.resolve(([127, 0, 0, 1], 9).into());
        assert!(matches!(
            room.leave(&mut sessions, stranger),
            Err(RoomError::NotAMember { .. })
        ));
    }

    #[test]
    fn test_game_over_resets_member_sessions() {
        let (mut room, mut sessions) = setup(2);
        let a = seat(&mut room, &mut sessions, 1, 1);
        let b = seat(&mut room, &mut sessions, 2, 2);
        room.ready(&mut sessions, a).unwrap();
        room.ready(&mut sessions, b).unwrap();
        room.load_complete(&mut sessions, a).unwrap();
        room.load_complete(&mut sessions, b).unwrap();

        room.game_over(&mut sessions);
        assert_eq!(room.state(), RoomState::End);
        assert_eq!(sessions.get(a).unwrap().state, UserState::Idle);
        assert!(sessions.get(b).unwrap().room.is_none());
    }
}
