//! Room lifecycle and lockstep frame relay for Lockrelay.
//!
//! A room is a match: a bounded set of members that walks one strict
//! lifecycle from open lobby to settlement, relaying an aggregated input
//! frame to every member once per fixed tick while it runs.
//!
//! # Key types
//!
//! - [`Room`] — the state machine; owns membership and drives transitions
//! - [`RoomLogic`] — the hook trait games implement; transitions are not
//!   overridable, only observable
//! - [`LockstepLogic`] — the built-in [`RoomLogic`] that aggregates and
//!   broadcasts input frames
//! - [`RoomManager`] — pool-backed allocator and registry of live rooms
//! - [`RoomState`] / [`RoomConfig`] — lifecycle states and per-room settings

mod config;
mod error;
mod lockstep;
mod logic;
mod manager;
mod room;

pub use config::{RoomConfig, RoomState};
pub use error::RoomError;
pub use lockstep::{LockstepLogic, FRAME_HISTORY};
pub use logic::{RoomCtx, RoomLogic, Step};
pub use manager::RoomManager;
pub use room::{Member, Room, RoomCore};
