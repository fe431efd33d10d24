//! Wire protocol for Lockrelay.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`UserId`], [`RoomId`], [`Opcode`], [`InputSet`],
//!   [`Frame`]) — the values that travel on the wire.
//! - **Wire codec** ([`WireWriter`], [`WireReader`]) — the flat
//!   big-endian binary encoding shared by every message.
//! - **Packet** ([`Packet`]) — the length-delimited envelope with its
//!   status/reason reply channel.
//! - **Messages** ([`Message`] trait and the per-opcode structs) — the
//!   room-protocol catalogue.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw datagrams) and session
//! (player identity). It doesn't know about connections or rooms — it only
//! knows how to turn messages into bytes and back.
//!
//! ```text
//! Transport (bytes) → Protocol (Packet) → Session (player context)
//! ```

mod error;
mod input;
mod messages;
mod packet;
mod types;
mod wire;

pub use error::ProtocolError;
pub use input::{Frame, InputSet};
pub use messages::{
    Balance, GameOver, GameStart, Heartbeat, HeartbeatAck, Join, Leave,
    LoadComplete, LoadGame, Message, PlayerInput, PlayerJoin, PlayerLeave,
    PlayerReady, Ready, RoomInfo,
};
pub use packet::{MAX_PAYLOAD, Packet, status};
pub use types::{Opcode, RoomId, UserId};
pub use wire::{WireReader, WireWriter};
