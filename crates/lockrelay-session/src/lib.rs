//! Player session tracking for Lockrelay.
//!
//! A session is the server's record of one remote endpoint: who the
//! player claims to be, what room they occupy, and whether they are
//! still alive. On a datagram transport there is no connection to watch
//! for EOF, so liveness is inferred from heartbeats alone.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room layer (above)     ← memberships reference sessions by id
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Transport layer (below) ← delivers datagrams keyed by peer address
//! ```

mod error;
mod session;
mod table;

pub use error::SessionError;
pub use session::{OutboundSender, Session, SessionConfig, SessionId, UserState};
pub use table::SessionTable;
