//! Session types: the data structures that represent a player's endpoint.
//!
//! A session tracks:
//! - WHO the player is (`UserId`, unassigned until the first `Join`)
//! - WHERE they are (`SocketAddr`, also the session's lookup key)
//! - WHAT match state they're in ([`UserState`])
//! - WHETHER they're alive (heartbeat deadline + strike counter)

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use lockrelay_pool::Recycle;
use lockrelay_protocol::{RoomId, UserId};

/// Handle for queueing outbound datagrams.
///
/// Every session holds a clone; the control loop owns the receiving end
/// and drains it to the transport once per iteration, so all sends made
/// during one tick leave in the order they were queued.
pub type OutboundSender = tokio::sync::mpsc::UnboundedSender<(SocketAddr, Vec<u8>)>;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session liveness.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a heartbeat keeps a session alive. Each heartbeat
    /// pushes the deadline this far into the future.
    ///
    /// Default: 20 seconds.
    pub heartbeat_window: Duration,

    /// How many consecutive liveness checks a session may miss before
    /// it is evicted.
    ///
    /// Default: 3. A session that misses two checks and then heartbeats
    /// survives; the counter resets on every heartbeat.
    pub max_strikes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_window: Duration::from_secs(20),
            max_strikes: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionId / UserState
// ---------------------------------------------------------------------------

/// Opaque identifier for a session, distinct from the player's `UserId`.
///
/// A returning player gets a fresh `SessionId` for each new endpoint;
/// the `UserId` is what survives a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates a `SessionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Where the player stands in the match lifecycle.
///
/// ```text
///   Idle ──(ready)──→ Ready ──(load complete)──→ Gaming
///     ↑ └──(ready again: toggle)──┘
///     └────────(match over / leave)────────────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserState {
    /// In a room (or none), not yet ready.
    #[default]
    Idle,
    /// Flagged ready; waiting for the rest of the room.
    Ready,
    /// Scene loaded; receiving frames.
    Gaming,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One remote endpoint's server-side record.
#[derive(Debug)]
pub struct Session {
    /// This session's id, reassigned each time the slot is reused.
    pub id: SessionId,

    /// The endpoint datagrams arrive from and replies go to.
    pub peer: SocketAddr,

    /// The player occupying this endpoint. `UserId::UNASSIGNED` until
    /// the first `Join` names one.
    pub user_id: UserId,

    /// Match lifecycle state.
    pub state: UserState,

    /// The room this session belongs to, if any. The room owns the
    /// membership list; this is a back-reference for lookups.
    pub room: Option<RoomId>,

    /// The instant after which this session counts as silent.
    /// `None` until the first heartbeat refresh.
    deadline: Option<Instant>,

    /// Consecutive liveness checks missed.
    strikes: u32,

    /// Outbound queue handle. `None` for sessions that were never
    /// attached to a running transport (some tests do this).
    outbound: Option<OutboundSender>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: SessionId(0),
            peer: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            user_id: UserId::UNASSIGNED,
            state: UserState::Idle,
            room: None,
            deadline: None,
            strikes: 0,
            outbound: None,
        }
    }
}

impl Session {
    /// Rebinds a pooled slot to a fresh endpoint.
    pub(crate) fn attach(
        &mut self,
        id: SessionId,
        peer: SocketAddr,
        outbound: Option<OutboundSender>,
    ) {
        self.id = id;
        self.peer = peer;
        self.outbound = outbound;
    }

    /// Records a heartbeat: clears the strike counter and pushes the
    /// deadline `window` into the future.
    pub fn refresh_heartbeat(&mut self, window: Duration) {
        self.strikes = 0;
        self.deadline = Some(Instant::now() + window);
    }

    /// One liveness check. Returns `true` once the session has missed
    /// `max_strikes` consecutive checks and should be evicted.
    ///
    /// A session that never heartbeated has no deadline and is left
    /// alone; `SessionTable::resolve` refreshes on first contact.
    pub fn check_timeout(&mut self, now: Instant, max_strikes: u32) -> bool {
        match self.deadline {
            Some(deadline) if now > deadline => {
                self.strikes += 1;
                tracing::debug!(
                    session = %self.id,
                    user_id = %self.user_id,
                    strikes = self.strikes,
                    "heartbeat missed"
                );
                self.strikes >= max_strikes
            }
            _ => {
                self.strikes = 0;
                false
            }
        }
    }

    /// Queues one datagram to this session's endpoint.
    ///
    /// Silently does nothing when no outbound handle is attached or the
    /// control loop has already dropped the receiver — on an unreliable
    /// transport a lost send is normal, not an error.
    pub fn send(&self, bytes: Vec<u8>) {
        if let Some(outbound) = &self.outbound {
            if outbound.send((self.peer, bytes)).is_err() {
                tracing::trace!(session = %self.id, "outbound queue closed, datagram dropped");
            }
        }
    }

    /// Current strike count, for eviction diagnostics.
    pub fn strikes(&self) -> u32 {
        self.strikes
    }
}

impl Recycle for Session {
    fn recycle(&mut self) {
        self.id = SessionId(0);
        self.peer = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        self.user_id = UserId::UNASSIGNED;
        self.state = UserState::Idle;
        self.room = None;
        self.deadline = None;
        self.strikes = 0;
        self.outbound = None;
    }
}
