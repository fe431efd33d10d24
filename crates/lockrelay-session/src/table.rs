//! The session table: every live endpoint the server knows about.
//!
//! Datagrams carry no session handle, so the peer address IS the
//! session key: the first datagram from an unknown endpoint creates a
//! session, and every later one resolves to the same record.
//!
//! # Concurrency note
//!
//! `SessionTable` is NOT thread-safe by itself. It is owned by the
//! single control loop; the transport reader task never touches it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use lockrelay_pool::Pool;
use lockrelay_protocol::UserId;

use crate::{OutboundSender, Session, SessionConfig, SessionId};

/// Counter for generating unique session IDs.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Registry of all live sessions, keyed by endpoint.
///
/// Session objects are drawn from a [`Pool`] and handed back on
/// removal, so a busy server churns endpoints without churning
/// allocations.
pub struct SessionTable {
    sessions: HashMap<SocketAddr, Session>,
    /// Index from session id to endpoint, kept in sync with `sessions`.
    by_id: HashMap<SessionId, SocketAddr>,
    pool: Pool<Session>,
    config: SessionConfig,
    outbound: Option<OutboundSender>,
}

impl SessionTable {
    /// Creates an empty table with the given liveness config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            by_id: HashMap::new(),
            pool: Pool::new(),
            config,
            outbound: None,
        }
    }

    /// Attaches the outbound queue handle cloned into every session
    /// created from here on.
    pub fn set_outbound(&mut self, outbound: OutboundSender) {
        self.outbound = Some(outbound);
    }

    /// The liveness config this table enforces.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Looks up the session for `peer`, creating one on first contact.
    ///
    /// A fresh session starts with its heartbeat deadline already
    /// refreshed; the datagram that created it proves liveness.
    pub fn resolve(&mut self, peer: SocketAddr) -> SessionId {
        if let Some(session) = self.sessions.get(&peer) {
            return session.id;
        }

        let id = SessionId::new(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
        let mut session = self.pool.acquire();
        session.attach(id, peer, self.outbound.clone());
        session.refresh_heartbeat(self.config.heartbeat_window);

        tracing::info!(session = %id, %peer, "session created");
        self.by_id.insert(id, peer);
        self.sessions.insert(peer, session);
        id
    }

    /// Returns the session with the given id, if it is still live.
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(self.by_id.get(&id)?)
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(self.by_id.get(&id)?)
    }

    /// Finds the session a given player occupies.
    pub fn get_by_user(&self, user_id: UserId) -> Option<&Session> {
        self.sessions.values().find(|s| s.user_id == user_id)
    }

    /// Destroys a session and returns its slot to the pool.
    ///
    /// Returns `false` when the id is unknown; removing an
    /// already-evicted session is a no-op, not an error.
    pub fn remove(&mut self, id: SessionId) -> bool {
        let Some(peer) = self.by_id.remove(&id) else {
            return false;
        };
        if let Some(session) = self.sessions.remove(&peer) {
            tracing::info!(session = %id, %peer, user_id = %session.user_id, "session destroyed");
            self.pool.release(session);
        }
        true
    }

    /// One liveness sweep: returns every session that has now missed
    /// its final strike. The caller is expected to run the normal
    /// leave flow for each id and then [`remove`](Self::remove) it.
    pub fn scan_timeouts(&mut self, now: Instant) -> Vec<SessionId> {
        let max_strikes = self.config.max_strikes;
        self.sessions
            .values_mut()
            .filter_map(|session| {
                session.check_timeout(now, max_strikes).then(|| {
                    tracing::warn!(
                        session = %session.id,
                        user_id = %session.user_id,
                        "session timed out"
                    );
                    session.id
                })
            })
            .collect()
    }

    /// Iterates over all live sessions.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Destroys every session, returning the slots to the pool.
    /// Used by server shutdown.
    pub fn clear(&mut self) {
        self.by_id.clear();
        for (_, session) in self.sessions.drain() {
            self.pool.release(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lockrelay_protocol::UserId;

    use super::*;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    /// Config whose heartbeat window is already expired, so every scan
    /// counts a strike.
    fn table_with_instant_expiry() -> SessionTable {
        SessionTable::new(SessionConfig {
            heartbeat_window: Duration::ZERO,
            max_strikes: 3,
        })
    }

    #[test]
    fn test_resolve_same_peer_returns_same_session() {
        let mut table = SessionTable::new(SessionConfig::default());
        let a = table.resolve(peer(1000));
        let b = table.resolve(peer(1000));
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resolve_distinct_peers_creates_distinct_sessions() {
        let mut table = SessionTable::new(SessionConfig::default());
        let a = table.resolve(peer(1000));
        let b = table.resolve(peer(1001));
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_get_by_user_finds_assigned_session() {
        let mut table = SessionTable::new(SessionConfig::default());
        let id = table.resolve(peer(1000));
        table.get_mut(id).unwrap().user_id = UserId(7);

        assert_eq!(table.get_by_user(UserId(7)).unwrap().id, id);
        assert!(table.get_by_user(UserId(8)).is_none());
    }

    #[test]
    fn test_remove_unknown_id_is_a_noop() {
        let mut table = SessionTable::new(SessionConfig::default());
        assert!(!table.remove(SessionId::new(999)));
    }

    #[test]
    fn test_remove_then_get_returns_none() {
        let mut table = SessionTable::new(SessionConfig::default());
        let id = table.resolve(peer(1000));
        assert!(table.remove(id));
        assert!(table.get(id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_removed_slot_is_recycled_for_next_session() {
        let mut table = SessionTable::new(SessionConfig::default());
        let id = table.resolve(peer(1000));
        table.get_mut(id).unwrap().user_id = UserId(7);
        table.remove(id);

        let id2 = table.resolve(peer(1001));
        let reused = table.get(id2).unwrap();
        assert_ne!(id, id2);
        assert_eq!(reused.user_id, UserId::UNASSIGNED);
    }

    #[test]
    fn test_scan_timeouts_evicts_on_third_strike_only() {
        let mut table = table_with_instant_expiry();
        let id = table.resolve(peer(1000));
        let later = Instant::now() + Duration::from_secs(1);

        assert!(table.scan_timeouts(later).is_empty());
        assert!(table.scan_timeouts(later).is_empty());
        assert_eq!(table.scan_timeouts(later), vec![id]);
    }

    #[test]
    fn test_scan_timeouts_heartbeat_between_scans_survives() {
        let mut table = table_with_instant_expiry();
        let id = table.resolve(peer(1000));
        let later = Instant::now() + Duration::from_secs(1);

        assert!(table.scan_timeouts(later).is_empty());
        assert!(table.scan_timeouts(later).is_empty());

        table
            .get_mut(id)
            .unwrap()
            .refresh_heartbeat(Duration::from_secs(60));
        assert!(table.scan_timeouts(later).is_empty());
    }

    #[test]
    fn test_clear_destroys_everything() {
        let mut table = SessionTable::new(SessionConfig::default());
        table.resolve(peer(1000));
        table.resolve(peer(1001));
        table.clear();
        assert!(table.is_empty());
    }
}
