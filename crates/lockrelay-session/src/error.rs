//! Error types for the session layer.

use crate::SessionId;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists with the given id. Happens when a room or a
    /// handler references a session that was already evicted.
    #[error("session not found: {0}")]
    NotFound(SessionId),
}
