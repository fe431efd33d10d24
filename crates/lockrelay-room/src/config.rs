//! Room configuration and state machine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for a room instance.
///
/// The [`RoomManager`](crate::RoomManager) holds one template copy and
/// stamps it into every room it creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Player capacity. The match can only start when exactly this many
    /// members are present and ready.
    pub max_users: u16,

    /// Optional tick cap. `Some(n)` ends the match after `n` frames;
    /// `None` runs until the room empties or the game ends itself.
    pub max_ticks: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_users: 2,
            max_ticks: None,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// Transitions are strictly ordered — no skipping states:
///
/// ```text
/// Waiting → Prepare → Running → Balance → End
/// ```
///
/// - **Waiting**: open lobby. Members join, leave, and toggle ready.
/// - **Prepare**: capacity reached and everyone ready; members are
///   loading their scenes.
/// - **Running**: every member loaded; the tick counter advances and a
///   frame goes out per fixed update.
/// - **Balance**: the match ended; settlement is being broadcast.
/// - **End**: settled. The room stays observable for one more pass of
///   the control loop, then its slot returns to the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    #[default]
    Waiting,
    Prepare,
    Running,
    Balance,
    End,
}

impl RoomState {
    /// Returns `true` if the room is accepting new members.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if the room is relaying frames.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Attempts to transition to the next state.
    ///
    /// Returns `Some(next)` if a next state exists, `None` at `End`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Prepare),
            Self::Prepare => Some(Self::Running),
            Self::Running => Some(Self::Balance),
            Self::Balance => Some(Self::End),
            Self::End => None,
        }
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Prepare => write!(f, "Prepare"),
            Self::Running => write!(f, "Running"),
            Self::Balance => write!(f, "Balance"),
            Self::End => write!(f, "End"),
        }
    }
}
