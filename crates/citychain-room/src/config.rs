//! Room configuration and phase state machine.

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room on a server.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Members needed to start a round.
    pub min_players: usize,

    /// Maximum members a room holds.
    pub max_players: usize,

    /// Reject city submissions from the member whose turn it is not.
    ///
    /// Off by default: clients gate their own input and the server trusts
    /// them.
    pub enforce_turns: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 2,
            enforce_turns: false,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The phase of a room's current round.
///
/// ```text
///            second join                member count < 2
/// Waiting ───────────────→ Active ───────────────────────→ Ended
///    ↑                                                       │
///    └─────────────── immediate reset (members cleared) ─────┘
/// ```
///
/// - **Waiting**: accepting members. Zero or one present.
/// - **Active**: two members naming cities in turn.
/// - **Ended**: the round is over. Never observed from outside the room
///   actor, because the reset to `Waiting` happens in the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomState {
    #[default]
    Waiting,
    Active,
    Ended,
}

impl RoomState {
    /// Returns `true` if the room is accepting new members.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` while a round is running.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns the phase that follows this one.
    pub fn next(self) -> Self {
        match self {
            Self::Waiting => Self::Active,
            Self::Active => Self::Ended,
            Self::Ended => Self::Waiting,
        }
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == target
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Active => write!(f, "Active"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}
