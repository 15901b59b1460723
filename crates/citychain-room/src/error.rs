//! Error types for the room layer.

use citychain_transport::ConnectionId;

/// Why a city submission was rejected.
///
/// The `Display` text of each variant is exactly the chat line the
/// submitter sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CityError {
    /// Nothing left after trimming.
    #[error("The name of the city cannot be empty.")]
    EmptyCity,

    /// Longer than [`MAX_CITY_LEN`](crate::MAX_CITY_LEN) characters.
    #[error("The name of the city is too long (at most {max} characters).")]
    CityTooLong { max: usize },

    /// The city was already named this round.
    #[error("This city has already been named.")]
    CityAlreadyUsed(String),

    /// The city does not start with the last letter of the previous one.
    #[error("The city must begin with the letter '{expected}'. Try again.")]
    WrongStartingLetter { expected: char },

    /// Turn enforcement is on and it is the other player's move.
    #[error("It's not your turn.")]
    NotYourTurn,
}

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room has this name.
    #[error("room {0:?} not found")]
    RoomNotFound(String),

    /// The room is at capacity.
    #[error("room {0:?} is full")]
    RoomFull(String),

    /// The connection was banned from this room earlier.
    #[error("{0} is banned from room {1:?}")]
    Banned(ConnectionId, String),

    /// The connection is already a member.
    #[error("{0} already in room {1:?}")]
    AlreadyInRoom(ConnectionId, String),

    /// The connection is not a member.
    #[error("{0} not in room {1:?}")]
    NotInRoom(ConnectionId, String),

    /// No member of the room goes by this name.
    #[error("no player named {0:?} in room {1:?}")]
    PlayerNotFound(String, String),

    /// The room's phase doesn't allow this operation.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// The submission broke a city-chain rule.
    #[error(transparent)]
    City(#[from] CityError),

    /// The room's command channel is closed.
    #[error("room {0:?} is unavailable")]
    Unavailable(String),
}
