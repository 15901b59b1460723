//! The message taxonomy that travels on the wire.
//!
//! Every frame carries exactly one [`Message`]. On the wire a message is an
//! object with a string `type` tag and a tag-dependent `body`:
//!
//! ```json
//! { "type": "name", "body": "Ann" }
//! { "type": "len_clients", "body": [0, 1, 2, 0, 0] }
//! { "type": "start_game", "body": " " }
//! ```

use serde::{Deserialize, Serialize};

/// The fixed list of rooms, in display order.
///
/// The position of each name is significant: `len_clients` reports
/// occupancy positionally in this order.
pub const ROOM_NAMES: [&str; 5] = [
    "Word Wanderers",
    "City Slickers",
    "Urban Odyssey",
    "Alphabet Avenue",
    "Metropolis Minds",
];

/// Body the server puts in a `start_game` message.
pub const START_GAME_BODY: &str = " ";

/// Body the server puts in an `end_game` message.
pub const GAME_OVER: &str = "Game over!";

/// One protocol message.
///
/// `#[serde(tag = "type", content = "body")]` gives the adjacently tagged
/// `{ "type": ..., "body": ... }` shape, and `rename_all = "snake_case"`
/// turns `LenClients` into `"len_clients"`.
///
/// Placeholder bodies (`start_game`, `end_game`, `change_room`, `exit`) are
/// plain strings that receivers ignore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Message {
    /// Client → Server: "call me this".
    Name(String),

    /// Server → Client: member count of every room, in [`ROOM_NAMES`] order.
    LenClients(Vec<usize>),

    /// Client → Server: "put me in this room".
    Room(String),

    /// Server → Client: display names of the members of a room that just
    /// started, in join order.
    Clients(Vec<String>),

    /// Both directions. From a client it is a city submission; from the
    /// server it is narrative text.
    Chat(String),

    /// Client → Server: the username to ban.
    /// Server → Client: the name of the room you were banned from.
    Ban(String),

    /// Server → Client: you have the first turn.
    StartGame(String),

    /// Server → Client: the round is over.
    EndGame(String),

    /// Client → Server: leave the room and go back to room selection.
    ChangeRoom(String),

    /// Client → Server: leave and disconnect.
    Exit(String),

    /// Client → Server: my turn timer ran out. Body is the display name.
    TimeOut(String),

    /// Server → Client: every registered display name, sent once right
    /// after connecting.
    Names(Vec<String>),
}

impl Message {
    /// Shorthand for a server narrative line.
    pub fn chat(text: impl Into<String>) -> Self {
        Self::Chat(text.into())
    }

    /// The `end_game` notice the server sends.
    pub fn end_game() -> Self {
        Self::EndGame(GAME_OVER.to_string())
    }

    /// The `start_game` signal the server sends.
    pub fn start_game() -> Self {
        Self::StartGame(START_GAME_BODY.to_string())
    }

    /// The wire tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::LenClients(_) => "len_clients",
            Self::Room(_) => "room",
            Self::Clients(_) => "clients",
            Self::Chat(_) => "chat",
            Self::Ban(_) => "ban",
            Self::StartGame(_) => "start_game",
            Self::EndGame(_) => "end_game",
            Self::ChangeRoom(_) => "change_room",
            Self::Exit(_) => "exit",
            Self::TimeOut(_) => "time_out",
            Self::Names(_) => "names",
        }
    }

    /// Returns `true` for tags only the server may send.
    pub fn is_server_only(&self) -> bool {
        matches!(
            self,
            Self::LenClients(_)
                | Self::Clients(_)
                | Self::StartGame(_)
                | Self::EndGame(_)
                | Self::Names(_)
        )
    }
}

// =========================================================================
// Tests
// =========================================================================
