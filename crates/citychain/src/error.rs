//! Unified error type for Citychain.

use citychain_protocol::ProtocolError;
use citychain_room::RoomError;
use citychain_session::SessionError;
use citychain_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CityChainError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, malformed message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (name taken, empty, too long).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, banned, city rejected).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The server was configured with limits that cannot work together.
    #[error("invalid configuration: {0}")]
    Config(String),
}
