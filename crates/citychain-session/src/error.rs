//! Error types for the session layer.

use citychain_transport::ConnectionId;

/// Errors that can occur while claiming or releasing a display name.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Another live connection already holds this name.
    #[error("name {0:?} is already taken")]
    NameTaken(String),

    /// The name is empty or only whitespace.
    #[error("name must not be empty")]
    EmptyName,

    /// The name is longer than [`SessionConfig::max_name_len`](crate::SessionConfig).
    #[error("name is {len} characters, the limit is {max}")]
    NameTooLong { len: usize, max: usize },

    /// The registry already holds [`SessionConfig::max_sessions`](crate::SessionConfig) names.
    #[error("registry is full ({max} names)")]
    Full { max: usize },

    /// No session exists for the given connection.
    #[error("no session for connection {0}")]
    NotFound(ConnectionId),
}
