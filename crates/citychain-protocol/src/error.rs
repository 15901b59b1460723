//! Error types for the protocol layer.
//!
//! Framing problems (short reads, closed sockets) belong to the transport
//! layer. A `ProtocolError` means the bytes of a complete frame were the
//! problem.

/// Errors that can occur while encoding or decoding a [`Message`](crate::Message).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A well-framed payload did not deserialize into a `{type, body}` pair
    /// with a known type and a body of the right shape.
    #[cfg(feature = "json")]
    #[error("malformed message: {0}")]
    MalformedMessage(serde_json::Error),
}
