//! Session types: what the server remembers about a named connection.

use citychain_transport::ConnectionId;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Bytes one name character can take once JSON-encoded (a `\u00XX` escape).
const MAX_ENCODED_CHAR_LEN: usize = 6;

/// Fixed part of an encoded `names` message: `{"type":"names","body":[]}`.
const NAMES_ENVELOPE_LEN: usize = 26;

/// Limits applied when a connection claims a name.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Longest accepted display name, in characters.
    ///
    /// Default: 32.
    pub max_name_len: usize,

    /// Most names held at once. Claims by new connections beyond this are
    /// refused; renames always go through.
    ///
    /// Default: 256.
    pub max_sessions: usize,
}

impl SessionConfig {
    /// Upper bound on the encoded size of the `names` snapshot a full
    /// registry produces.
    ///
    /// Every name costs its characters at their longest JSON escape plus
    /// two quotes and a separator.
    pub fn max_names_payload(&self) -> usize {
        let per_name = self
            .max_name_len
            .saturating_mul(MAX_ENCODED_CHAR_LEN)
            .saturating_add(3);
        self.max_sessions
            .saturating_mul(per_name)
            .saturating_add(NAMES_ENVELOPE_LEN)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_name_len: 32,
            max_sessions: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One connection's claim on a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The connection that owns the name.
    pub conn_id: ConnectionId,

    /// The display name, exactly as the client sent it.
    pub name: String,

    /// Registration order. Lower numbers registered earlier; the `names`
    /// snapshot is sorted by this.
    pub seq: u64,
}
