//! The session registry: which connection holds which display name.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is a plain struct with no interior locking. The server
//! keeps it behind a single `tokio::sync::Mutex`, so every claim and release
//! is serialized and the two maps below never drift apart.

use std::collections::HashMap;

use citychain_transport::ConnectionId;

use crate::{Session, SessionConfig, SessionError};

/// Tracks the display name of every live, named connection.
///
/// ## Lifecycle
///
/// ```text
/// accept ──→ claim(name) ──→ ... ──→ release() ──→ name is free again
///               │
///               └── claim(other name) renames in place
/// ```
pub struct SessionRegistry {
    /// All sessions, keyed by the owning connection.
    sessions: HashMap<ConnectionId, Session>,

    /// Index from name to owner, kept in sync with `sessions`. Makes the
    /// uniqueness check O(1).
    names: HashMap<String, ConnectionId>,

    /// Next registration sequence number.
    next_seq: u64,

    config: SessionConfig,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            names: HashMap::new(),
            next_seq: 0,
            config,
        }
    }

    /// Claims `name` for `conn_id`.
    ///
    /// Claiming the name you already hold succeeds and changes nothing.
    /// Claiming a different free name renames the session in place and
    /// frees the old name.
    ///
    /// # Errors
    /// - [`SessionError::EmptyName`] if `name` is blank.
    /// - [`SessionError::NameTooLong`] if it exceeds the configured limit.
    /// - [`SessionError::NameTaken`] if another connection holds it.
    /// - [`SessionError::Full`] if a new connection claims while
    ///   [`SessionConfig::max_sessions`] names are held.
    pub fn claim(
        &mut self,
        conn_id: ConnectionId,
        name: &str,
    ) -> Result<&Session, SessionError> {
        if name.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }
        let len = name.chars().count();
        if len > self.config.max_name_len {
            return Err(SessionError::NameTooLong {
                len,
                max: self.config.max_name_len,
            });
        }

        if self.name_of(conn_id) == Some(name) {
            return self.get(conn_id);
        }
        if !self.is_available(name) {
            return Err(SessionError::NameTaken(name.to_string()));
        }

        if let Some(existing) = self.sessions.get_mut(&conn_id) {
            self.names.remove(&existing.name);
            tracing::info!(
                %conn_id,
                old = %existing.name,
                new = name,
                "session renamed"
            );
            existing.name = name.to_string();
        } else {
            if self.sessions.len() >= self.config.max_sessions {
                return Err(SessionError::Full {
                    max: self.config.max_sessions,
                });
            }
            let session = Session {
                conn_id,
                name: name.to_string(),
                seq: self.next_seq,
            };
            self.next_seq += 1;
            self.sessions.insert(conn_id, session);
            tracing::info!(%conn_id, name, "session created");
        }
        self.names.insert(name.to_string(), conn_id);

        self.get(conn_id)
    }

    /// Frees whatever name `conn_id` holds.
    ///
    /// Returns the released session, or `None` if the connection never
    /// claimed a name (or was already released).
    pub fn release(&mut self, conn_id: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&conn_id)?;
        self.names.remove(&session.name);
        tracing::info!(%conn_id, name = %session.name, "session released");
        Some(session)
    }

    /// Returns the session for `conn_id`.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the connection has no name.
    pub fn get(&self, conn_id: ConnectionId) -> Result<&Session, SessionError> {
        self.sessions
            .get(&conn_id)
            .ok_or(SessionError::NotFound(conn_id))
    }

    /// Returns the name held by `conn_id`, if any.
    pub fn name_of(&self, conn_id: ConnectionId) -> Option<&str> {
        self.sessions.get(&conn_id).map(|s| s.name.as_str())
    }

    /// Returns `true` if no live connection holds `name`.
    pub fn is_available(&self, name: &str) -> bool {
        !self.names.contains_key(name)
    }

    /// Every registered name, oldest registration first.
    pub fn names(&self) -> Vec<String> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by_key(|s| s.seq);
        sessions.into_iter().map(|s| s.name.clone()).collect()
    }

    /// Returns the number of named connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody has claimed a name.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionRegistry`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::default()
    }

    // =====================================================================
    // claim()
    // =====================================================================

    #[test]
    fn test_claim_free_name_creates_session() {
        let mut reg = registry();

        let session = reg.claim(cid(1), "Ann").expect("should succeed");

        assert_eq!(session.conn_id, cid(1));
        assert_eq!(session.name, "Ann");
        assert!(!reg.is_available("Ann"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_claim_taken_name_returns_error() {
        let mut reg = registry();
        reg.claim(cid(1), "Ann").unwrap();

        let result = reg.claim(cid(2), "Ann");

        assert!(
            matches!(result, Err(SessionError::NameTaken(ref n)) if n == "Ann"),
            "should reject a name held by another connection"
        );
        // The loser gets nothing registered.
        assert!(reg.name_of(cid(2)).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_claim_is_case_sensitive() {
        let mut reg = registry();
        reg.claim(cid(1), "Ann").unwrap();

        assert!(reg.claim(cid(2), "ann").is_ok());
    }

    #[test]
    fn test_claim_own_name_again_is_noop() {
        let mut reg = registry();
        let seq = reg.claim(cid(1), "Ann").unwrap().seq;

        let session = reg.claim(cid(1), "Ann").expect("reclaim should succeed");

        assert_eq!(session.seq, seq);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_claim_new_name_renames_and_frees_old() {
        let mut reg = registry();
        reg.claim(cid(1), "Ann").unwrap();

        reg.claim(cid(1), "Annie").unwrap();

        assert!(reg.is_available("Ann"));
        assert!(!reg.is_available("Annie"));
        assert_eq!(reg.name_of(cid(1)), Some("Annie"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_claim_blank_name_returns_empty_name() {
        let mut reg = registry();

        assert!(matches!(reg.claim(cid(1), ""), Err(SessionError::EmptyName)));
        assert!(matches!(
            reg.claim(cid(1), "   "),
            Err(SessionError::EmptyName)
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_claim_long_name_returns_too_long() {
        let mut reg = SessionRegistry::new(SessionConfig {
            max_name_len: 3,
            ..SessionConfig::default()
        });

        let result = reg.claim(cid(1), "Anne");

        assert!(matches!(
            result,
            Err(SessionError::NameTooLong { len: 4, max: 3 })
        ));
    }

    #[test]
    fn test_claim_counts_characters_not_bytes() {
        let mut reg = SessionRegistry::new(SessionConfig {
            max_name_len: 4,
            ..SessionConfig::default()
        });

        assert!(reg.claim(cid(1), "Аня").is_ok());
    }

    #[test]
    fn test_claim_when_full_returns_full() {
        let mut reg = SessionRegistry::new(SessionConfig {
            max_sessions: 2,
            ..SessionConfig::default()
        });
        reg.claim(cid(1), "Ann").unwrap();
        reg.claim(cid(2), "Bob").unwrap();

        let result = reg.claim(cid(3), "Cy");

        assert!(matches!(result, Err(SessionError::Full { max: 2 })));
        assert!(reg.is_available("Cy"));
        assert_eq!(reg.names(), vec!["Ann", "Bob"]);
    }

    #[test]
    fn test_claim_rename_when_full_succeeds() {
        let mut reg = SessionRegistry::new(SessionConfig {
            max_sessions: 2,
            ..SessionConfig::default()
        });
        reg.claim(cid(1), "Ann").unwrap();
        reg.claim(cid(2), "Bob").unwrap();

        reg.claim(cid(1), "Annie").expect("renames do not add a session");

        assert_eq!(reg.names(), vec!["Annie", "Bob"]);
    }

    #[test]
    fn test_claim_after_release_when_full_succeeds() {
        let mut reg = SessionRegistry::new(SessionConfig {
            max_sessions: 1,
            ..SessionConfig::default()
        });
        reg.claim(cid(1), "Ann").unwrap();
        reg.release(cid(1));

        assert!(reg.claim(cid(2), "Bob").is_ok());
    }

    // =====================================================================
    // release()
    // =====================================================================

    #[test]
    fn test_release_frees_name() {
        let mut reg = registry();
        reg.claim(cid(1), "Ann").unwrap();

        let released = reg.release(cid(1)).expect("should release");

        assert_eq!(released.name, "Ann");
        assert!(reg.is_available("Ann"));
        assert!(reg.is_empty());
        // Someone else can take it now.
        assert!(reg.claim(cid(2), "Ann").is_ok());
    }

    #[test]
    fn test_release_twice_is_noop() {
        let mut reg = registry();
        reg.claim(cid(1), "Ann").unwrap();
        reg.release(cid(1));

        assert!(reg.release(cid(1)).is_none());
    }

    #[test]
    fn test_release_unnamed_connection_returns_none() {
        let mut reg = registry();

        assert!(reg.release(cid(99)).is_none());
    }

    // =====================================================================
    // get() / names()
    // =====================================================================

    #[test]
    fn test_get_unknown_connection_returns_not_found() {
        let reg = registry();

        assert!(matches!(
            reg.get(cid(5)),
            Err(SessionError::NotFound(c)) if c == cid(5)
        ));
    }

    #[test]
    fn test_names_in_registration_order() {
        let mut reg = registry();
        reg.claim(cid(3), "Cy").unwrap();
        reg.claim(cid(1), "Ann").unwrap();
        reg.claim(cid(2), "Bob").unwrap();

        assert_eq!(reg.names(), vec!["Cy", "Ann", "Bob"]);
    }

    #[test]
    fn test_names_keeps_position_across_rename() {
        let mut reg = registry();
        reg.claim(cid(1), "Ann").unwrap();
        reg.claim(cid(2), "Bob").unwrap();
        reg.claim(cid(1), "Annie").unwrap();

        assert_eq!(reg.names(), vec!["Annie", "Bob"]);
    }

    #[test]
    fn test_names_skips_released() {
        let mut reg = registry();
        reg.claim(cid(1), "Ann").unwrap();
        reg.claim(cid(2), "Bob").unwrap();
        reg.release(cid(1));

        assert_eq!(reg.names(), vec!["Bob"]);
    }
}
