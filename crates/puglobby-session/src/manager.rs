//! The session manager: which players currently hold a live connection.
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself: it uses a plain
//! `HashMap`. The server wraps it in a mutex and only holds that lock for
//! the duration of one insert or remove.

use std::collections::HashMap;

use puglobby_protocol::PlayerId;

use crate::{Client, SessionError};

/// Registry of connected clients, keyed by Steam ID.
///
/// Enforces one live connection per player. That is what lets lobbies
/// compare clients by identity: two roster entries with the same Steam ID
/// can only ever be the same connection.
#[derive(Default)]
pub struct SessionManager {
    sessions: HashMap<PlayerId, Client>,
}

impl SessionManager {
    /// Creates an empty session manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a freshly authenticated client.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the player already
    /// has a live connection.
    pub fn register(&mut self, client: Client) -> Result<(), SessionError> {
        let player_id = client.id();
        if self.sessions.contains_key(&player_id) {
            return Err(SessionError::AlreadyConnected(player_id));
        }
        self.sessions.insert(player_id, client);
        tracing::info!(%player_id, sessions = self.sessions.len(), "session created");
        Ok(())
    }

    /// Releases a player's session when their connection ends.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the player had no session.
    pub fn release(&mut self, player_id: PlayerId) -> Result<Client, SessionError> {
        let client = self
            .sessions
            .remove(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        tracing::info!(%player_id, sessions = self.sessions.len(), "session released");
        Ok(client)
    }

    /// Looks up a connected player.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Client> {
        self.sessions.get(player_id)
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionManager`, named
    //! `test_{function}_{scenario}_{expected}`.

    use puglobby_protocol::Player;

    use super::*;

    fn client(id: u64) -> Client {
        Client::new(Player::new(PlayerId(id), "p"), 8).0
    }

    #[test]
    fn test_register_new_player_succeeds() {
        let mut mgr = SessionManager::new();
        mgr.register(client(1)).expect("should succeed");
        assert_eq!(mgr.len(), 1);
        assert!(mgr.get(&PlayerId(1)).is_some());
    }

    #[test]
    fn test_register_already_connected_returns_error() {
        let mut mgr = SessionManager::new();
        mgr.register(client(1)).unwrap();

        let result = mgr.register(client(1));

        assert!(
            matches!(result, Err(SessionError::AlreadyConnected(p)) if p == PlayerId(1)),
            "should reject a second live connection"
        );
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_release_then_register_again_succeeds() {
        let mut mgr = SessionManager::new();
        mgr.register(client(1)).unwrap();
        let released = mgr.release(PlayerId(1)).expect("should release");
        assert_eq!(released.id(), PlayerId(1));
        assert!(mgr.is_empty());

        mgr.register(client(1)).expect("reconnect after release");
    }

    #[test]
    fn test_release_unknown_player_returns_not_found() {
        let mut mgr = SessionManager::new();
        assert!(matches!(
            mgr.release(PlayerId(9)),
            Err(SessionError::NotFound(p)) if p == PlayerId(9)
        ));
    }
}
