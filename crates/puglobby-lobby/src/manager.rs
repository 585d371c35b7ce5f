//! Connection manager: the process-wide lobby registry.
//!
//! # Locking
//!
//! The registry has its own `RwLock`, separate from every lobby's lock.
//! The two are never held at the same time: lookups clone the `Arc` out
//! of the map and drop the registry guard before touching the lobby.
//! That keeps a slow lobby from stalling lookups of every other lobby.

use std::collections::HashMap;
use std::sync::Arc;

use puglobby_protocol::{LobbyId, LobbyOptions, LobbySummary};
use puglobby_session::Client;
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::sync::RwLock;

use crate::{Clock, Lobby, LobbyConfig, LobbyContext, LobbyError, PugLobby};

/// Registry of live lobbies, keyed by lobby id.
///
/// This is the entry point for lobby lookups from the dispatcher and the
/// disconnect path. It is meant to be shared behind an `Arc`; every
/// method takes `&self`.
pub struct ConnectionManager<L: Lobby = PugLobby> {
    lobbies: RwLock<HashMap<LobbyId, Arc<L>>>,
    config: LobbyConfig,
    clock: Arc<dyn Clock>,
}

impl<L: Lobby> ConnectionManager<L> {
    /// Creates an empty registry.
    pub fn new(config: LobbyConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            lobbies: RwLock::new(HashMap::new()),
            config,
            clock,
        }
    }

    /// Creates a lobby led by `creator` and registers it.
    ///
    /// The id is drawn under the registry's exclusive lock, so two
    /// concurrent creates can never register the same id.
    pub async fn create_lobby(&self, creator: &Client, options: LobbyOptions) -> Arc<L> {
        let context = LobbyContext {
            clock: Arc::clone(&self.clock),
            leader_failover: self.config.leader_failover,
        };

        let mut lobbies = self.lobbies.write().await;
        let id = loop {
            let candidate = generate_lobby_id(self.config.id_length);
            if !lobbies.contains_key(&candidate) {
                break candidate;
            }
        };

        let lobby = Arc::new(L::open(id.clone(), creator, options, context));
        lobbies.insert(id.clone(), Arc::clone(&lobby));
        tracing::info!(
            lobby_id = %id,
            player_id = %creator.id(),
            lobbies = lobbies.len(),
            "lobby created"
        );
        lobby
    }

    /// Looks up a lobby by id.
    ///
    /// # Errors
    /// [`LobbyError::InvalidLobbyId`] if no lobby is registered under `id`.
    pub async fn find_lobby(&self, id: &LobbyId) -> Result<Arc<L>, LobbyError> {
        self.lobbies
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| LobbyError::InvalidLobbyId(id.clone()))
    }

    /// Deregisters a lobby whatever its roster.
    ///
    /// Members keep the id in their lobby sets; the disconnect path
    /// tolerates that because leaving an unregistered lobby is skipped.
    ///
    /// # Errors
    /// [`LobbyError::InvalidLobbyId`] if no lobby is registered under `id`.
    pub async fn remove_lobby(&self, id: &LobbyId) -> Result<(), LobbyError> {
        let mut lobbies = self.lobbies.write().await;
        lobbies
            .remove(id)
            .ok_or_else(|| LobbyError::InvalidLobbyId(id.clone()))?;
        tracing::info!(lobby_id = %id, lobbies = lobbies.len(), "lobby removed");
        Ok(())
    }

    /// Deregisters `lobby` if its roster is empty.
    ///
    /// The lobby is closed first (under its own lock), so a join racing
    /// with this call either lands before the close and keeps the lobby
    /// alive, or is rejected. Only the exact instance passed in is
    /// removed; a different lobby registered under the same id is left
    /// alone.
    pub async fn remove_if_empty(&self, lobby: &Arc<L>) -> bool {
        if !lobby.close_if_empty().await {
            return false;
        }

        let mut lobbies = self.lobbies.write().await;
        match lobbies.get(lobby.id()) {
            Some(registered) if Arc::ptr_eq(registered, lobby) => {
                lobbies.remove(lobby.id());
                tracing::info!(lobby_id = %lobby.id(), lobbies = lobbies.len(), "empty lobby removed");
                true
            }
            _ => false,
        }
    }

    /// Public summaries of every lobby with at least one member, sorted
    /// by id.
    pub async fn list_lobbies(&self) -> Vec<LobbySummary> {
        let handles: Vec<Arc<L>> = self.lobbies.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for lobby in handles {
            let summary = lobby.summary().await;
            if summary.client_count > 0 {
                summaries.push(summary);
            }
        }
        summaries.sort_by(|a, b| a.lobby_id.as_str().cmp(b.lobby_id.as_str()));
        summaries
    }

    /// Returns the number of registered lobbies.
    pub async fn lobby_count(&self) -> usize {
        self.lobbies.read().await.len()
    }

    /// Lists every registered lobby id.
    pub async fn lobby_ids(&self) -> Vec<LobbyId> {
        self.lobbies.read().await.keys().cloned().collect()
    }
}

/// Draws a random alphanumeric lobby code.
fn generate_lobby_id(len: usize) -> LobbyId {
    let code: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len.max(1))
        .map(char::from)
        .collect();
    LobbyId::new(code)
}

#[cfg(test)]
mod tests {
    use puglobby_protocol::{Player, PlayerId};

    use super::*;
    use crate::SystemClock;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(LobbyConfig::default(), Arc::new(SystemClock))
    }

    fn client(id: u64) -> Client {
        Client::new(Player::new(PlayerId(id), "p"), 8).0
    }

    #[test]
    fn test_generate_lobby_id_has_requested_length() {
        let id = generate_lobby_id(8);
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_create_lobby_registers_it() {
        let mgr = manager();
        let a = client(1);

        let lobby = mgr.create_lobby(&a, LobbyOptions::default()).await;

        assert_eq!(mgr.lobby_count().await, 1);
        assert_eq!(lobby.id().as_str().len(), 6);
        assert!(mgr.find_lobby(lobby.id()).await.is_ok());
        assert_eq!(a.current_lobby().as_ref(), Some(lobby.id()));
    }

    #[tokio::test]
    async fn test_find_unknown_lobby_is_invalid_lobby_id() {
        let mgr = manager();
        assert!(matches!(
            mgr.find_lobby(&LobbyId::new("nope")).await,
            Err(LobbyError::InvalidLobbyId(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_if_empty_keeps_populated_lobby() {
        let mgr = manager();
        let lobby = mgr.create_lobby(&client(1), LobbyOptions::default()).await;

        assert!(!mgr.remove_if_empty(&lobby).await);
        assert_eq!(mgr.lobby_count().await, 1);
    }

    #[tokio::test]
    async fn test_remove_if_empty_removes_after_last_leave() {
        let mgr = manager();
        let a = client(1);
        let lobby = mgr.create_lobby(&a, LobbyOptions::default()).await;
        lobby.leave(&a).await.unwrap();

        assert!(mgr.remove_if_empty(&lobby).await);
        assert!(mgr.find_lobby(lobby.id()).await.is_err());
        assert!(!mgr.remove_if_empty(&lobby).await, "second call is a no-op");
    }

    #[tokio::test]
    async fn test_remove_lobby_twice_is_invalid_lobby_id() {
        let mgr = manager();
        let lobby = mgr.create_lobby(&client(1), LobbyOptions::default()).await;

        mgr.remove_lobby(lobby.id()).await.unwrap();
        assert!(matches!(
            mgr.remove_lobby(lobby.id()).await,
            Err(LobbyError::InvalidLobbyId(_))
        ));
    }

    #[tokio::test]
    async fn test_list_lobbies_is_sorted_and_counts_members() {
        let mgr = manager();
        let a = client(1);
        let b = client(2);
        let first = mgr.create_lobby(&a, LobbyOptions::default()).await;
        mgr.create_lobby(&b, LobbyOptions::default()).await;
        first.join(&b).await.unwrap();

        let list = mgr.list_lobbies().await;

        assert_eq!(list.len(), 2);
        assert!(list[0].lobby_id.as_str() <= list[1].lobby_id.as_str());
        let entry = list.iter().find(|s| &s.lobby_id == first.id()).unwrap();
        assert_eq!(entry.client_count, 2);
    }

    #[tokio::test]
    async fn test_list_lobbies_skips_empty_lobbies() {
        let mgr = manager();
        let a = client(1);
        let lobby = mgr.create_lobby(&a, LobbyOptions::default()).await;
        lobby.leave(&a).await.unwrap();

        assert!(mgr.list_lobbies().await.is_empty());
        assert_eq!(mgr.lobby_ids().await, vec![lobby.id().clone()]);
    }
}
