//! Pick-up-game lobby: the one concrete [`Lobby`] kind.

use puglobby_protocol::{
    LeaveLobbyResponse, LobbyId, LobbyKind, LobbyOptions, LobbyResponse, LobbySnapshot,
    LobbySummary, Player, ServerMessage, UserMessage,
};
use puglobby_session::Client;
use tokio::sync::RwLock;

use crate::{JoinOutcome, LeaderFailover, Lobby, LobbyContext, LobbyError};

/// Mutable lobby state. Only reachable through [`PugLobby`]'s lock.
struct PugState {
    leader: Option<Client>,
    /// Members in join order; never contains the same player twice.
    clients: Vec<Client>,
    messages: Vec<UserMessage>,
    /// Set once the roster is empty and the lobby is being deregistered.
    closed: bool,
}

impl PugState {
    fn contains(&self, client: &Client) -> bool {
        self.clients.iter().any(|c| c == client)
    }
}

/// A pick-up-game lobby.
///
/// The id and options never change after creation and sit outside the
/// lock; everything else is behind a `tokio::sync::RwLock` that this type
/// never exposes.
pub struct PugLobby {
    id: LobbyId,
    options: LobbyOptions,
    context: LobbyContext,
    state: RwLock<PugState>,
}

impl PugLobby {
    fn snapshot_of(&self, state: &PugState) -> LobbySnapshot {
        LobbySnapshot {
            lobby_id: self.id.clone(),
            kind: LobbyKind::Pug,
            leader: state.leader.as_ref().map(|c| c.player().clone()),
            clients: state.clients.iter().map(|c| c.player().clone()).collect(),
            messages: state.messages.clone(),
            options: self.options.clone(),
        }
    }
}

impl Lobby for PugLobby {
    fn open(id: LobbyId, creator: &Client, options: LobbyOptions, context: LobbyContext) -> Self {
        creator.attach_lobby(id.clone());
        Self {
            id,
            options,
            context,
            state: RwLock::new(PugState {
                leader: Some(creator.clone()),
                clients: vec![creator.clone()],
                messages: Vec::new(),
                closed: false,
            }),
        }
    }

    fn kind(&self) -> LobbyKind {
        LobbyKind::Pug
    }

    fn id(&self) -> &LobbyId {
        &self.id
    }

    async fn client_count(&self) -> usize {
        self.state.read().await.clients.len()
    }

    async fn is_member(&self, client: &Client) -> bool {
        self.state.read().await.contains(client)
    }

    async fn leader(&self) -> Option<Player> {
        self.state
            .read()
            .await
            .leader
            .as_ref()
            .map(|c| c.player().clone())
    }

    async fn join(&self, client: &Client) -> Result<JoinOutcome, LobbyError> {
        let mut state = self.state.write().await;
        if state.closed {
            return Err(LobbyError::InvalidLobbyId(self.id.clone()));
        }
        if state.contains(client) {
            return Err(LobbyError::DuplicateClient(client.id(), self.id.clone()));
        }

        state.clients.push(client.clone());
        client.attach_lobby(self.id.clone());
        let first = state.clients.len() == 1;
        tracing::info!(
            lobby_id = %self.id,
            player_id = %client.id(),
            clients = state.clients.len(),
            leader = first,
            "player joined lobby"
        );

        if first {
            state.leader = Some(client.clone());
            return Ok(JoinOutcome::Leader(self.snapshot_of(&state)));
        }

        // Non-blocking enqueue, so sending under the write lock is safe.
        let lobby = self.snapshot_of(&state);
        client.send(ServerMessage::LobbyJoined(LobbyResponse { lobby }));
        Ok(JoinOutcome::Member)
    }

    async fn leave(&self, client: &Client) -> Result<(), LobbyError> {
        // Phase 1: membership check and recipient list, shared lock.
        let recipients = {
            let state = self.state.read().await;
            if !state.contains(client) {
                return Err(LobbyError::UnknownClient(client.id(), self.id.clone()));
            }
            state.clients.clone()
        };

        // Phase 2: notify with no lock held.
        let notice = ServerMessage::LobbyLeft(LeaveLobbyResponse {
            lobby_id: self.id.clone(),
            steam_id: client.id(),
        });
        for member in &recipients {
            member.send(notice.clone());
        }

        // Phase 3: mutate under the exclusive lock. Membership is checked
        // again because another task may have removed the client meanwhile.
        let mut state = self.state.write().await;
        let Some(pos) = state.clients.iter().position(|c| c == client) else {
            return Err(LobbyError::UnknownClient(client.id(), self.id.clone()));
        };
        state.clients.remove(pos);
        client.detach_lobby(&self.id);

        if state.leader.as_ref() == Some(client) {
            state.leader = match self.context.leader_failover {
                LeaderFailover::PromoteOldest => state.clients.first().cloned(),
                LeaderFailover::Vacate => None,
            };
            if let Some(next) = &state.leader {
                tracing::info!(lobby_id = %self.id, player_id = %next.id(), "leader promoted");
            }
        }

        tracing::info!(
            lobby_id = %self.id,
            player_id = %client.id(),
            clients = state.clients.len(),
            "player left lobby"
        );
        Ok(())
    }

    async fn promote(&self, client: &Client) {
        let mut state = self.state.write().await;
        state.leader = Some(client.clone());
        tracing::info!(lobby_id = %self.id, player_id = %client.id(), "leader promoted");
    }

    async fn post_message(&self, client: &Client, text: String) -> Result<UserMessage, LobbyError> {
        let mut state = self.state.write().await;
        if !state.contains(client) {
            return Err(LobbyError::UnknownClient(client.id(), self.id.clone()));
        }

        let entry = UserMessage {
            author: client.player().clone(),
            message: text,
            created_at: self.context.clock.now(),
        };
        state.messages.push(entry.clone());

        let msg = ServerMessage::UserMessage(entry.clone());
        for member in &state.clients {
            member.send(msg.clone());
        }
        tracing::debug!(
            lobby_id = %self.id,
            player_id = %client.id(),
            history = state.messages.len(),
            "chat message posted"
        );
        Ok(entry)
    }

    async fn snapshot(&self) -> LobbySnapshot {
        let state = self.state.read().await;
        self.snapshot_of(&state)
    }

    async fn summary(&self) -> LobbySummary {
        let state = self.state.read().await;
        LobbySummary {
            lobby_id: self.id.clone(),
            kind: LobbyKind::Pug,
            leader: state.leader.as_ref().map(|c| c.player().clone()),
            client_count: state.clients.len(),
            options: self.options.clone(),
        }
    }

    async fn close_if_empty(&self) -> bool {
        let mut state = self.state.write().await;
        if state.clients.is_empty() {
            state.closed = true;
        }
        state.closed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::DateTime;
    use puglobby_protocol::{PlayerId, ServerMessage};
    use puglobby_session::OutboundQueue;

    use super::*;
    use crate::FixedClock;

    fn client(id: u64) -> (Client, OutboundQueue) {
        Client::new(Player::new(PlayerId(id), format!("p{id}")), 32)
    }

    fn context(failover: LeaderFailover) -> LobbyContext {
        LobbyContext {
            clock: Arc::new(FixedClock(DateTime::from_timestamp(1_700_000_000, 0).unwrap())),
            leader_failover: failover,
        }
    }

    fn open(creator: &Client, failover: LeaderFailover) -> PugLobby {
        PugLobby::open(LobbyId::new("L1"), creator, LobbyOptions::default(), context(failover))
    }

    fn drain(rx: &mut OutboundQueue) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn test_open_makes_creator_sole_member_and_leader() {
        let (a, _ra) = client(1);
        let lobby = open(&a, LeaderFailover::PromoteOldest);

        assert_eq!(lobby.client_count().await, 1);
        assert_eq!(lobby.leader().await, Some(a.player().clone()));
        assert!(a.in_lobby(lobby.id()));
    }

    #[tokio::test]
    async fn test_join_sends_snapshot_to_joiner_only() {
        let (a, mut ra) = client(1);
        let (b, mut rb) = client(2);
        let lobby = open(&a, LeaderFailover::PromoteOldest);

        assert_eq!(lobby.join(&b).await.unwrap(), JoinOutcome::Member);

        let to_b = drain(&mut rb);
        assert_eq!(to_b.len(), 1);
        match &to_b[0] {
            ServerMessage::LobbyJoined(resp) => {
                assert_eq!(resp.lobby.clients.len(), 2);
                assert_eq!(resp.lobby.leader, Some(a.player().clone()));
            }
            other => panic!("expected LobbyJoined, got {other:?}"),
        }
        assert!(drain(&mut ra).is_empty(), "existing members are not notified");
        assert!(b.in_lobby(lobby.id()));
    }

    #[tokio::test]
    async fn test_join_into_emptied_lobby_returns_leader_snapshot() {
        let (a, _ra) = client(1);
        let (b, mut rb) = client(2);
        let lobby = open(&a, LeaderFailover::PromoteOldest);
        lobby.leave(&a).await.unwrap();

        let outcome = lobby.join(&b).await.unwrap();

        match outcome {
            JoinOutcome::Leader(snapshot) => {
                assert_eq!(snapshot.clients, vec![b.player().clone()]);
                assert_eq!(snapshot.leader, Some(b.player().clone()));
            }
            other => panic!("expected Leader, got {other:?}"),
        }
        assert!(drain(&mut rb).is_empty(), "a new leader is sent nothing");
    }

    #[tokio::test]
    async fn test_join_duplicate_leaves_state_unchanged() {
        let (a, _ra) = client(1);
        let lobby = open(&a, LeaderFailover::PromoteOldest);

        let err = lobby.join(&a).await.unwrap_err();

        assert!(matches!(err, LobbyError::DuplicateClient(..)));
        assert_eq!(lobby.client_count().await, 1);
        assert_eq!(a.lobbies(), vec![LobbyId::new("L1")]);
    }

    #[tokio::test]
    async fn test_leave_broadcasts_to_everyone_including_leaver() {
        let (a, mut ra) = client(1);
        let (b, mut rb) = client(2);
        let lobby = open(&a, LeaderFailover::PromoteOldest);
        lobby.join(&b).await.unwrap();
        drain(&mut rb);

        lobby.leave(&b).await.unwrap();

        let expected = ServerMessage::LobbyLeft(LeaveLobbyResponse {
            lobby_id: LobbyId::new("L1"),
            steam_id: PlayerId(2),
        });
        assert_eq!(drain(&mut ra), vec![expected.clone()]);
        assert_eq!(drain(&mut rb), vec![expected]);
        assert_eq!(lobby.client_count().await, 1);
        assert!(!b.in_lobby(lobby.id()));
    }

    #[tokio::test]
    async fn test_leave_non_member_is_unknown_client() {
        let (a, _ra) = client(1);
        let (c, mut rc) = client(3);
        let lobby = open(&a, LeaderFailover::PromoteOldest);

        let err = lobby.leave(&c).await.unwrap_err();

        assert!(matches!(err, LobbyError::UnknownClient(..)));
        assert_eq!(lobby.client_count().await, 1);
        assert!(drain(&mut rc).is_empty());
    }

    #[tokio::test]
    async fn test_leader_leaving_promotes_oldest_remaining() {
        let (a, _ra) = client(1);
        let (b, _rb) = client(2);
        let (c, _rc) = client(3);
        let lobby = open(&a, LeaderFailover::PromoteOldest);
        lobby.join(&b).await.unwrap();
        lobby.join(&c).await.unwrap();

        lobby.leave(&a).await.unwrap();

        assert_eq!(lobby.leader().await, Some(b.player().clone()));
    }

    #[tokio::test]
    async fn test_leader_leaving_with_vacate_policy_clears_leader() {
        let (a, _ra) = client(1);
        let (b, _rb) = client(2);
        let lobby = open(&a, LeaderFailover::Vacate);
        lobby.join(&b).await.unwrap();

        lobby.leave(&a).await.unwrap();
        assert_eq!(lobby.leader().await, None);

        lobby.promote(&b).await;
        assert_eq!(lobby.leader().await, Some(b.player().clone()));
    }

    #[tokio::test]
    async fn test_last_member_leaving_clears_leader() {
        let (a, _ra) = client(1);
        let lobby = open(&a, LeaderFailover::PromoteOldest);

        lobby.leave(&a).await.unwrap();

        assert_eq!(lobby.client_count().await, 0);
        assert_eq!(lobby.leader().await, None);
    }

    #[tokio::test]
    async fn test_post_message_is_stamped_and_broadcast_to_all() {
        let (a, mut ra) = client(1);
        let (b, mut rb) = client(2);
        let lobby = open(&a, LeaderFailover::PromoteOldest);
        lobby.join(&b).await.unwrap();
        drain(&mut rb);

        let entry = lobby.post_message(&a, "add me to blu".into()).await.unwrap();

        assert_eq!(entry.created_at, DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        assert_eq!(entry.author, a.player().clone());
        let expected = ServerMessage::UserMessage(entry.clone());
        assert_eq!(drain(&mut ra), vec![expected.clone()]);
        assert_eq!(drain(&mut rb), vec![expected]);
        assert_eq!(lobby.snapshot().await.messages, vec![entry]);
    }

    #[tokio::test]
    async fn test_post_message_from_non_member_is_rejected() {
        let (a, _ra) = client(1);
        let (c, _rc) = client(3);
        let lobby = open(&a, LeaderFailover::PromoteOldest);

        let err = lobby.post_message(&c, "hi".into()).await.unwrap_err();

        assert!(matches!(err, LobbyError::UnknownClient(..)));
        assert!(lobby.snapshot().await.messages.is_empty());
    }

    #[tokio::test]
    async fn test_closed_lobby_rejects_join() {
        let (a, _ra) = client(1);
        let (b, _rb) = client(2);
        let lobby = open(&a, LeaderFailover::PromoteOldest);

        assert!(!lobby.close_if_empty().await, "non-empty lobby stays open");
        lobby.leave(&a).await.unwrap();
        assert!(lobby.close_if_empty().await);

        let err = lobby.join(&b).await.unwrap_err();
        assert!(matches!(err, LobbyError::InvalidLobbyId(_)));
        assert!(!b.in_lobby(lobby.id()));
    }

    #[tokio::test]
    async fn test_summary_reflects_roster() {
        let (a, _ra) = client(1);
        let (b, _rb) = client(2);
        let lobby = open(&a, LeaderFailover::PromoteOldest);
        lobby.join(&b).await.unwrap();

        let summary = lobby.summary().await;

        assert_eq!(summary.lobby_id, LobbyId::new("L1"));
        assert_eq!(summary.kind, LobbyKind::Pug);
        assert_eq!(summary.client_count, 2);
        assert_eq!(summary.leader, Some(a.player().clone()));
    }
}
