//! The connected-client handle.
//!
//! A [`Client`] is what a lobby holds for each member. It carries:
//! - WHO the player is ([`Player`])
//! - HOW to reach them (a bounded outbound queue)
//! - WHICH lobbies they are in (by [`LobbyId`] only)
//!
//! The lobby side holds `Client` handles, the client side holds lobby ids.
//! Neither side owns the other, so there is no reference cycle to break
//! when a player disconnects; cleanup walks the id list instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use puglobby_protocol::{LobbyId, Player, PlayerId, ServerMessage};
use tokio::sync::{Notify, mpsc};
use tokio::sync::mpsc::error::TrySendError;

/// Receiving end of a client's outbound queue, drained by the
/// connection's writer task.
pub type OutboundQueue = mpsc::Receiver<ServerMessage>;

struct ClientInner {
    player: Player,
    outbound: mpsc::Sender<ServerMessage>,
    /// Lobbies this client belongs to, in join order.
    lobbies: Mutex<Vec<LobbyId>>,
    kicked: AtomicBool,
    kick_signal: Notify,
}

/// Handle to one live connection's player.
///
/// Cheap to clone (an `Arc`). Equality is by Steam ID: the session layer
/// admits at most one connection per player, so the same id means the
/// same client.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client and the receiving end of its outbound queue.
    ///
    /// `capacity` bounds how many messages may wait for the socket. A
    /// client that falls that far behind is kicked rather than allowed to
    /// stall broadcasts (see [`send`](Self::send)).
    pub fn new(player: Player, capacity: usize) -> (Self, OutboundQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let client = Self {
            inner: Arc::new(ClientInner {
                player,
                outbound: tx,
                lobbies: Mutex::new(Vec::new()),
                kicked: AtomicBool::new(false),
                kick_signal: Notify::new(),
            }),
        };
        (client, rx)
    }

    /// The authenticated identity of this client.
    pub fn player(&self) -> &Player {
        &self.inner.player
    }

    /// Shorthand for `self.player().steam_id`.
    pub fn id(&self) -> PlayerId {
        self.inner.player.steam_id
    }

    /// Enqueues a message for this client without waiting.
    ///
    /// Never blocks: lobbies call this while broadcasting, and one slow
    /// socket must not hold up the rest of the roster. If the queue is
    /// full the message is dropped and the client is kicked; if the
    /// connection is already gone the message is silently discarded.
    ///
    /// Returns `true` if the message was queued.
    pub fn send(&self, msg: ServerMessage) -> bool {
        match self.inner.outbound.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(msg)) => {
                tracing::warn!(
                    player_id = %self.id(),
                    msg_type = ?msg.message_type(),
                    "outbound queue full, dropping message and disconnecting"
                );
                self.kick();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Marks the client for disconnection and wakes its connection task.
    pub fn kick(&self) {
        if !self.inner.kicked.swap(true, Ordering::AcqRel) {
            self.inner.kick_signal.notify_one();
        }
    }

    /// Returns `true` once [`kick`](Self::kick) has been called.
    pub fn is_kicked(&self) -> bool {
        self.inner.kicked.load(Ordering::Acquire)
    }

    /// Resolves once the client has been kicked.
    ///
    /// `notify_one` stores a permit when nobody is waiting yet, so a kick
    /// that lands between the flag check and the await is not lost.
    pub async fn kicked(&self) {
        while !self.is_kicked() {
            self.inner.kick_signal.notified().await;
        }
    }

    /// Lobbies this client belongs to, in join order.
    pub fn lobbies(&self) -> Vec<LobbyId> {
        self.lobby_ids().clone()
    }

    /// The most recently joined lobby still held, if any.
    pub fn current_lobby(&self) -> Option<LobbyId> {
        self.lobby_ids().last().cloned()
    }

    /// Returns `true` if `lobby_id` is in this client's lobby set.
    pub fn in_lobby(&self, lobby_id: &LobbyId) -> bool {
        self.lobby_ids().contains(lobby_id)
    }

    /// Records membership of `lobby_id`. Returns `false` if already present.
    ///
    /// Only the lobby layer calls this, while it holds the lobby's
    /// exclusive lock, so the two sides of the membership change together.
    pub fn attach_lobby(&self, lobby_id: LobbyId) -> bool {
        let mut lobbies = self.lobby_ids();
        if lobbies.contains(&lobby_id) {
            return false;
        }
        lobbies.push(lobby_id);
        true
    }

    /// Forgets membership of `lobby_id`. Returns `false` if it wasn't present.
    pub fn detach_lobby(&self, lobby_id: &LobbyId) -> bool {
        let mut lobbies = self.lobby_ids();
        let before = lobbies.len();
        lobbies.retain(|id| id != lobby_id);
        lobbies.len() != before
    }

    // A panic while holding this lock can't leave the Vec half-updated,
    // so a poisoned lock is still safe to use.
    fn lobby_ids(&self) -> MutexGuard<'_, Vec<LobbyId>> {
        self.inner
            .lobbies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Client {}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("player", &self.inner.player)
            .field("lobbies", &*self.lobby_ids())
            .field("kicked", &self.is_kicked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use puglobby_protocol::{LeaveLobbyResponse, LobbyListResponse};

    use super::*;

    fn client(id: u64, capacity: usize) -> (Client, OutboundQueue) {
        Client::new(Player::new(PlayerId(id), format!("player{id}")), capacity)
    }

    fn list_msg() -> ServerMessage {
        ServerMessage::LobbyList(LobbyListResponse::default())
    }

    #[test]
    fn test_send_queues_message() {
        let (c, mut rx) = client(1, 4);
        assert!(c.send(list_msg()));
        assert_eq!(rx.try_recv().unwrap(), list_msg());
    }

    #[test]
    fn test_send_on_full_queue_drops_and_kicks() {
        let (c, mut rx) = client(1, 1);
        assert!(c.send(list_msg()));
        assert!(!c.is_kicked());

        let overflow = ServerMessage::LobbyLeft(LeaveLobbyResponse {
            lobby_id: LobbyId::new("x"),
            steam_id: PlayerId(1),
        });
        assert!(!c.send(overflow));
        assert!(c.is_kicked());

        // Only the first message made it.
        assert_eq!(rx.try_recv().unwrap(), list_msg());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_receiver_dropped_is_discarded_without_kick() {
        let (c, rx) = client(1, 4);
        drop(rx);
        assert!(!c.send(list_msg()));
        assert!(!c.is_kicked());
    }

    #[tokio::test]
    async fn test_kicked_resolves_after_kick_from_other_task() {
        let (c, _rx) = client(1, 4);
        let kicker = c.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            kicker.kick();
        });
        tokio::time::timeout(Duration::from_secs(1), c.kicked())
            .await
            .expect("kicked() should resolve");
    }

    #[tokio::test]
    async fn test_kicked_resolves_when_kick_came_first() {
        let (c, _rx) = client(1, 4);
        c.kick();
        tokio::time::timeout(Duration::from_millis(50), c.kicked())
            .await
            .expect("kick before await must not be lost");
    }

    #[test]
    fn test_lobby_set_attach_detach() {
        let (c, _rx) = client(1, 4);
        let a = LobbyId::new("a");
        let b = LobbyId::new("b");

        assert!(c.attach_lobby(a.clone()));
        assert!(!c.attach_lobby(a.clone()), "no duplicates");
        assert!(c.attach_lobby(b.clone()));
        assert_eq!(c.lobbies(), vec![a.clone(), b.clone()]);
        assert_eq!(c.current_lobby(), Some(b.clone()));

        assert!(c.detach_lobby(&b));
        assert!(!c.detach_lobby(&b));
        assert_eq!(c.current_lobby(), Some(a.clone()));
        assert!(c.in_lobby(&a));
        assert!(!c.in_lobby(&b));
    }

    #[test]
    fn test_clients_compare_by_steam_id() {
        let (a, _ra) = client(1, 4);
        let (a2, _ra2) = client(1, 4);
        let (b, _rb) = client(2, 4);
        assert_eq!(a, a2);
        assert_ne!(a, b);
    }
}
