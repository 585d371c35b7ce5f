//! Core data types shared by the wire format and the lobby layer.
//!
//! Everything in here travels "on the wire": identities, lobby options,
//! chat entries, and the snapshot/summary views of a lobby that clients
//! receive. Nothing here is mutable shared state; the lobby layer builds
//! these views from its own locked state and hands out copies.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's stable external identifier (their 64-bit Steam ID).
///
/// Newtype wrapper so a `PlayerId` can't be passed where some other `u64`
/// is expected. `#[serde(transparent)]` keeps it a plain number on the
/// wire: `PlayerId(76561197960265728)` is `76561197960265728` in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated player as the rest of the lobby sees them.
///
/// Produced by the authenticator at handshake time and attached to the
/// connection for its whole life.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Stable identity; two connections with the same `steam_id` are the
    /// same player.
    pub steam_id: PlayerId,
    /// Display name at the time of authentication.
    pub name: String,
}

impl Player {
    /// Convenience constructor.
    pub fn new(steam_id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            steam_id,
            name: name.into(),
        }
    }
}

/// A unique identifier for a lobby.
///
/// Short random alphanumeric code so players can share it by hand.
/// Generated by the connection manager; the protocol layer only carries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyId(String);

impl LobbyId {
    /// Wraps an existing code.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Lobby views
// ---------------------------------------------------------------------------

/// Which kind of lobby an entry is.
///
/// Only pick-up games exist today; the tag is carried in snapshots and
/// summaries so clients can filter once other kinds appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LobbyKind {
    /// A pick-up game lobby.
    #[default]
    Pug,
}

/// Creation-time lobby configuration. Immutable once the lobby exists.
///
/// Every field defaults, so a client can send `{}` and still get a lobby.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyOptions {
    /// Game format, e.g. `"sixes"` or `"highlander"`.
    pub game_type: String,
    /// Map the lobby intends to play.
    pub map_name: String,
    /// Free-form description shown in the lobby list.
    pub description: String,
    /// Whether members are expected to be on the community Discord.
    pub discord_required: bool,
    /// Name of the game server the lobby will be sent to.
    pub server_name: String,
}

/// One entry in a lobby's chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    /// Who wrote it.
    pub author: Player,
    /// What they wrote.
    pub message: String,
    /// When the lobby accepted it, per the server's shared clock.
    pub created_at: DateTime<Utc>,
}

/// Full view of a lobby, sent to its creator and to each joining client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySnapshot {
    /// The lobby's unique ID.
    pub lobby_id: LobbyId,
    /// Kind tag.
    pub kind: LobbyKind,
    /// Current leader; `None` only if leadership was vacated.
    pub leader: Option<Player>,
    /// Members in join order.
    pub clients: Vec<Player>,
    /// Chat history, oldest first.
    pub messages: Vec<UserMessage>,
    /// Options the lobby was created with.
    pub options: LobbyOptions,
}

/// Public summary of a lobby for discovery listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySummary {
    /// The lobby's unique ID.
    pub lobby_id: LobbyId,
    /// Kind tag.
    pub kind: LobbyKind,
    /// Current leader, if any.
    pub leader: Option<Player>,
    /// Number of members right now.
    pub client_count: usize,
    /// Options the lobby was created with.
    pub options: LobbyOptions,
}
