//! Lobby configuration and leader failover policy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Clock;

// ---------------------------------------------------------------------------
// LeaderFailover
// ---------------------------------------------------------------------------

/// What happens to leadership when the leader leaves a lobby that still
/// has members.
///
/// Applied inside `leave`'s exclusive section, so no other operation ever
/// observes a leader who is no longer on the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderFailover {
    /// The longest-standing remaining member becomes leader. Keeps
    /// "exactly one leader while anyone is present" true at all times.
    #[default]
    PromoteOldest,

    /// Leadership is left empty until someone calls `promote`.
    Vacate,
}

impl std::str::FromStr for LeaderFailover {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "promote" | "promote_oldest" => Ok(Self::PromoteOldest),
            "vacate" => Ok(Self::Vacate),
            other => Err(format!("unknown leader failover policy {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// LobbyConfig
// ---------------------------------------------------------------------------

/// Settings applied to every lobby a connection manager creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Leader succession policy.
    pub leader_failover: LeaderFailover,

    /// Length of generated lobby codes.
    pub id_length: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            leader_failover: LeaderFailover::PromoteOldest,
            id_length: 6,
        }
    }
}

/// Per-lobby collaborators handed over at creation time.
#[derive(Clone)]
pub struct LobbyContext {
    /// Shared clock for chat timestamps.
    pub clock: Arc<dyn Clock>,
    /// Leader succession policy.
    pub leader_failover: LeaderFailover,
}
