//! Error types for the session layer.

use puglobby_protocol::PlayerId;

/// Errors that can occur while admitting or tracking a player.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Authentication failed: the token was missing, invalid, or rejected
    /// by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No live session exists for the given player.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// The player already has a live connection.
    /// A player can only hold one connection at a time.
    #[error("player {0} already has an active session")]
    AlreadyConnected(PlayerId),
}
