//! Error types for the lobby layer.

use puglobby_protocol::{ErrorCode, LobbyId, PlayerId};

/// Errors that lobby and connection-manager operations return.
///
/// None of these are fatal to a connection: the dispatcher turns each
/// into a failed response for the requesting client only. State is
/// unchanged whenever one is returned.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// Join attempted by a client that is already a member.
    #[error("player {0} already in lobby {1}")]
    DuplicateClient(PlayerId, LobbyId),

    /// Operation attempted by a client that is not a member.
    #[error("player {0} not in lobby {1}")]
    UnknownClient(PlayerId, LobbyId),

    /// No lobby is registered under this id (or it is being torn down).
    #[error("invalid lobby id {0}")]
    InvalidLobbyId(LobbyId),

    /// The request named no lobby and the client is in none.
    #[error("player {0} is not in any lobby")]
    NoCurrentLobby(PlayerId),
}

impl LobbyError {
    /// The wire error code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateClient(..) => ErrorCode::DuplicateClient,
            Self::UnknownClient(..) => ErrorCode::UnknownClient,
            Self::InvalidLobbyId(_) | Self::NoCurrentLobby(_) => ErrorCode::InvalidLobbyId,
        }
    }
}
