//! # puglobby
//!
//! WebSocket server for pick-up-game ("pug") lobbies.
//!
//! Players connect, authenticate with a token, and then create, join,
//! leave, list, and chat in lobbies. Everything is in memory; lobbies live
//! for as long as they have members.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use puglobby::prelude::*;
//!
//! /// Trusts `"<steam id>:<name>"` tokens. Development only.
//! struct DevAuth;
//!
//! impl Authenticator for DevAuth {
//!     async fn authenticate(&self, token: &str) -> Result<Player, SessionError> {
//!         let (id, name) = token
//!             .split_once(':')
//!             .ok_or_else(|| SessionError::AuthFailed("expected id:name".into()))?;
//!         let id = id
//!             .parse()
//!             .map_err(|_| SessionError::AuthFailed("bad steam id".into()))?;
//!         Ok(Player::new(PlayerId(id), name))
//!     }
//! }
//!
//! # async fn run() -> Result<(), PugError> {
//! let server = PugServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(DevAuth)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod dispatch;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use dispatch::{
    Dispatcher, create_lobby, join_lobby, leave_lobby, list_lobbies, post_user_message,
};
pub use error::PugError;
pub use server::{PROTOCOL_VERSION, PugServer, PugServerBuilder};

/// Everything needed to run a server and talk to it.
pub mod prelude {
    pub use crate::{PROTOCOL_VERSION, PugError, PugServer, PugServerBuilder, ServerConfig};
    pub use puglobby_lobby::{
        Clock, ConnectionManager, FixedClock, JoinOutcome, LeaderFailover, Lobby, LobbyConfig,
        LobbyError, PugLobby, SystemClock,
    };
    pub use puglobby_protocol::{
        ClientRequest, Codec, CreateLobbyRequest, ErrorCode, ErrorResponse, HandshakeRequest,
        HandshakeResponse, JoinLobbyRequest, JsonCodec, LeaveLobbyRequest, LeaveLobbyResponse,
        LobbyId, LobbyKind, LobbyListResponse, LobbyOptions, LobbyResponse, LobbySnapshot,
        LobbySummary, MessageType, Player, PlayerId, PostUserMessageRequest, RequestEnvelope,
        ResponseEnvelope, ServerMessage, UserMessage,
    };
    pub use puglobby_session::{Authenticator, Client, SessionError};
}
