//! Wire protocol for the pug lobby service.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`Player`], [`LobbyId`], [`LobbySnapshot`], ...): identities
//!   and the read-only views of a lobby that clients receive.
//! - **Messages** ([`RequestEnvelope`], [`ResponseEnvelope`], [`MessageType`],
//!   [`ServerMessage`]): the framed request/response format.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those are converted
//!   to and from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (envelopes) → Dispatcher → Lobby
//! ```
//!
//! The protocol layer knows nothing about connections or lobbies; it only
//! knows how messages look.

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{
    ClientRequest, CreateLobbyRequest, ErrorCode, ErrorResponse, HandshakeRequest,
    HandshakeResponse, JoinLobbyRequest, LeaveLobbyRequest, LeaveLobbyResponse,
    LobbyListResponse, LobbyResponse, MessageType, PostUserMessageRequest, RequestEnvelope,
    ResponseEnvelope, ServerMessage,
};
pub use types::{
    LobbyId, LobbyKind, LobbyOptions, LobbySnapshot, LobbySummary, Player, PlayerId, UserMessage,
};
