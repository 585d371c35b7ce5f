//! The `Lobby` trait: the capability set every kind of lobby provides.
//!
//! The connection manager and the dispatcher only ever talk to lobbies
//! through this trait, so adding a new kind of lobby means adding a new
//! implementor, not touching either of them.
//!
//! # Locking contract
//!
//! Implementors own their lock; nothing outside the lobby can take it.
//! Queries take it shared. `join`, `promote`, and `post_message` hold it
//! exclusively for the whole operation. `leave` checks membership under
//! the shared lock, broadcasts with no lock held, and only then takes the
//! exclusive lock to mutate the roster.

use std::future::Future;

use puglobby_protocol::{LobbyId, LobbyKind, LobbyOptions, LobbySnapshot, LobbySummary, Player, UserMessage};
use puglobby_session::Client;

use crate::{LobbyContext, LobbyError};

/// What a successful [`Lobby::join`] did, decided under the lobby's lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The roster was empty, so the joiner is now leader. Nothing was
    /// queued to them; the snapshot is taken at the moment of the join.
    Leader(LobbySnapshot),
    /// The joiner was added behind an existing member and has already
    /// been sent its `JoinLobbyResponse`.
    Member,
}

/// A named group of clients with a leader, a chat history, and
/// creation-time options.
///
/// Async methods return `impl Future + Send` (rather than using bare
/// `async fn`) so generic callers can still be spawned onto the Tokio
/// runtime. Implementors may write them as plain `async fn`.
pub trait Lobby: Send + Sync + Sized + 'static {
    /// Builds a lobby whose sole member and leader is `creator`.
    ///
    /// Also records the lobby in `creator`'s lobby set, so membership is
    /// bidirectional from the first moment the lobby exists.
    fn open(id: LobbyId, creator: &Client, options: LobbyOptions, context: LobbyContext) -> Self;

    /// Which kind of lobby this is.
    fn kind(&self) -> LobbyKind;

    /// The lobby's identifier. Fixed at creation.
    fn id(&self) -> &LobbyId;

    /// Number of members right now.
    fn client_count(&self) -> impl Future<Output = usize> + Send;

    /// Returns `true` if `client` is on the roster.
    fn is_member(&self, client: &Client) -> impl Future<Output = bool> + Send;

    /// The current leader, if any.
    fn leader(&self) -> impl Future<Output = Option<Player>> + Send;

    /// Adds `client` to the roster.
    ///
    /// The first member becomes leader and gets the snapshot back as
    /// [`JoinOutcome::Leader`]. Any later member is sent a
    /// `JoinLobbyResponse` with the full snapshot; existing members are
    /// not told.
    ///
    /// # Errors
    /// - [`LobbyError::DuplicateClient`] if `client` is already a member.
    /// - [`LobbyError::InvalidLobbyId`] if the lobby has been closed.
    fn join(&self, client: &Client) -> impl Future<Output = Result<JoinOutcome, LobbyError>> + Send;

    /// Removes `client`, first broadcasting a `LeaveLobbyResponse` to every
    /// member including `client`.
    ///
    /// The lobby never deregisters itself; a caller that sees the roster
    /// reach zero must ask the connection manager to remove it.
    ///
    /// # Errors
    /// [`LobbyError::UnknownClient`] if `client` is not a member.
    fn leave(&self, client: &Client) -> impl Future<Output = Result<(), LobbyError>> + Send;

    /// Makes `client` the leader. Does not check membership.
    fn promote(&self, client: &Client) -> impl Future<Output = ()> + Send;

    /// Appends a chat entry stamped by the shared clock and broadcasts it
    /// to every member including the author.
    ///
    /// # Errors
    /// [`LobbyError::UnknownClient`] if `client` is not a member.
    fn post_message(
        &self,
        client: &Client,
        text: String,
    ) -> impl Future<Output = Result<UserMessage, LobbyError>> + Send;

    /// Full view: roster, leader, history, options.
    fn snapshot(&self) -> impl Future<Output = LobbySnapshot> + Send;

    /// Public view for discovery listings.
    fn summary(&self) -> impl Future<Output = LobbySummary> + Send;

    /// Closes the lobby if its roster is empty and reports whether it did.
    ///
    /// A closed lobby rejects every later join, so once this returns
    /// `true` the lobby can be deregistered without racing a joiner.
    fn close_if_empty(&self) -> impl Future<Output = bool> + Send;
}
