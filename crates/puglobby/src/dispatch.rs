//! Message dispatcher: routes decoded requests to their handlers.
//!
//! Each handler takes the connection manager, the requesting client, and
//! the decoded request body, and returns the messages to send back to
//! that client. Broadcasts to other members happen inside the lobby
//! operations themselves, not here.
//!
//! A handler error never ends the connection. [`Dispatcher::dispatch`]
//! turns it into a failed response for the requester alone.

use std::sync::Arc;

use puglobby_lobby::{ConnectionManager, JoinOutcome, Lobby, LobbyError, PugLobby};
use puglobby_protocol::{
    ClientRequest, Codec, CreateLobbyRequest, ErrorCode, JoinLobbyRequest, LeaveLobbyRequest,
    LobbyId, LobbyListResponse, LobbyResponse, PostUserMessageRequest, RequestEnvelope,
    ServerMessage,
};
use puglobby_session::Client;

/// Routes requests from connected clients to the lobby layer.
pub struct Dispatcher<L: Lobby = PugLobby> {
    manager: Arc<ConnectionManager<L>>,
}

impl<L: Lobby> Dispatcher<L> {
    /// Creates a dispatcher over the given registry.
    pub fn new(manager: Arc<ConnectionManager<L>>) -> Self {
        Self { manager }
    }

    /// The registry this dispatcher routes into.
    pub fn manager(&self) -> &Arc<ConnectionManager<L>> {
        &self.manager
    }

    /// Decodes one raw frame and dispatches it, queueing any responses on
    /// `client`.
    ///
    /// A frame whose envelope can't be read (not an envelope, or an
    /// unknown `type`) is dropped with no response, as is one carrying a
    /// response type. A readable envelope
    /// whose payload doesn't match its type gets a failed response with
    /// [`ErrorCode::DecodeError`].
    pub async fn dispatch_frame<C: Codec>(&self, codec: &C, client: &Client, frame: &[u8]) {
        let envelope: RequestEnvelope = match codec.decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(player_id = %client.id(), error = %e, "dropping unreadable envelope");
                return;
            }
        };

        let msg_type = envelope.msg_type;
        if !msg_type.is_request() {
            tracing::debug!(player_id = %client.id(), ?msg_type, "dropping response-type envelope");
            return;
        }

        let request = match envelope.decode(codec) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(
                    player_id = %client.id(),
                    ?msg_type,
                    error = %e,
                    "failed to decode request payload"
                );
                client.send(ServerMessage::failed(msg_type, ErrorCode::DecodeError, e.to_string()));
                return;
            }
        };

        for msg in self.dispatch(client, request).await {
            client.send(msg);
        }
    }

    /// Runs one decoded request and returns what the requester should
    /// receive.
    pub async fn dispatch(&self, client: &Client, request: ClientRequest) -> Vec<ServerMessage> {
        let request_type = request.message_type();
        tracing::debug!(player_id = %client.id(), ?request_type, "dispatching request");

        let result = match request {
            ClientRequest::Handshake(_) => {
                return vec![ServerMessage::failed(
                    request_type,
                    ErrorCode::AlreadyConnected,
                    "handshake already completed",
                )];
            }
            ClientRequest::CreateLobby(req) => create_lobby(&self.manager, client, req).await,
            ClientRequest::JoinLobby(req) => join_lobby(&self.manager, client, req).await,
            ClientRequest::LeaveLobby(req) => leave_lobby(&self.manager, client, req).await,
            ClientRequest::PostUserMessage(req) => {
                post_user_message(&self.manager, client, req).await
            }
            ClientRequest::ListLobbies => list_lobbies(&self.manager, client).await,
        };

        match result {
            Ok(responses) => responses,
            Err(e) => {
                tracing::debug!(player_id = %client.id(), ?request_type, error = %e, "request rejected");
                vec![ServerMessage::failed(request_type, e.code(), e.to_string())]
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Creates a lobby led by `client` and answers with its snapshot.
pub async fn create_lobby<L: Lobby>(
    manager: &ConnectionManager<L>,
    client: &Client,
    request: CreateLobbyRequest,
) -> Result<Vec<ServerMessage>, LobbyError> {
    let lobby = manager.create_lobby(client, request.options).await;
    let snapshot = lobby.snapshot().await;
    Ok(vec![ServerMessage::LobbyCreated(LobbyResponse { lobby: snapshot })])
}

/// Joins an existing lobby.
///
/// A member joining behind others is sent its snapshot by the lobby, so
/// nothing is returned here. A joiner who lands in an empty lobby becomes
/// leader and is sent nothing by the lobby, so that snapshot is returned
/// instead.
pub async fn join_lobby<L: Lobby>(
    manager: &ConnectionManager<L>,
    client: &Client,
    request: JoinLobbyRequest,
) -> Result<Vec<ServerMessage>, LobbyError> {
    let lobby = manager.find_lobby(&request.lobby_id).await?;
    match lobby.join(client).await? {
        JoinOutcome::Leader(snapshot) => {
            Ok(vec![ServerMessage::LobbyJoined(LobbyResponse { lobby: snapshot })])
        }
        JoinOutcome::Member => Ok(Vec::new()),
    }
}

/// Leaves a lobby and deregisters it if that emptied it.
///
/// The leave notice reaches the requester through the lobby's broadcast.
pub async fn leave_lobby<L: Lobby>(
    manager: &ConnectionManager<L>,
    client: &Client,
    request: LeaveLobbyRequest,
) -> Result<Vec<ServerMessage>, LobbyError> {
    let lobby = resolve_lobby(manager, client, request.lobby_id).await?;
    lobby.leave(client).await?;
    manager.remove_if_empty(&lobby).await;
    Ok(Vec::new())
}

/// Posts a chat line. The author gets it back through the broadcast.
pub async fn post_user_message<L: Lobby>(
    manager: &ConnectionManager<L>,
    client: &Client,
    request: PostUserMessageRequest,
) -> Result<Vec<ServerMessage>, LobbyError> {
    let lobby = resolve_lobby(manager, client, request.lobby_id).await?;
    lobby.post_message(client, request.message).await?;
    Ok(Vec::new())
}

/// Answers with a summary of every populated lobby.
pub async fn list_lobbies<L: Lobby>(
    manager: &ConnectionManager<L>,
    client: &Client,
) -> Result<Vec<ServerMessage>, LobbyError> {
    let lobbies = manager.list_lobbies().await;
    tracing::debug!(player_id = %client.id(), lobbies = lobbies.len(), "listing lobbies");
    Ok(vec![ServerMessage::LobbyList(LobbyListResponse { lobbies })])
}

/// The lobby a request targets: the one it names, or else the client's
/// most recently joined lobby.
async fn resolve_lobby<L: Lobby>(
    manager: &ConnectionManager<L>,
    client: &Client,
    lobby_id: Option<LobbyId>,
) -> Result<Arc<L>, LobbyError> {
    let id = match lobby_id {
        Some(id) => id,
        None => client
            .current_lobby()
            .ok_or(LobbyError::NoCurrentLobby(client.id()))?,
    };
    manager.find_lobby(&id).await
}
