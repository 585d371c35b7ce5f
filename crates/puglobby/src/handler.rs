//! Per-connection handler: handshake, reader loop, writer task, cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version → authenticate token
//!   2. Register the session and send HandshakeResponse
//!   3. Spawn the writer task that drains the client's outbound queue
//!   4. Loop: receive frames → dispatch, until close, idle, or kick
//!   5. Leave every lobby, drop empty ones, release the session

use std::sync::Arc;
use std::time::Duration;

use puglobby_lobby::Lobby;
use puglobby_protocol::{
    ClientRequest, Codec, ErrorCode, HandshakeResponse, MessageType, Player, ProtocolError,
    RequestEnvelope, ServerMessage,
};
use puglobby_session::{Authenticator, Client, OutboundQueue, SessionError};
use puglobby_transport::{Connection, WebSocketConnection};
use tokio::task::JoinHandle;

use crate::PugError;
use crate::server::{PROTOCOL_VERSION, ServerState};

/// How long the close frame gets to go out once a session has ended.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Drop guard that runs disconnect cleanup if the handler exits early.
///
/// The normal path calls [`finish`](Self::finish) and awaits cleanup
/// directly. If the handler panics or returns through `?` instead, `Drop`
/// spawns the same cleanup as a fire-and-forget task, since `Drop` can't
/// await.
struct SessionGuard<A: Authenticator, C: Codec> {
    inner: Option<(Client, Arc<ServerState<A, C>>)>,
}

impl<A: Authenticator, C: Codec> SessionGuard<A, C> {
    fn new(client: Client, state: Arc<ServerState<A, C>>) -> Self {
        Self {
            inner: Some((client, state)),
        }
    }

    async fn finish(mut self) {
        if let Some((client, state)) = self.inner.take() {
            disconnect(&client, &state).await;
        }
    }
}

impl<A: Authenticator, C: Codec> Drop for SessionGuard<A, C> {
    fn drop(&mut self) {
        if let Some((client, state)) = self.inner.take() {
            tokio::spawn(async move {
                disconnect(&client, &state).await;
            });
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, C>>,
) -> Result<(), PugError>
where
    A: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    tracing::debug!(%conn_id, %peer, "handling new connection");

    // --- Step 1: Handshake ---
    let player = perform_handshake(&conn, &state).await?;
    let player_id = player.steam_id;

    // --- Step 2: Session ---
    // Register and arm the guard together: if registration fails there is
    // nothing to clean up.
    let (client, queue) = Client::new(player.clone(), state.config.outbound_capacity);
    let registered = state.sessions.lock().await.register(client.clone());
    if let Err(e) = registered {
        let reject =
            ServerMessage::failed(MessageType::Handshake, ErrorCode::AlreadyConnected, e.to_string());
        send_direct(&conn, &state.codec, &reject).await?;
        let _ = conn.close().await;
        return Err(e.into());
    }
    let guard = SessionGuard::new(client.clone(), Arc::clone(&state));

    let welcome = ServerMessage::Handshake(HandshakeResponse {
        player,
        server_time: state.clock.now(),
    });
    send_direct(&conn, &state.codec, &welcome).await?;
    tracing::info!(%conn_id, %peer, %player_id, "player connected");

    // --- Step 3: Writer ---
    let conn = Arc::new(conn);
    let writer = spawn_writer(Arc::clone(&conn), Arc::clone(&state), client.clone(), queue);

    // --- Step 4: Reader ---
    loop {
        let frame = tokio::select! {
            _ = client.kicked() => {
                tracing::info!(%player_id, "client kicked");
                break;
            }
            frame = next_frame(&conn, state.config.idle_timeout) => frame,
        };

        match frame {
            Ok(Some(data)) => {
                state
                    .dispatcher
                    .dispatch_frame(&state.codec, &client, &data)
                    .await;
            }
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(reason) => {
                tracing::info!(%player_id, %reason, "connection dropped");
                break;
            }
        }
    }

    // --- Step 5: Cleanup ---
    guard.finish().await;
    writer.abort();
    // A kicked client may have stopped reading, so the close frame can't
    // be allowed to wait on a full socket forever.
    let _ = tokio::time::timeout(CLOSE_GRACE, conn.close()).await;
    Ok(())
}

/// Waits for the next inbound frame, giving up after `idle` if set.
///
/// `Ok(None)` is a clean close; `Err` carries a reason for the log.
async fn next_frame(
    conn: &WebSocketConnection,
    idle: Option<Duration>,
) -> Result<Option<Vec<u8>>, String> {
    let recv = conn.recv();
    let result = match idle {
        Some(limit) => match tokio::time::timeout(limit, recv).await {
            Ok(result) => result,
            Err(_) => return Err("idle timeout".to_string()),
        },
        None => recv.await,
    };
    result.map_err(|e| e.to_string())
}

/// Spawns the task that moves queued messages onto the socket.
///
/// `client` keeps the queue's sender alive, so the task runs until the
/// handler aborts it or a write fails. A failed write kicks the client so
/// the reader loop exits too.
fn spawn_writer<A, C>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<A, C>>,
    client: Client,
    mut queue: OutboundQueue,
) -> JoinHandle<()>
where
    A: Authenticator,
    C: Codec,
{
    let player_id = client.id();
    tokio::spawn(async move {
        while let Some(msg) = queue.recv().await {
            if let Err(e) = send_direct(&conn, &state.codec, &msg).await {
                tracing::debug!(%player_id, error = %e, "write failed");
                client.kick();
                break;
            }
        }
    })
}

/// Encodes one message into a response envelope and sends it straight
/// to the socket, bypassing the outbound queue.
async fn send_direct<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    msg: &ServerMessage,
) -> Result<(), PugError> {
    let envelope = msg.to_envelope(codec)?;
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Performs the handshake: receive Handshake, validate version,
/// authenticate.
///
/// Any failure after the first frame arrives is answered with a failed
/// `HandshakeResponse` before the error is returned.
async fn perform_handshake<A, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, C>>,
) -> Result<Player, PugError>
where
    A: Authenticator,
    C: Codec,
{
    let data = match tokio::time::timeout(state.config.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(PugError::Handshake("connection closed before handshake".into()));
        }
        Ok(Err(e)) => return Err(PugError::Transport(e)),
        Err(_) => return Err(PugError::Handshake("handshake timed out".into())),
    };

    let request = state
        .codec
        .decode::<RequestEnvelope>(&data)
        .and_then(|envelope| envelope.decode(&state.codec));

    let handshake = match request {
        Ok(ClientRequest::Handshake(handshake)) => handshake,
        Ok(other) => {
            reject_handshake(conn, state, ErrorCode::Unauthorized, "expected Handshake").await?;
            return Err(ProtocolError::UnexpectedMessageType(other.message_type()).into());
        }
        Err(e) => {
            reject_handshake(conn, state, ErrorCode::DecodeError, &e.to_string()).await?;
            return Err(e.into());
        }
    };

    if handshake.version != PROTOCOL_VERSION {
        let reason = format!(
            "version mismatch: expected {PROTOCOL_VERSION}, got {}",
            handshake.version
        );
        reject_handshake(conn, state, ErrorCode::VersionMismatch, &reason).await?;
        return Err(PugError::Handshake(reason));
    }

    let token = handshake.token.as_deref().unwrap_or("");
    match state.auth.authenticate(token).await {
        Ok(player) => Ok(player),
        Err(e) => {
            reject_handshake(conn, state, ErrorCode::Unauthorized, "unauthorized").await?;
            Err(PugError::Session(e))
        }
    }
}

/// Sends a failed `HandshakeResponse` and closes the socket.
async fn reject_handshake<A, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, C>>,
    code: ErrorCode,
    message: &str,
) -> Result<(), PugError>
where
    A: Authenticator,
    C: Codec,
{
    let msg = ServerMessage::failed(MessageType::Handshake, code, message);
    send_direct(conn, &state.codec, &msg).await?;
    let _ = conn.close().await;
    Ok(())
}

/// Removes a departing client from every lobby it is in, deregisters any
/// lobby that leaves empty, then releases the session.
async fn disconnect<A, C>(client: &Client, state: &ServerState<A, C>)
where
    A: Authenticator,
    C: Codec,
{
    let player_id = client.id();
    let manager = state.dispatcher.manager();

    for lobby_id in client.lobbies() {
        let lobby = match manager.find_lobby(&lobby_id).await {
            Ok(lobby) => lobby,
            Err(_) => {
                // Already deregistered; just drop our side of the link.
                client.detach_lobby(&lobby_id);
                continue;
            }
        };
        if let Err(e) = lobby.leave(client).await {
            tracing::debug!(%player_id, %lobby_id, error = %e, "leave on disconnect failed");
        }
        manager.remove_if_empty(&lobby).await;
    }

    match state.sessions.lock().await.release(player_id) {
        Ok(_) => tracing::info!(%player_id, "player disconnected"),
        Err(SessionError::NotFound(_)) => {}
        Err(e) => tracing::warn!(%player_id, error = %e, "session release failed"),
    }
}
