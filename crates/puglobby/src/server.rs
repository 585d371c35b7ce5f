//! `PugServer` builder and accept loop.
//!
//! This is the entry point for running a lobby server. It ties together
//! all the layers: transport → protocol → session → lobby.

use std::sync::Arc;
use std::time::Duration;

use puglobby_lobby::{Clock, ConnectionManager, LeaderFailover, LobbyConfig, SystemClock};
use puglobby_protocol::{Codec, JsonCodec};
use puglobby_session::{Authenticator, SessionManager};
use puglobby_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::dispatch::Dispatcher;
use crate::handler::handle_connection;
use crate::{PugError, ServerConfig};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a lobby server.
///
/// # Example
///
/// ```rust,ignore
/// use puglobby::prelude::*;
///
/// let server = PugServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .leader_failover(LeaderFailover::Vacate)
///     .build(my_auth)
///     .await?;
/// server.run().await
/// ```
pub struct PugServerBuilder {
    config: ServerConfig,
    clock: Arc<dyn Clock>,
}

impl PugServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a connection has to complete its handshake.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets (or with `None`, disables) the idle-connection timeout.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Sets each client's outbound queue capacity.
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_capacity = capacity;
        self
    }

    /// Sets the lobby configuration.
    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.config.lobby = config;
        self
    }

    /// Sets what happens to leadership when a leader leaves.
    pub fn leader_failover(mut self, policy: LeaderFailover) -> Self {
        self.config.lobby.leader_failover = policy;
        self
    }

    /// Replaces the clock that stamps chat messages and handshakes.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Binds the listener and builds the server with the given
    /// authenticator.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<A: Authenticator>(self, auth: A) -> Result<PugServer<A, JsonCodec>, PugError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let manager = ConnectionManager::new(self.config.lobby.clone(), Arc::clone(&self.clock));
        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new()),
            dispatcher: Dispatcher::new(Arc::new(manager)),
            auth,
            codec: JsonCodec,
            clock: self.clock,
            config: self.config,
        });

        Ok(PugServer { transport, state })
    }
}

impl Default for PugServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound lobby server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PugServer<A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl<A, C> PugServer<A, C>
where
    A: Authenticator,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The lobby registry, shared with every connection.
    ///
    /// Stays usable after [`run`](Self::run) has taken the server.
    pub fn lobbies(&self) -> Arc<ConnectionManager> {
        Arc::clone(self.state.dispatcher.manager())
    }

    /// Runs the accept loop.
    ///
    /// Each accepted connection gets its own task that performs the
    /// handshake and then serves the player until they disconnect. Runs
    /// until the process is terminated.
    pub async fn run(mut self) -> Result<(), PugError> {
        tracing::info!(addr = %self.state.config.bind_addr, "pug lobby server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
