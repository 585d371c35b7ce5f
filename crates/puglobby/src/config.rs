//! Server configuration.

use std::time::Duration;

use puglobby_lobby::LobbyConfig;
use serde::{Deserialize, Serialize};

/// Everything [`PugServerBuilder`](crate::PugServerBuilder) needs to start
/// a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to. Port `0` picks a free one.
    pub bind_addr: String,

    /// How long a new connection has to send its handshake.
    pub handshake_timeout: Duration,

    /// Close a connection after this long without an inbound frame.
    /// `None` keeps idle connections open for as long as the peer does.
    pub idle_timeout: Option<Duration>,

    /// Outbound messages that may wait for one client's socket before
    /// that client is disconnected.
    pub outbound_capacity: usize,

    /// Settings for every lobby the server creates.
    pub lobby: LobbyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: None,
            outbound_capacity: 256,
            lobby: LobbyConfig::default(),
        }
    }
}
