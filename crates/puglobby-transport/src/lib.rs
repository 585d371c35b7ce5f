//! Socket layer for the pug lobby service.
//!
//! The server loop only sees the [`Transport`] and [`Connection`] traits:
//! something that hands out connections, and connections that move whole
//! frames of bytes. Upgrading a TCP stream to a WebSocket, answering
//! pings, and unwrapping text frames all happen in here.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`] via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Process-unique connection number, for logs.
///
/// Lets the frames of one socket be followed before the handshake has
/// said which player is on the other end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of new connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer and returns its connection, already
    /// upgraded and ready for frames.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// One peer, exchanging whole frames.
///
/// `send` and `recv` must be callable at the same time from different
/// tasks. The server parks one task in `recv` for the life of the
/// connection while a writer task pushes the player's outbound queue
/// through `send`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next data frame. `Ok(None)` means the peer closed the
    /// connection cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Starts a clean close from our side.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// Remote address, as seen at accept time.
    fn peer_addr(&self) -> SocketAddr;
}
