//! Error types for the transport layer.

/// Everything that can go wrong below the frame level.
///
/// Only [`ConnectionClosed`](Self::ConnectionClosed) is routine; the rest
/// mean a socket is unusable and the connection task should end.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The TCP accept itself failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// A TCP connection arrived but the WebSocket upgrade failed.
    #[cfg(feature = "websocket")]
    #[error("websocket upgrade failed: {0}")]
    Upgrade(#[source] tokio_tungstenite::tungstenite::Error),

    /// Reading or writing an established WebSocket failed.
    #[cfg(feature = "websocket")]
    #[error("websocket error: {0}")]
    WebSocket(#[source] tokio_tungstenite::tungstenite::Error),

    /// The peer is gone, or the connection was closed locally.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),
}
