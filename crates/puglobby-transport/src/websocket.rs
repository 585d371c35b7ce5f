//! WebSocket transport on top of `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::{Connection, ConnectionId, Transport, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// Listens on a TCP port and upgrades every accepted socket to a
/// WebSocket.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds the listener. Port `0` lets the OS pick; read it back with
    /// [`local_addr`](Self::local_addr).
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "websocket transport listening");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (tcp, peer) = self.listener.accept().await.map_err(TransportError::Accept)?;
        let ws = tokio_tungstenite::accept_async(tcp)
            .await
            .map_err(TransportError::Upgrade)?;

        let id = ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "websocket upgraded");

        // Separate locks per half: a reader parked in `recv` must not
        // block the writer.
        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// An upgraded WebSocket with independently locked read and write halves.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

/// Folds tungstenite's "already closed" errors into `ConnectionClosed`.
fn classify(err: WsError) -> TransportError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            TransportError::ConnectionClosed(err.to_string())
        }
        other => TransportError::WebSocket(other),
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Sends `data` as one binary frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let frame = Message::Binary(data.to_vec().into());
        self.sink.lock().await.send(frame).await.map_err(classify)
    }

    /// Returns the payload of the next binary or text frame.
    ///
    /// Text frames are handed up as their UTF-8 bytes, so browser clients
    /// may send JSON either way. Ping and pong are answered inside
    /// tungstenite and never surface here.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Binary(data)) => return Ok(Some(data.into())),
                Ok(Message::Text(text)) => return Ok(Some(text.as_bytes().to_vec())),
                Ok(Message::Close(_)) => return Ok(None),
                Ok(_) => {}
                Err(WsError::ConnectionClosed) => return Ok(None),
                Err(e) => return Err(classify(e)),
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(classify)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
