//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A
//! `ProtocolError` always means the bytes on the wire were the problem,
//! never the lobby state behind them.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed bytes, missing fields, or a
    /// payload that does not match the shape its `type` promises.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope's integer discriminator is not a known message type.
    #[error("unknown message type {0}")]
    UnknownMessageType(u16),

    /// A known message type arrived in the wrong direction or at the
    /// wrong time (a response type sent by a client, a second handshake).
    #[error("unexpected message type {0:?}")]
    UnexpectedMessageType(crate::MessageType),
}
