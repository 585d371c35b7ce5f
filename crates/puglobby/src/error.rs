//! Unified error type for the pug lobby server.

use puglobby_protocol::ProtocolError;
use puglobby_session::SessionError;
use puglobby_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// Callers of the `puglobby` facade deal with this one type instead of
/// importing errors from each sub-crate. `#[from]` on each variant lets
/// `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PugError {
    /// Binding, accepting, or talking to a socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Authentication or session admission failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The client broke the handshake rules (wrong first message,
    /// wrong version, or nothing before the deadline).
    #[error("handshake failed: {0}")]
    Handshake(String),
}
