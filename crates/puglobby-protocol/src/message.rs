//! Envelopes, message-type discriminators, and request/response bodies.
//!
//! Every frame on the wire is an envelope. A request envelope pairs an
//! integer `type` with an opaque payload:
//!
//! ```text
//! { "type": 11, "payload": <codec bytes of JoinLobbyRequest> }
//! ```
//!
//! A response envelope adds a `status` flag, so one channel carries both
//! acknowledgments and domain errors:
//!
//! ```text
//! { "type": 111, "status": false, "payload": <codec bytes of ErrorResponse> }
//! ```
//!
//! The payload is decoded only after the `type` has been read, which is
//! what lets a malformed payload be reported against the right message
//! type instead of failing the whole frame.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Codec, LobbyId, LobbyOptions, LobbySnapshot, LobbySummary, Player, PlayerId, ProtocolError,
    UserMessage,
};

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// Integer discriminator carried in every envelope's `type` field.
///
/// Requests live below 100; each request's response is the same number
/// plus 100. `#[serde(try_from/into = "u16")]` keeps the wire value a bare
/// integer and rejects numbers that aren't listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum MessageType {
    // -- Requests (client → server) --
    Handshake,
    CreateLobby,
    JoinLobby,
    LeaveLobby,
    PostUserMessage,
    ListLobbies,

    // -- Responses (server → client) --
    HandshakeResponse,
    CreateLobbyResponse,
    JoinLobbyResponse,
    LeaveLobbyResponse,
    UserMessageResponse,
    LobbyListStatesResponse,
}

impl MessageType {
    /// The wire value of this discriminator.
    pub fn code(self) -> u16 {
        match self {
            Self::Handshake => 1,
            Self::CreateLobby => 10,
            Self::JoinLobby => 11,
            Self::LeaveLobby => 12,
            Self::PostUserMessage => 13,
            Self::ListLobbies => 14,
            Self::HandshakeResponse => 101,
            Self::CreateLobbyResponse => 110,
            Self::JoinLobbyResponse => 111,
            Self::LeaveLobbyResponse => 112,
            Self::UserMessageResponse => 113,
            Self::LobbyListStatesResponse => 114,
        }
    }

    /// Returns `true` for types a client may send.
    pub fn is_request(self) -> bool {
        self.code() < 100
    }

    /// The response type that answers this request type.
    ///
    /// Responses map to themselves, so this is total.
    pub fn response_type(self) -> Self {
        match self {
            Self::Handshake => Self::HandshakeResponse,
            Self::CreateLobby => Self::CreateLobbyResponse,
            Self::JoinLobby => Self::JoinLobbyResponse,
            Self::LeaveLobby => Self::LeaveLobbyResponse,
            Self::PostUserMessage => Self::UserMessageResponse,
            Self::ListLobbies => Self::LobbyListStatesResponse,
            response => response,
        }
    }
}

impl From<MessageType> for u16 {
    fn from(value: MessageType) -> Self {
        value.code()
    }
}

impl TryFrom<u16> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::Handshake,
            10 => Self::CreateLobby,
            11 => Self::JoinLobby,
            12 => Self::LeaveLobby,
            13 => Self::PostUserMessage,
            14 => Self::ListLobbies,
            101 => Self::HandshakeResponse,
            110 => Self::CreateLobbyResponse,
            111 => Self::JoinLobbyResponse,
            112 => Self::LeaveLobbyResponse,
            113 => Self::UserMessageResponse,
            114 => Self::LobbyListStatesResponse,
            other => return Err(ProtocolError::UnknownMessageType(other)),
        })
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// First frame of every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Protocol version the client speaks.
    pub version: u32,
    /// Credential handed to the authenticator.
    pub token: Option<String>,
}

/// Create a lobby with the given options; the sender becomes its leader.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateLobbyRequest {
    #[serde(default)]
    pub options: LobbyOptions,
}

/// Join an existing lobby by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinLobbyRequest {
    pub lobby_id: LobbyId,
}

/// Leave a lobby. Without `lobby_id`, the most recently joined one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeaveLobbyRequest {
    #[serde(default)]
    pub lobby_id: Option<LobbyId>,
}

/// Post a chat line. Without `lobby_id`, to the most recently joined lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostUserMessageRequest {
    pub message: String,
    #[serde(default)]
    pub lobby_id: Option<LobbyId>,
}

/// A request after its payload has been decoded according to its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    Handshake(HandshakeRequest),
    CreateLobby(CreateLobbyRequest),
    JoinLobby(JoinLobbyRequest),
    LeaveLobby(LeaveLobbyRequest),
    PostUserMessage(PostUserMessageRequest),
    ListLobbies,
}

impl ClientRequest {
    /// The discriminator this request travels under.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Handshake(_) => MessageType::Handshake,
            Self::CreateLobby(_) => MessageType::CreateLobby,
            Self::JoinLobby(_) => MessageType::JoinLobby,
            Self::LeaveLobby(_) => MessageType::LeaveLobby,
            Self::PostUserMessage(_) => MessageType::PostUserMessage,
            Self::ListLobbies => MessageType::ListLobbies,
        }
    }
}

/// A request frame as it sits on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    /// Codec-encoded request body. `ListLobbies` sends none.
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl RequestEnvelope {
    /// Wraps a request, encoding its body with `codec`.
    pub fn encode<C: Codec>(request: &ClientRequest, codec: &C) -> Result<Self, ProtocolError> {
        let payload = match request {
            ClientRequest::Handshake(body) => codec.encode(body)?,
            ClientRequest::CreateLobby(body) => codec.encode(body)?,
            ClientRequest::JoinLobby(body) => codec.encode(body)?,
            ClientRequest::LeaveLobby(body) => codec.encode(body)?,
            ClientRequest::PostUserMessage(body) => codec.encode(body)?,
            ClientRequest::ListLobbies => Vec::new(),
        };
        Ok(Self {
            msg_type: request.message_type(),
            payload,
        })
    }

    /// Decodes the payload according to `msg_type`.
    ///
    /// # Errors
    /// - `ProtocolError::Decode` if the payload doesn't match the type.
    /// - `ProtocolError::UnexpectedMessageType` for response types.
    pub fn decode<C: Codec>(&self, codec: &C) -> Result<ClientRequest, ProtocolError> {
        let data = &self.payload;
        Ok(match self.msg_type {
            MessageType::Handshake => ClientRequest::Handshake(codec.decode(data)?),
            MessageType::CreateLobby => ClientRequest::CreateLobby(codec.decode(data)?),
            MessageType::JoinLobby => ClientRequest::JoinLobby(codec.decode(data)?),
            MessageType::LeaveLobby => ClientRequest::LeaveLobby(codec.decode(data)?),
            MessageType::PostUserMessage => ClientRequest::PostUserMessage(codec.decode(data)?),
            MessageType::ListLobbies => ClientRequest::ListLobbies,
            other => return Err(ProtocolError::UnexpectedMessageType(other)),
        })
    }
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Successful handshake: who the server thinks you are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub player: Player,
    pub server_time: DateTime<Utc>,
}

/// Body of both `CreateLobbyResponse` and `JoinLobbyResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyResponse {
    pub lobby: LobbySnapshot,
}

/// Broadcast to every member when someone leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveLobbyResponse {
    pub lobby_id: LobbyId,
    pub steam_id: PlayerId,
}

/// Answer to `ListLobbies`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LobbyListResponse {
    pub lobbies: Vec<LobbySummary>,
}

/// Machine-readable reason carried by every failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Join attempted by a client that is already a member.
    DuplicateClient,
    /// Operation attempted by a client that is not a member.
    UnknownClient,
    /// No lobby is registered under the given id.
    InvalidLobbyId,
    /// The request payload could not be decoded.
    DecodeError,
    /// Handshake credential rejected.
    Unauthorized,
    /// Handshake protocol version not supported.
    VersionMismatch,
    /// The player already has a live connection.
    AlreadyConnected,
}

/// Payload of a response whose `status` is `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    pub message: String,
}

/// Everything the server can push into a client's outbound queue.
///
/// The lobby layer produces these without knowing the codec; the
/// connection's writer turns each one into a [`ResponseEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Handshake(HandshakeResponse),
    LobbyCreated(LobbyResponse),
    LobbyJoined(LobbyResponse),
    LobbyLeft(LeaveLobbyResponse),
    UserMessage(UserMessage),
    LobbyList(LobbyListResponse),
    /// A failed answer to a request of type `request`.
    Failed {
        request: MessageType,
        error: ErrorResponse,
    },
}

impl ServerMessage {
    /// Builds a failed response for a request of the given type.
    pub fn failed(request: MessageType, error: ErrorCode, message: impl Into<String>) -> Self {
        Self::Failed {
            request,
            error: ErrorResponse {
                error,
                message: message.into(),
            },
        }
    }

    /// The response discriminator this message travels under.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Handshake(_) => MessageType::HandshakeResponse,
            Self::LobbyCreated(_) => MessageType::CreateLobbyResponse,
            Self::LobbyJoined(_) => MessageType::JoinLobbyResponse,
            Self::LobbyLeft(_) => MessageType::LeaveLobbyResponse,
            Self::UserMessage(_) => MessageType::UserMessageResponse,
            Self::LobbyList(_) => MessageType::LobbyListStatesResponse,
            Self::Failed { request, .. } => request.response_type(),
        }
    }

    /// `false` only for [`ServerMessage::Failed`].
    pub fn status(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Encodes the body and wraps it in a response envelope.
    pub fn to_envelope<C: Codec>(&self, codec: &C) -> Result<ResponseEnvelope, ProtocolError> {
        let payload = match self {
            Self::Handshake(body) => codec.encode(body)?,
            Self::LobbyCreated(body) | Self::LobbyJoined(body) => codec.encode(body)?,
            Self::LobbyLeft(body) => codec.encode(body)?,
            Self::UserMessage(body) => codec.encode(body)?,
            Self::LobbyList(body) => codec.encode(body)?,
            Self::Failed { error, .. } => codec.encode(error)?,
        };
        Ok(ResponseEnvelope {
            msg_type: self.message_type(),
            status: self.status(),
            payload,
        })
    }
}

/// A response frame as it sits on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub status: bool,
    pub payload: Vec<u8>,
}

impl ResponseEnvelope {
    /// Decodes the payload as `T`. Clients pick `T` from `msg_type` and
    /// `status` (`ErrorResponse` whenever `status` is `false`).
    pub fn decode_payload<T: DeserializeOwned, C: Codec>(&self, codec: &C) -> Result<T, ProtocolError> {
        codec.decode(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonCodec;

    #[test]
    fn test_message_type_serializes_as_integer() {
        let json = serde_json::to_string(&MessageType::JoinLobby).unwrap();
        assert_eq!(json, "11");
        let json = serde_json::to_string(&MessageType::LobbyListStatesResponse).unwrap();
        assert_eq!(json, "114");
    }

    #[test]
    fn test_message_type_rejects_unknown_integer() {
        let result: Result<MessageType, _> = serde_json::from_str("42");
        assert!(result.is_err());
        assert!(matches!(
            MessageType::try_from(42),
            Err(ProtocolError::UnknownMessageType(42))
        ));
    }

    #[test]
    fn test_message_type_codes_are_consistent() {
        let all = [
            MessageType::Handshake,
            MessageType::CreateLobby,
            MessageType::JoinLobby,
            MessageType::LeaveLobby,
            MessageType::PostUserMessage,
            MessageType::ListLobbies,
            MessageType::HandshakeResponse,
            MessageType::CreateLobbyResponse,
            MessageType::JoinLobbyResponse,
            MessageType::LeaveLobbyResponse,
            MessageType::UserMessageResponse,
            MessageType::LobbyListStatesResponse,
        ];
        for ty in all {
            assert_eq!(MessageType::try_from(ty.code()).unwrap(), ty);
            if ty.is_request() {
                assert_eq!(ty.response_type().code(), ty.code() + 100);
            } else {
                assert_eq!(ty.response_type(), ty);
            }
        }
    }

    #[test]
    fn test_request_envelope_json_shape() {
        let env = RequestEnvelope::encode(
            &ClientRequest::JoinLobby(JoinLobbyRequest {
                lobby_id: LobbyId::new("abc123"),
            }),
            &JsonCodec,
        )
        .unwrap();
        let json: serde_json::Value = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], 11);
        assert!(json["payload"].is_array());
    }

    #[test]
    fn test_request_envelope_decodes_by_type() {
        let request = ClientRequest::PostUserMessage(PostUserMessageRequest {
            message: "need a medic".into(),
            lobby_id: None,
        });
        let env = RequestEnvelope::encode(&request, &JsonCodec).unwrap();
        assert_eq!(env.decode(&JsonCodec).unwrap(), request);
    }

    #[test]
    fn test_request_envelope_payload_mismatch_is_decode_error() {
        // A JoinLobby type carrying a payload with no lobby_id.
        let env = RequestEnvelope {
            msg_type: MessageType::JoinLobby,
            payload: br#"{"message":"hi"}"#.to_vec(),
        };
        assert!(matches!(env.decode(&JsonCodec), Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_request_envelope_list_lobbies_needs_no_payload() {
        let env: RequestEnvelope = serde_json::from_str(r#"{"type":14}"#).unwrap();
        assert_eq!(env.decode(&JsonCodec).unwrap(), ClientRequest::ListLobbies);
    }

    #[test]
    fn test_request_envelope_rejects_response_types() {
        let env = RequestEnvelope {
            msg_type: MessageType::JoinLobbyResponse,
            payload: Vec::new(),
        };
        assert!(matches!(
            env.decode(&JsonCodec),
            Err(ProtocolError::UnexpectedMessageType(MessageType::JoinLobbyResponse))
        ));
    }

    #[test]
    fn test_leave_request_lobby_id_is_optional() {
        let req: LeaveLobbyRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.lobby_id, None);
    }

    #[test]
    fn test_failed_message_uses_request_response_type() {
        let msg = ServerMessage::failed(MessageType::JoinLobby, ErrorCode::InvalidLobbyId, "no such lobby");
        let env = msg.to_envelope(&JsonCodec).unwrap();

        assert_eq!(env.msg_type, MessageType::JoinLobbyResponse);
        assert!(!env.status);
        let body: ErrorResponse = env.decode_payload(&JsonCodec).unwrap();
        assert_eq!(body.error, ErrorCode::InvalidLobbyId);
    }

    #[test]
    fn test_error_code_is_snake_case() {
        let json = serde_json::to_string(&ErrorCode::DuplicateClient).unwrap();
        assert_eq!(json, "\"duplicate_client\"");
    }

    #[test]
    fn test_leave_response_envelope_has_status_true() {
        let msg = ServerMessage::LobbyLeft(LeaveLobbyResponse {
            lobby_id: LobbyId::new("abc123"),
            steam_id: PlayerId(7),
        });
        let env = msg.to_envelope(&JsonCodec).unwrap();
        assert_eq!(env.msg_type, MessageType::LeaveLobbyResponse);
        assert!(env.status);

        let json: serde_json::Value = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], 112);
        assert_eq!(json["status"], true);
    }
}
