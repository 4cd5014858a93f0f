//! The Client catalog: the vocabulary of client-initiated conversations.
//!
//! Mirror of [`crate::server`]: requests a client sends to the server and
//! events a client emits. The two vocabularies are disjoint even though
//! both serialize through the same envelope.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::envelope::{
    from_payload, to_payload, EventBody, Message, RequestBody,
    ResponseOutcome,
};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Type name vocabularies
// ---------------------------------------------------------------------------

/// Request types a client may initiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientRequestKind {
    /// Introduces the client to the server; the first request on every
    /// connection.
    Handshake,
}

impl ClientRequestKind {
    /// Every request type in this catalog.
    pub const ALL: [ClientRequestKind; 1] = [ClientRequestKind::Handshake];

    /// The wire `typeName` literal.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientRequestKind::Handshake => "Handshake",
        }
    }

    /// Parses a wire `typeName` back into the vocabulary.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for ClientRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event types a client may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientEventKind {
    /// The client finished loading and can take traffic.
    Ready,
}

impl ClientEventKind {
    /// Every event type in this catalog.
    pub const ALL: [ClientEventKind; 1] = [ClientEventKind::Ready];

    /// The wire `typeName` literal.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientEventKind::Ready => "Ready",
        }
    }

    /// Parses a wire `typeName` back into the vocabulary.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for ClientEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payload shapes
// ---------------------------------------------------------------------------

/// Payload of a Handshake request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeRequest {
    /// Stable identifier of the connecting client.
    pub client_id: String,
}

/// Payload of a successful Handshake response. Empty by contract.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
pub struct HandshakeResponse {}

/// Payload of a Ready event. Empty by contract.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
pub struct ReadyEvent {}

// ---------------------------------------------------------------------------
// Closed sums over the vocabulary
// ---------------------------------------------------------------------------

/// A client-initiated request with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    /// See [`HandshakeRequest`].
    Handshake(HandshakeRequest),
}

impl ClientRequest {
    /// The catalog type of this request.
    pub fn kind(&self) -> ClientRequestKind {
        match self {
            ClientRequest::Handshake(_) => ClientRequestKind::Handshake,
        }
    }

    /// Builds the wire envelope for this request.
    pub fn into_message(self) -> Result<Message, ProtocolError> {
        match self {
            ClientRequest::Handshake(payload) => {
                request(ClientRequestKind::Handshake, &payload)
            }
        }
    }

    /// Lifts a validated Request body back into the typed sum.
    pub fn from_body(body: RequestBody) -> Result<Self, ProtocolError> {
        match ClientRequestKind::from_name(&body.type_name) {
            Some(ClientRequestKind::Handshake) => {
                Ok(ClientRequest::Handshake(from_payload(body.payload)?))
            }
            None => Err(ProtocolError::InvalidMessage(format!(
                "unknown Client request type {:?}",
                body.type_name
            ))),
        }
    }
}

/// A client-emitted event with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// See [`ReadyEvent`].
    Ready(ReadyEvent),
}

impl ClientEvent {
    /// The catalog type of this event.
    pub fn kind(&self) -> ClientEventKind {
        match self {
            ClientEvent::Ready(_) => ClientEventKind::Ready,
        }
    }

    /// Builds the wire envelope for this event.
    pub fn into_message(self) -> Result<Message, ProtocolError> {
        match self {
            ClientEvent::Ready(payload) => {
                event(ClientEventKind::Ready, &payload)
            }
        }
    }

    /// Lifts a validated Event body back into the typed sum.
    pub fn from_body(body: EventBody) -> Result<Self, ProtocolError> {
        match ClientEventKind::from_name(&body.type_name) {
            Some(ClientEventKind::Ready) => {
                Ok(ClientEvent::Ready(from_payload(body.payload)?))
            }
            None => Err(ProtocolError::InvalidMessage(format!(
                "unknown Client event type {:?}",
                body.type_name
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// Builds a Request envelope in this catalog from a typed payload.
///
/// # Errors
/// Fails only if the payload does not serialize to a JSON object.
pub fn request<P: Serialize>(
    kind: ClientRequestKind,
    payload: &P,
) -> Result<Message, ProtocolError> {
    Ok(Message::request(kind.as_str(), to_payload(payload)?))
}

/// Builds a Response envelope answering a request in this catalog.
///
/// This is what a server calls to answer a client request: the typeName
/// comes from the client's vocabulary because the client opened the
/// conversation.
pub fn response(
    kind: ClientRequestKind,
    request_id: impl Into<String>,
    outcome: ResponseOutcome,
) -> Message {
    Message::response(kind.as_str(), request_id, outcome)
}

/// Builds an Event envelope in this catalog from a typed payload.
///
/// # Errors
/// Fails only if the payload does not serialize to a JSON object.
pub fn event<P: Serialize>(
    kind: ClientEventKind,
    payload: &P,
) -> Result<Message, ProtocolError> {
    Ok(Message::event(kind.as_str(), to_payload(payload)?))
}

/// Convenience factory: a Handshake request.
pub fn handshake_request(
    payload: HandshakeRequest,
) -> Result<Message, ProtocolError> {
    request(ClientRequestKind::Handshake, &payload)
}

/// Convenience factory: a Ready event.
pub fn ready_event() -> Result<Message, ProtocolError> {
    event(ClientEventKind::Ready, &ReadyEvent::default())
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{MessageKind, Payload};

    #[test]
    fn test_handshake_request_json_shape() {
        let msg = handshake_request(HandshakeRequest {
            client_id: "abc".into(),
        })
        .unwrap();
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(msg.kind, MessageKind::Request);
        assert_eq!(json["body"]["typeName"], "Handshake");
        assert_eq!(json["body"]["payload"]["clientId"], "abc");
    }

    #[test]
    fn test_ready_event_json_shape() {
        let msg = ready_event().unwrap();
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(msg.kind, MessageKind::Event);
        assert_eq!(json["body"]["typeName"], "Ready");
        assert_eq!(json["body"]["payload"], serde_json::json!({}));
    }

    #[test]
    fn test_response_factory_success_shape() {
        let resp = response(
            ClientRequestKind::Handshake,
            "req-1",
            ResponseOutcome::Success(Payload::new()),
        );
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["body"]["typeName"], "Handshake");
        assert_eq!(json["body"]["requestId"], "req-1");
        assert!(json["body"]["error"].is_null());
        assert_eq!(json["body"]["payload"], serde_json::json!({}));
    }

    #[test]
    fn test_client_request_round_trip_through_body() {
        let original = ClientRequest::Handshake(HandshakeRequest {
            client_id: "world-7".into(),
        });
        let msg = original.clone().into_message().unwrap();
        let body = msg.request_body().unwrap();
        let lifted = ClientRequest::from_body(body).unwrap();
        assert_eq!(lifted, original);
    }

    #[test]
    fn test_client_event_from_body_rejects_foreign_type() {
        let body = EventBody {
            type_name: "FightEnd".into(),
            payload: Payload::new(),
        };
        assert!(ClientEvent::from_body(body).is_err());
    }
}
