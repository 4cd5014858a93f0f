//! The Server catalog: the vocabulary of server-initiated conversations.
//!
//! Entries here are requests the server sends to a client and events the
//! server emits. Each entry is one variant of a closed enum, so adding a
//! type to the catalog forces every `match` over the vocabulary (factories,
//! validators, routers) to handle it, at compile time.

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

/// Request types the server may initiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerRequestKind {
    /// Orders a client to start a fight.
    StartFight,
}

impl ServerRequestKind {
    /// Every request type in this catalog.
    pub const ALL: [ServerRequestKind; 1] = [ServerRequestKind::StartFight];

    /// The wire `typeName` literal.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerRequestKind::StartFight => "StartFight",
        }
    }

    /// Parses a wire `typeName` back into the vocabulary.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for ServerRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event types the server may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerEventKind {
    /// A fight has finished.
    FightEnd,
}

impl ServerEventKind {
    /// Every event type in this catalog.
    pub const ALL: [ServerEventKind; 1] = [ServerEventKind::FightEnd];

    /// The wire `typeName` literal.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerEventKind::FightEnd => "FightEnd",
        }
    }

    /// Parses a wire `typeName` back into the vocabulary.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for ServerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payload shapes
// ---------------------------------------------------------------------------

/// Payload of a StartFight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartFightRequest {
    /// Opaque fight setup blob, interpreted by the receiving client.
    pub data: String,
}

/// Payload of a successful StartFight response. Empty by contract.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
pub struct StartFightResponse {}

/// Payload of a FightEnd event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FightEndEvent {
    /// Which fight finished.
    pub fight_id: String,
}

// ---------------------------------------------------------------------------
// Closed sums over the vocabulary
// ---------------------------------------------------------------------------

/// A server-initiated request with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerRequest {
    /// See [`StartFightRequest`].
    StartFight(StartFightRequest),
}

impl ServerRequest {
    /// The catalog type of this request.
    pub fn kind(&self) -> ServerRequestKind {
        match self {
            ServerRequest::StartFight(_) => ServerRequestKind::StartFight,
        }
    }

    /// Builds the wire envelope for this request.
    pub fn into_message(self) -> Result<Message, ProtocolError> {
        match self {
            ServerRequest::StartFight(payload) => {
                request(ServerRequestKind::StartFight, &payload)
            }
        }
    }

    /// Lifts a validated Request body back into the typed sum.
    pub fn from_body(body: RequestBody) -> Result<Self, ProtocolError> {
        match ServerRequestKind::from_name(&body.type_name) {
            Some(ServerRequestKind::StartFight) => {
                Ok(ServerRequest::StartFight(from_payload(body.payload)?))
            }
            None => Err(ProtocolError::InvalidMessage(format!(
                "unknown Server request type {:?}",
                body.type_name
            ))),
        }
    }
}

/// A server-emitted event with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// See [`FightEndEvent`].
    FightEnd(FightEndEvent),
}

impl ServerEvent {
    /// The catalog type of this event.
    pub fn kind(&self) -> ServerEventKind {
        match self {
            ServerEvent::FightEnd(_) => ServerEventKind::FightEnd,
        }
    }

    /// Builds the wire envelope for this event.
    pub fn into_message(self) -> Result<Message, ProtocolError> {
        match self {
            ServerEvent::FightEnd(payload) => {
                event(ServerEventKind::FightEnd, &payload)
            }
        }
    }

    /// Lifts a validated Event body back into the typed sum.
    pub fn from_body(body: EventBody) -> Result<Self, ProtocolError> {
        match ServerEventKind::from_name(&body.type_name) {
            Some(ServerEventKind::FightEnd) => {
                Ok(ServerEvent::FightEnd(from_payload(body.payload)?))
            }
            None => Err(ProtocolError::InvalidMessage(format!(
                "unknown Server event type {:?}",
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
    kind: ServerRequestKind,
    payload: &P,
) -> Result<Message, ProtocolError> {
    Ok(Message::request(kind.as_str(), to_payload(payload)?))
}

/// Builds a Response envelope answering a request in this catalog.
pub fn response(
    kind: ServerRequestKind,
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
    kind: ServerEventKind,
    payload: &P,
) -> Result<Message, ProtocolError> {
    Ok(Message::event(kind.as_str(), to_payload(payload)?))
}

/// Convenience factory: a StartFight request.
pub fn start_fight_request(
    payload: StartFightRequest,
) -> Result<Message, ProtocolError> {
    request(ServerRequestKind::StartFight, &payload)
}

/// Convenience factory: a FightEnd event.
pub fn fight_end_event(
    payload: FightEndEvent,
) -> Result<Message, ProtocolError> {
    event(ServerEventKind::FightEnd, &payload)
}

// =========================================================================
// Tests
// =========================================================================
