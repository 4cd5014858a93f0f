//! The message envelope: Courier's top-level wire format.
//!
//! Every value that travels over a Courier connection is a [`Message`], no
//! matter which side sent it or what it means to the application. The
//! envelope carries the protocol version, the message kind, a unique
//! identifier, and an untyped JSON body whose shape depends on the kind.
//!
//! Think of this module as the "grammar" of the protocol. The two catalogs
//! ([`crate::server`] and [`crate::client`]) supply the vocabulary.

// Serde is Rust's standard (de)serialization framework. The two key traits:
//   - `Serialize`:   "I can be turned INTO JSON/bytes"
//   - `Deserialize`: "I can be created FROM JSON/bytes"
// Most types here derive both; `ResponseBody` implements them by hand
// because its wire shape encodes an invariant the derive cannot express.
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::fault::Fault;
use crate::ids;
use crate::version::{Version, VERSION};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// A JSON object: the shape of every message body and every payload.
///
/// The envelope keeps bodies untyped on purpose. Catalog payloads are typed
/// structs (see [`crate::server`] / [`crate::client`]) that are lowered into
/// this map at the wire boundary and lifted back out after validation.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Serializes a typed payload struct into the wire [`Payload`] object.
///
/// # Errors
/// Returns `ProtocolError::Encode` if serialization fails, or
/// `ProtocolError::InvalidMessage` if the value does not serialize to a JSON
/// object (payloads are objects by contract, never arrays or scalars).
pub fn to_payload<T: Serialize>(value: &T) -> Result<Payload, ProtocolError> {
    match serde_json::to_value(value).map_err(ProtocolError::Encode)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(ProtocolError::InvalidMessage(format!(
            "payload must serialize to a JSON object, got {other}"
        ))),
    }
}

/// Lifts a wire [`Payload`] object back into a typed payload struct.
///
/// # Errors
/// Returns `ProtocolError::Decode` if the object does not match the type.
pub fn from_payload<T: DeserializeOwned>(
    payload: Payload,
) -> Result<T, ProtocolError> {
    serde_json::from_value(serde_json::Value::Object(payload))
        .map_err(ProtocolError::Decode)
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// The five kinds of message the protocol knows.
///
/// The kind decides which body shape applies and how the engine routes an
/// inbound message. Serde serializes unit variants by their name, so the
/// wire literals are exactly `"Request"`, `"Response"`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Asks the peer to do something; expects exactly one Response.
    Request,

    /// Answers one Request, identified by `requestId`.
    Response,

    /// One-way notification; never answered.
    Event,

    /// Keepalive probe.
    Ping,

    /// Keepalive answer, identified by `pingId`.
    Pong,
}

impl MessageKind {
    /// Every kind, in a fixed order. Used to build the validator table.
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Request,
        MessageKind::Response,
        MessageKind::Event,
        MessageKind::Ping,
        MessageKind::Pong,
    ];

    /// The wire literal for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Request => "Request",
            MessageKind::Response => "Response",
            MessageKind::Event => "Event",
            MessageKind::Ping => "Ping",
            MessageKind::Pong => "Pong",
        }
    }

    /// Ping and Pong are keepalive traffic and are excluded from
    /// per-message trace logging.
    pub fn is_keepalive(&self) -> bool {
        matches!(self, MessageKind::Ping | MessageKind::Pong)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Message — the envelope itself
// ---------------------------------------------------------------------------

/// The top-level wire envelope. Immutable once constructed.
///
/// ```text
/// ┌──────────────────────────────────┐
/// │ version: { major: 1, minor: 0 }  │  ← compatibility gate
/// │ kind: "Request"                  │  ← routing + body shape
/// │ id: "4b54…"                      │  ← unique per message
/// │ ┌──────────────────────────────┐ │
/// │ │ body: { typeName, payload }  │ │  ← shape depends on kind
/// │ └──────────────────────────────┘ │
/// └──────────────────────────────────┘
/// ```
///
/// `id` is generated once at construction and identifies this message
/// instance, not a session. A Response repeats the answered Request's id in
/// its body's `requestId` field; the envelope `id` of the Response itself
/// is still fresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Protocol version of the sender. Peers accept any message whose
    /// `major` matches their own; `minor` differences are ignored.
    pub version: Version,

    /// Which of the five message kinds this is.
    pub kind: MessageKind,

    /// Freshly generated, process-unique identifier.
    pub id: String,

    /// The kind-specific body, kept as a raw JSON object so validation
    /// can inspect it before any typed decoding happens.
    pub body: Payload,
}

impl Message {
    fn fresh(kind: MessageKind, body: Payload) -> Self {
        Self {
            version: VERSION,
            kind,
            id: ids::message_id(),
            body,
        }
    }

    /// Builds a Request envelope: fresh id, current version.
    pub fn request(type_name: impl Into<String>, payload: Payload) -> Self {
        let body = RequestBody {
            type_name: type_name.into(),
            payload,
        };
        Self::fresh(MessageKind::Request, body.into_body())
    }

    /// Builds a Response envelope answering the request with id
    /// `request_id`. The [`ResponseOutcome`] makes the error/payload
    /// exclusivity invariant unrepresentable: a failure outcome always
    /// serializes with `payload: null` and a success outcome with
    /// `error: null`.
    pub fn response(
        type_name: impl Into<String>,
        request_id: impl Into<String>,
        outcome: ResponseOutcome,
    ) -> Self {
        let body = ResponseBody {
            type_name: type_name.into(),
            request_id: request_id.into(),
            outcome,
        };
        Self::fresh(MessageKind::Response, body.into_body())
    }

    /// Builds an Event envelope.
    pub fn event(type_name: impl Into<String>, payload: Payload) -> Self {
        let body = EventBody {
            type_name: type_name.into(),
            payload,
        };
        Self::fresh(MessageKind::Event, body.into_body())
    }

    /// Builds a Ping envelope. The body is an empty object.
    pub fn ping() -> Self {
        Self::fresh(MessageKind::Ping, Payload::new())
    }

    /// Builds a Pong envelope echoing the answered Ping's id.
    pub fn pong(ping_id: impl Into<String>) -> Self {
        let body = PongBody {
            ping_id: ping_id.into(),
        };
        Self::fresh(MessageKind::Pong, body.into_body())
    }

    // -- typed body accessors -------------------------------------------

    /// Decodes the body as a [`RequestBody`].
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the body does not have the
    /// Request shape. Callers that validated the message first will only
    /// see this fail on a kind mismatch.
    pub fn request_body(&self) -> Result<RequestBody, ProtocolError> {
        self.decode_body()
    }

    /// Decodes the body as a [`ResponseBody`].
    pub fn response_body(&self) -> Result<ResponseBody, ProtocolError> {
        self.decode_body()
    }

    /// Decodes the body as an [`EventBody`].
    pub fn event_body(&self) -> Result<EventBody, ProtocolError> {
        self.decode_body()
    }

    /// Decodes the body as a [`PongBody`].
    pub fn pong_body(&self) -> Result<PongBody, ProtocolError> {
        self.decode_body()
    }

    fn decode_body<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(serde_json::Value::Object(self.body.clone()))
            .map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Body shapes
// ---------------------------------------------------------------------------

/// Body of a Request: `{ "typeName": …, "payload": {…} }`.
///
/// `#[serde(rename_all = "camelCase")]` maps the Rust field `type_name`
/// to the wire field `typeName`, and likewise for the other bodies below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    /// Catalog type name, e.g. `"Handshake"`.
    pub type_name: String,
    /// The typed payload, lowered to a JSON object.
    pub payload: Payload,
}

impl RequestBody {
    /// Lowers the typed body into the envelope's raw `body` object.
    pub fn into_body(self) -> Payload {
        let mut body = Payload::new();
        body.insert("typeName".into(), self.type_name.into());
        body.insert(
            "payload".into(),
            serde_json::Value::Object(self.payload),
        );
        body
    }
}

/// Body of an Event: same shape as a Request body, but nothing answers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    /// Catalog type name, e.g. `"FightEnd"`.
    pub type_name: String,
    /// The typed payload, lowered to a JSON object.
    pub payload: Payload,
}

impl EventBody {
    /// Lowers the typed body into the envelope's raw `body` object.
    pub fn into_body(self) -> Payload {
        let mut body = Payload::new();
        body.insert("typeName".into(), self.type_name.into());
        body.insert(
            "payload".into(),
            serde_json::Value::Object(self.payload),
        );
        body
    }
}

/// Body of a Ping: always the empty object `{}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
pub struct PingBody {}

/// Body of a Pong: `{ "pingId": … }`, echoing the answered Ping's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PongBody {
    /// Envelope id of the Ping being answered.
    pub ping_id: String,
}

impl PongBody {
    /// Lowers the typed body into the envelope's raw `body` object.
    pub fn into_body(self) -> Payload {
        let mut body = Payload::new();
        body.insert("pingId".into(), self.ping_id.into());
        body
    }
}

// ---------------------------------------------------------------------------
// Response body and outcome
// ---------------------------------------------------------------------------

/// How a Request was answered: with a result payload or with a fault.
///
/// On the wire a Response body carries the nullable pair
/// `{ "error": Fault|null, "payload": object|null }` with the invariant
/// "a non-null error forces a null payload". In Rust that pair collapses
/// into this two-case enum, so the invariant holds by construction and
/// every match on an outcome is forced to handle both cases.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// The request succeeded. Carries the result payload, which may be
    /// an empty object.
    Success(Payload),

    /// The request failed. Carries the protocol fault; the wire payload
    /// is null.
    Failure(Fault),
}

impl ResponseOutcome {
    /// True for the `Success` case.
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseOutcome::Success(_))
    }

    /// The result payload, if this outcome is a success.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            ResponseOutcome::Success(payload) => Some(payload),
            ResponseOutcome::Failure(_) => None,
        }
    }

    /// The fault, if this outcome is a failure.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            ResponseOutcome::Success(_) => None,
            ResponseOutcome::Failure(fault) => Some(fault),
        }
    }
}

/// Body of a Response:
/// `{ "typeName": …, "requestId": …, "error": …, "payload": … }`.
///
/// `request_id` must equal the envelope `id` of the Request being
/// answered; the correlation engine uses it to find the pending caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBody {
    /// Catalog type name of the request this answers.
    pub type_name: String,
    /// Envelope id of the Request being answered.
    pub request_id: String,
    /// Success-with-payload or failure-with-fault.
    pub outcome: ResponseOutcome,
}

impl ResponseBody {
    /// Lowers the typed body into the envelope's raw `body` object,
    /// writing the `error`/`payload` pair the outcome stands for.
    pub fn into_body(self) -> Payload {
        let mut body = Payload::new();
        body.insert("typeName".into(), self.type_name.into());
        body.insert("requestId".into(), self.request_id.into());
        match self.outcome {
            ResponseOutcome::Success(payload) => {
                body.insert("error".into(), serde_json::Value::Null);
                body.insert(
                    "payload".into(),
                    serde_json::Value::Object(payload),
                );
            }
            ResponseOutcome::Failure(fault) => {
                body.insert("error".into(), fault.into_value());
                body.insert("payload".into(), serde_json::Value::Null);
            }
        }
        body
    }
}

/// The wire-level view of a Response body: both nullable fields present.
/// Exists only as a (de)serialization intermediate for [`ResponseBody`].
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResponseBody {
    type_name: String,
    request_id: String,
    error: Option<Fault>,
    payload: Option<Payload>,
}

impl Serialize for ResponseBody {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let (error, payload) = match &self.outcome {
            ResponseOutcome::Success(p) => (None, Some(p.clone())),
            ResponseOutcome::Failure(f) => (Some(f.clone()), None),
        };
        RawResponseBody {
            type_name: self.type_name.clone(),
            request_id: self.request_id.clone(),
            error,
            payload,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResponseBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawResponseBody::deserialize(deserializer)?;
        let outcome = match (raw.error, raw.payload) {
            (None, Some(payload)) => ResponseOutcome::Success(payload),
            (Some(fault), None) => ResponseOutcome::Failure(fault),
            (Some(_), Some(_)) => {
                return Err(D::Error::custom(
                    "response carries both error and payload",
                ));
            }
            (None, None) => {
                return Err(D::Error::custom(
                    "response carries neither error nor payload",
                ));
            }
        };
        Ok(ResponseBody {
            type_name: raw.type_name,
            request_id: raw.request_id,
            outcome,
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
