//! Error types for the protocol layer.
//!
//! Each crate in Courier defines its own error enum. This keeps errors
//! specific and meaningful: a `ProtocolError` is always about building or
//! reading messages, never about networking or connection state.

/// Errors that can occur while building or reading protocol messages.
///
/// `#[derive(thiserror::Error)]` generates the `std::error::Error`
/// implementation; the `#[error("...")]` attributes define the message
/// shown in logs and error chains.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message or payload into JSON).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// or a body that does not match the expected shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value is well-formed JSON but violates a protocol rule, e.g.
    /// a payload that is not an object or a typeName outside the catalog.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
