//! Byte-level helpers: envelopes to JSON bytes and back.
//!
//! The wire format is UTF-8 JSON, fixed by the protocol contract, so this
//! module is two free functions rather than a pluggable codec. Note the
//! asymmetry: [`encode`] starts from a typed [`Message`], but [`parse`]
//! stops at a raw [`serde_json::Value`]. Inbound bytes must pass envelope
//! validation before anything treats them as a `Message`.

use crate::envelope::Message;
use crate::ProtocolError;

/// Serializes an envelope into wire bytes.
///
/// # Errors
/// Returns `ProtocolError::Encode` if serialization fails.
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(message).map_err(ProtocolError::Encode)
}

/// Parses wire bytes into a raw JSON value, the input to envelope
/// validation.
///
/// # Errors
/// Returns `ProtocolError::Decode` if the bytes are not valid JSON.
pub fn parse(data: &[u8]) -> Result<serde_json::Value, ProtocolError> {
    serde_json::from_slice(data).map_err(ProtocolError::Decode)
}
