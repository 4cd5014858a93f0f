//! Protocol faults: the error object carried inside a failed Response.
//!
//! A [`Fault`] is wire data, not a Rust error in the usual sense. It is
//! what one peer tells the other about why a request failed. It still
//! implements `std::error::Error` so it can slot into an error chain on
//! the receiving side.

use serde::{Deserialize, Serialize};

use std::fmt;

/// The closed set of protocol-level failure codes.
///
/// Serde serializes unit variants by name, so the wire literals are
/// `"WrongProtocolVersion"`, `"InternalError"`, `"BadRequest"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultCode {
    /// The sender's `version.major` does not match ours.
    WrongProtocolVersion,

    /// The receiver failed while handling a well-formed request.
    InternalError,

    /// The request was malformed or violated the catalog contract.
    BadRequest,
}

impl FaultCode {
    /// The wire literal for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultCode::WrongProtocolVersion => "WrongProtocolVersion",
            FaultCode::InternalError => "InternalError",
            FaultCode::BadRequest => "BadRequest",
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The wire error object: `{ "code": …, "message": … }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Which class of failure this is.
    pub code: FaultCode,
    /// Human-readable detail, shown in logs on the receiving side.
    pub message: String,
}

impl Fault {
    /// Builds a fault from a ready-made message.
    pub fn new(code: FaultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Normalizes a Rust error into a fault, preserving the full cause
    /// chain as the message: `"outer: middle: root"`.
    pub fn from_error(
        code: FaultCode,
        error: &(dyn std::error::Error + 'static),
    ) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { code, message }
    }

    /// Normalizes any displayable value into a fault.
    pub fn from_display(code: FaultCode, cause: impl fmt::Display) -> Self {
        Self {
            code,
            message: cause.to_string(),
        }
    }

    /// Lowers the fault into a raw JSON value for a response body.
    pub(crate) fn into_value(self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("code".into(), self.code.as_str().into());
        map.insert("message".into(), self.message.into());
        serde_json::Value::Object(map)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for Fault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_code_serializes_as_literal() {
        let json =
            serde_json::to_string(&FaultCode::WrongProtocolVersion).unwrap();
        assert_eq!(json, "\"WrongProtocolVersion\"");
    }

    #[test]
    fn test_fault_json_shape() {
        let fault = Fault::new(FaultCode::BadRequest, "missing clientId");
        let json = serde_json::to_value(&fault).unwrap();
        assert_eq!(json["code"], "BadRequest");
        assert_eq!(json["message"], "missing clientId");
    }

    #[test]
    fn test_fault_from_error_joins_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("lookup failed")]
        struct Outer(#[source] std::io::Error);

        let outer = Outer(std::io::Error::other("disk on fire"));
        let fault = Fault::from_error(FaultCode::InternalError, &outer);

        assert_eq!(fault.code, FaultCode::InternalError);
        assert_eq!(fault.message, "lookup failed: disk on fire");
    }

    #[test]
    fn test_fault_from_display_coerces_value() {
        let fault = Fault::from_display(FaultCode::BadRequest, 42);
        assert_eq!(fault.message, "42");
    }

    #[test]
    fn test_fault_display_includes_code_and_message() {
        let fault = Fault::new(FaultCode::InternalError, "boom");
        assert_eq!(fault.to_string(), "[InternalError] boom");
    }

    #[test]
    fn test_fault_round_trip() {
        let fault = Fault::new(FaultCode::WrongProtocolVersion, "major 2");
        let bytes = serde_json::to_vec(&fault).unwrap();
        let decoded: Fault = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(fault, decoded);
    }
}
