//! Error type for the validation layer.

use courier_protocol::{FaultCode, Version};

/// Why a message failed validation.
///
/// The three variants are deliberately distinct failure *classes*, because
/// they call for different reactions:
///
/// - [`DataInvalid`](Self::DataInvalid) is a transient data problem — the
///   peer sent something malformed. Drop the message, keep the connection.
/// - [`SchemaMissing`](Self::SchemaMissing) is a catalog defect — the
///   message was syntactically fine but nothing is registered for its name.
///   That is a configuration bug on our side, not bad input.
/// - [`WrongVersion`](Self::WrongVersion) is a peer speaking an
///   incompatible protocol major; rejected before any body work.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    /// The value fails the named schema.
    #[error("schema [{schema}] rejected value: {detail}")]
    DataInvalid {
        /// Name of the schema that rejected the value.
        schema: String,
        /// What the check reported.
        detail: String,
    },

    /// No schema is registered under the name the message resolves to.
    #[error("no schema registered for [{name}]")]
    SchemaMissing {
        /// The name that came up empty.
        name: String,
    },

    /// The sender's protocol major does not match ours.
    #[error("incompatible protocol version {got} (supported major is {})", courier_protocol::VERSION.major)]
    WrongVersion {
        /// The version the message carried.
        got: Version,
    },
}

impl ValidateError {
    /// The protocol fault code a responder would answer with.
    ///
    /// A client engine only drops invalid messages, but a server answering
    /// a bad request wants the matching wire code.
    pub fn code(&self) -> FaultCode {
        match self {
            ValidateError::DataInvalid { .. } => FaultCode::BadRequest,
            ValidateError::SchemaMissing { .. } => FaultCode::InternalError,
            ValidateError::WrongVersion { .. } => {
                FaultCode::WrongProtocolVersion
            }
        }
    }

    /// True for the catalog-defect class, which callers log as an error
    /// rather than a warning.
    pub fn is_catalog_defect(&self) -> bool {
        matches!(self, ValidateError::SchemaMissing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_code_mapping() {
        let invalid = ValidateError::DataInvalid {
            schema: "Client.Response".into(),
            detail: "missing requestId".into(),
        };
        let missing = ValidateError::SchemaMissing {
            name: "Server.Event.Nope".into(),
        };
        let version = ValidateError::WrongVersion {
            got: Version::new(2, 0),
        };

        assert_eq!(invalid.code(), FaultCode::BadRequest);
        assert_eq!(missing.code(), FaultCode::InternalError);
        assert_eq!(version.code(), FaultCode::WrongProtocolVersion);
    }

    #[test]
    fn test_only_schema_missing_is_a_catalog_defect() {
        assert!(ValidateError::SchemaMissing { name: "x".into() }
            .is_catalog_defect());
        assert!(!ValidateError::WrongVersion {
            got: Version::new(9, 9)
        }
        .is_catalog_defect());
    }
}
