//! Per-side validation dispatch: resolving and applying schemas.
//!
//! A [`Dispatch`] is the validation view of one side of a connection. It
//! knows which catalog an inbound message belongs to and runs the two
//! validation tiers against the registry:
//!
//! 1. [`validate_envelope`](Dispatch::validate_envelope) — generic
//!    envelope shape, non-empty id, version gate,
//! 2. [`validate_body`](Dispatch::validate_body) — kind-level body
//!    schema, then the payload schema for the message's type name.
//!
//! The catalog a conversation belongs to is the side that initiated it,
//! so resolution depends on direction: a Response or Pong answers a
//! conversation *we* opened and is validated under the local catalog,
//! while a Request, Event, or Ping originates with the peer and is
//! validated under the peer's catalog.

use courier_protocol::{Catalog, Message, MessageKind, ResponseOutcome, VERSION};

use crate::registry::{
    self, kind_schema, payload_schema, SchemaRegistry, ENVELOPE_SCHEMA,
};
use crate::ValidateError;

/// The validation view of one side of a connection.
#[derive(Clone, Copy)]
pub struct Dispatch {
    local: Catalog,
    registry: &'static SchemaRegistry,
}

impl Dispatch {
    /// The client side's view, over the global registry.
    pub fn client() -> Self {
        Self::with_registry(Catalog::Client, registry::global())
    }

    /// The server side's view, over the global registry.
    pub fn server() -> Self {
        Self::with_registry(Catalog::Server, registry::global())
    }

    /// A view over a custom registry. Tests use this to provoke the
    /// schema-missing failure class without poking holes in the global
    /// table.
    pub fn with_registry(
        local: Catalog,
        registry: &'static SchemaRegistry,
    ) -> Self {
        Self { local, registry }
    }

    /// Which catalog an inbound message of this kind belongs to.
    pub fn catalog_for(&self, kind: MessageKind) -> Catalog {
        match kind {
            // Answers to conversations we opened.
            MessageKind::Response | MessageKind::Pong => self.local,
            // Conversations the peer opened.
            MessageKind::Request
            | MessageKind::Event
            | MessageKind::Ping => self.local.peer(),
        }
    }

    /// Tier one: checks a raw inbound value against the envelope schema,
    /// requires a non-empty id, and applies the version gate.
    ///
    /// The gate runs before any body work: a peer speaking a different
    /// protocol major is rejected as [`ValidateError::WrongVersion`] even
    /// if its body happens to look valid (or invalid) under our schemas.
    ///
    /// # Errors
    /// [`ValidateError::DataInvalid`] for a malformed envelope,
    /// [`ValidateError::WrongVersion`] on a major mismatch.
    pub fn validate_envelope(
        &self,
        value: &serde_json::Value,
    ) -> Result<Message, ValidateError> {
        self.check(ENVELOPE_SCHEMA, value)?;

        let message: Message = serde_json::from_value(value.clone())
            .map_err(|e| ValidateError::DataInvalid {
                schema: ENVELOPE_SCHEMA.into(),
                detail: e.to_string(),
            })?;

        if message.id.is_empty() {
            return Err(ValidateError::DataInvalid {
                schema: ENVELOPE_SCHEMA.into(),
                detail: "id must be a non-empty string".into(),
            });
        }

        if !VERSION.compatible(&message.version) {
            return Err(ValidateError::WrongVersion {
                got: message.version,
            });
        }

        Ok(message)
    }

    /// Tier two: checks the body against its kind-level schema, then the
    /// payload against its type-name schema.
    ///
    /// For a failed Response the payload is null and only the kind-level
    /// schema applies (it covers the fault shape). Ping and Pong have no
    /// type name and stop after the kind-level check.
    ///
    /// # Errors
    /// [`ValidateError::DataInvalid`] when a schema rejects the body or
    /// payload; [`ValidateError::SchemaMissing`] when a syntactically
    /// valid name resolves to no registered schema (a catalog defect).
    pub fn validate_body(
        &self,
        message: &Message,
    ) -> Result<(), ValidateError> {
        let catalog = self.catalog_for(message.kind);
        let body = serde_json::Value::Object(message.body.clone());

        let name = kind_schema(catalog, message.kind);
        self.check(&name, &body)?;

        match message.kind {
            MessageKind::Request | MessageKind::Event => {
                // The kind-level check guarantees both fields exist.
                let type_name = message
                    .body
                    .get("typeName")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                let payload = message
                    .body
                    .get("payload")
                    .cloned()
                    .unwrap_or(serde_json::Value::Null);
                self.check_payload(
                    catalog,
                    message.kind,
                    type_name,
                    &payload,
                )
            }
            MessageKind::Response => {
                let response = message.response_body().map_err(|e| {
                    ValidateError::DataInvalid {
                        schema: name,
                        detail: e.to_string(),
                    }
                })?;
                match response.outcome {
                    ResponseOutcome::Success(payload) => self
                        .check_payload(
                            catalog,
                            MessageKind::Response,
                            &response.type_name,
                            &serde_json::Value::Object(payload),
                        ),
                    ResponseOutcome::Failure(_) => Ok(()),
                }
            }
            MessageKind::Ping | MessageKind::Pong => Ok(()),
        }
    }

    fn check_payload(
        &self,
        catalog: Catalog,
        kind: MessageKind,
        type_name: &str,
        payload: &serde_json::Value,
    ) -> Result<(), ValidateError> {
        let name = payload_schema(catalog, kind, type_name);
        self.check(&name, payload)
    }

    fn check(
        &self,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<(), ValidateError> {
        let check = self.registry.lookup(name).ok_or_else(|| {
            ValidateError::SchemaMissing { name: name.into() }
        })?;
        check(value).map_err(|detail| ValidateError::DataInvalid {
            schema: name.into(),
            detail,
        })
    }
}
