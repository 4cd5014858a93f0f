//! The schema registry: a name-keyed table of check functions.
//!
//! Schemas are addressed by dotted names following the protocol's
//! conventions:
//!
//! - `"Message"` — the generic envelope schema,
//! - `"{Catalog}.{Kind}"` — the body shape for a kind, e.g.
//!   `"Client.Response"`,
//! - `"{Catalog}.{Kind}.{TypeName}"` — the payload shape for one catalog
//!   entry, e.g. `"Client.Request.Handshake"`.
//!
//! [`SchemaRegistry::with_protocol_catalogs`] builds the full table by
//! iterating the catalog enums with exhaustive matches, so the table and
//! the catalogs can never drift apart: adding a vocabulary entry without
//! registering its schemas is a compile error, not a runtime lookup miss.
//!
//! The process-wide instance lives behind [`global`]; it is constructed on
//! first use and never mutated afterwards, so any number of engines and
//! threads can share it without locking.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;

use courier_protocol::{client, server};
use courier_protocol::{
    Catalog, EventBody, Message, MessageKind, PingBody, PongBody,
    RequestBody, ResponseBody,
};

/// Name of the generic envelope schema.
pub const ENVELOPE_SCHEMA: &str = "Message";

/// A compiled check: accepts the value or reports why not.
///
/// Checks never transform their input; the `Ok` arm carries nothing on
/// purpose.
pub type CheckFn =
    Box<dyn Fn(&serde_json::Value) -> Result<(), String> + Send + Sync>;

/// Compiles a check from a deserializable type.
///
/// The check is a typed probe: the value passes iff it deserializes as
/// `T`. The probe result is thrown away — callers that want the typed
/// value decode it themselves after validation.
pub fn compile<T: DeserializeOwned + 'static>() -> CheckFn {
    Box::new(|value| {
        serde_json::from_value::<T>(value.clone())
            .map(|_| ())
            .map_err(|e| e.to_string())
    })
}

/// The schema name for a kind-level body check, e.g. `"Client.Response"`.
pub fn kind_schema(catalog: Catalog, kind: MessageKind) -> String {
    format!("{catalog}.{kind}")
}

/// The schema name for a payload-level check, e.g.
/// `"Client.Request.Handshake"`.
pub fn payload_schema(
    catalog: Catalog,
    kind: MessageKind,
    type_name: &str,
) -> String {
    format!("{catalog}.{kind}.{type_name}")
}

/// A name-keyed table of compiled checks. Write-once, then read-only.
#[derive(Default)]
pub struct SchemaRegistry {
    checks: HashMap<String, CheckFn>,
}

impl SchemaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a check under a name, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, check: CheckFn) {
        self.checks.insert(name.into(), check);
    }

    /// Looks up a check by name.
    pub fn lookup(&self, name: &str) -> Option<&CheckFn> {
        self.checks.get(name)
    }

    /// Every registered schema name, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.checks.keys().map(String::as_str)
    }

    /// Builds the complete table for the two protocol catalogs.
    ///
    /// Three layers: the envelope schema, a kind-level body schema for
    /// every catalog × kind pair, and a payload-level schema for every
    /// catalog entry (requests get two — one for the request payload, one
    /// for the success-response payload).
    pub fn with_protocol_catalogs() -> Self {
        let mut registry = Self::new();

        registry.register(ENVELOPE_SCHEMA, compile::<Message>());

        // Kind-level body schemas. The body shape depends only on the
        // kind; the catalog prefix exists so dispatch resolves one name
        // per (catalog, kind) pair.
        for catalog in Catalog::ALL {
            for kind in MessageKind::ALL {
                let check = match kind {
                    MessageKind::Request => compile::<RequestBody>(),
                    MessageKind::Response => compile::<ResponseBody>(),
                    MessageKind::Event => compile::<EventBody>(),
                    MessageKind::Ping => compile::<PingBody>(),
                    MessageKind::Pong => compile::<PongBody>(),
                };
                registry.register(kind_schema(catalog, kind), check);
            }
        }

        // Payload-level schemas. The exhaustive matches are the point:
        // a new vocabulary entry stops compiling here until it names its
        // payload types.
        for kind in server::ServerRequestKind::ALL {
            let (request, response): (CheckFn, CheckFn) = match kind {
                server::ServerRequestKind::StartFight => (
                    compile::<server::StartFightRequest>(),
                    compile::<server::StartFightResponse>(),
                ),
            };
            registry.register(
                payload_schema(
                    Catalog::Server,
                    MessageKind::Request,
                    kind.as_str(),
                ),
                request,
            );
            registry.register(
                payload_schema(
                    Catalog::Server,
                    MessageKind::Response,
                    kind.as_str(),
                ),
                response,
            );
        }
        for kind in server::ServerEventKind::ALL {
            let check = match kind {
                server::ServerEventKind::FightEnd => {
                    compile::<server::FightEndEvent>()
                }
            };
            registry.register(
                payload_schema(
                    Catalog::Server,
                    MessageKind::Event,
                    kind.as_str(),
                ),
                check,
            );
        }
        for kind in client::ClientRequestKind::ALL {
            let (request, response): (CheckFn, CheckFn) = match kind {
                client::ClientRequestKind::Handshake => (
                    compile::<client::HandshakeRequest>(),
                    compile::<client::HandshakeResponse>(),
                ),
            };
            registry.register(
                payload_schema(
                    Catalog::Client,
                    MessageKind::Request,
                    kind.as_str(),
                ),
                request,
            );
            registry.register(
                payload_schema(
                    Catalog::Client,
                    MessageKind::Response,
                    kind.as_str(),
                ),
                response,
            );
        }
        for kind in client::ClientEventKind::ALL {
            let check = match kind {
                client::ClientEventKind::Ready => {
                    compile::<client::ReadyEvent>()
                }
            };
            registry.register(
                payload_schema(
                    Catalog::Client,
                    MessageKind::Event,
                    kind.as_str(),
                ),
                check,
            );
        }

        registry
    }
}

static GLOBAL: Lazy<SchemaRegistry> =
    Lazy::new(SchemaRegistry::with_protocol_catalogs);

/// The process-wide registry, built once on first use.
pub fn global() -> &'static SchemaRegistry {
    &GLOBAL
}
