//! Wire protocol for Courier.
//!
//! This crate defines the "language" that clients and servers speak:
//!
//! - **Envelope** ([`Message`], [`MessageKind`], the body types) — the
//!   versioned wrapper every wire value travels in.
//! - **Catalogs** ([`server`], [`client`]) — the two closed vocabularies
//!   of request and event types, one per direction of a connection, with
//!   factories that assemble well-formed envelopes from typed payloads.
//! - **Faults** ([`Fault`], [`FaultCode`]) — the protocol-level error
//!   object carried inside a failed Response.
//! - **Ids** ([`ids`]) — unique message identifiers.
//! - **Wire** ([`wire`]) — envelope bytes in and out.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw frames) and the
//! correlation engine (pending requests, connection state). It knows how
//! to build and read messages; it does not know about connections.
//!
//! ```text
//! Transport (frames) → Protocol (Message) → Engine (correlation)
//! ```

mod catalog;
mod envelope;
mod error;
mod fault;
mod version;

pub mod client;
pub mod ids;
pub mod server;
pub mod wire;

pub use catalog::Catalog;
pub use envelope::{
    from_payload, to_payload, EventBody, Message, MessageKind, Payload,
    PingBody, PongBody, RequestBody, ResponseBody, ResponseOutcome,
};
pub use error::ProtocolError;
pub use fault::{Fault, FaultCode};
pub use version::{Version, VERSION};
