//! # Courier
//!
//! Client engine for the Courier protocol: a versioned request/response
//! wire format over WebSocket, for game backends talking to a world
//! server.
//!
//! The engine owns one connection and three guarantees:
//!
//! - every request resolves **exactly once** — with its Response or with
//!   a connection-lost error, never both, never twice;
//! - inbound messages are schema-validated before anything routes them;
//! - connection signals (Connected, Disconnected, Event) fan out through
//!   typed subscriptions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier::{Client, ClientConfig, HandshakeRequest};
//!
//! # async fn demo() -> Result<(), courier::ClientError> {
//! let client = Client::new(ClientConfig::new("ws://127.0.0.1:9000"));
//! client.run().await?;
//!
//! let mut events = client.subscribe_events();
//! client.handshake(HandshakeRequest { client_id: "abc".into() }).await?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("server says: {event:?}");
//! }
//! client.shutdown().await
//! # }
//! ```

mod client;
mod driver;
mod error;

pub use client::{Client, ClientConfig, Phase};
pub use error::ClientError;

// The layers below, for callers that need more than the engine surface.
pub use courier_protocol as protocol;
pub use courier_schema as schema;
pub use courier_transport as transport;

// The names most callers touch, re-exported flat.
pub use courier_protocol::client::{
    ClientRequest, HandshakeRequest, HandshakeResponse,
};
pub use courier_protocol::server::{FightEndEvent, ServerEvent};
pub use courier_protocol::{
    Fault, FaultCode, Message, MessageKind, Payload, ResponseOutcome,
    Version, VERSION,
};
pub use courier_transport::ReconnectPolicy;
