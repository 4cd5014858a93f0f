//! Transport abstraction layer for Courier.
//!
//! Provides the [`Dialer`] and [`Link`] traits that abstract over the
//! client side of a message-oriented connection, plus the event stream
//! ([`LinkEvent`]) a live link reports through. The engine above this
//! layer never touches sockets; it sends opaque frames and reacts to
//! events.
//!
//! Reconnection lives *here*, not in the engine: a dialer is handed a
//! [`ReconnectPolicy`] and, when enabled, keeps redialing after an
//! unplanned drop. The engine only learns about the outcome through
//! `Disconnected` / `Connected` events.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket dialer via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketDialer, WebSocketLink};

use std::time::Duration;

use tokio::sync::mpsc;

/// How a dialer should behave after an unplanned connection drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Whether to redial at all. When false, the first drop is final.
    pub enabled: bool,

    /// How long to wait before each redial attempt.
    pub retry_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            retry_delay: Duration::from_secs(3),
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never redials.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Something that happened on a live link.
///
/// Delivered in order on the event channel returned by
/// [`Dialer::dial`]. The initial successful connect is *not* reported
/// here — `dial` returning `Ok` is that signal; `Connected` events mark
/// re-established links after a drop.
#[derive(Debug)]
pub enum LinkEvent {
    /// The link was re-established after an unplanned drop.
    Connected,

    /// One redial attempt failed; more will follow per the policy.
    ConnectFailed(TransportError),

    /// The link went down. Followed by redial traffic when the policy
    /// enables it, otherwise this is the last event.
    Disconnected,

    /// A frame arrived from the peer.
    Message(Vec<u8>),
}

/// Establishes outbound connections.
pub trait Dialer: Send + Sync + 'static {
    /// The link type produced by this dialer.
    type Link: Link;

    /// Dials the given address, awaiting the first connect attempt.
    ///
    /// On success returns the live link and the channel its events
    /// arrive on. On failure returns the error — no background retry is
    /// started for a dial that never succeeded.
    async fn dial(
        &self,
        url: &str,
        policy: ReconnectPolicy,
    ) -> Result<(Self::Link, mpsc::Receiver<LinkEvent>), TransportError>;
}

/// One live connection that can send frames to the remote peer.
pub trait Link: Send + Sync + 'static {
    /// Sends an opaque frame to the peer.
    fn send(
        &self,
        frame: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the link. This also stops any redial loop, so the next
    /// (and last) event is `Disconnected` — or nothing at all if the
    /// link was already down.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_policy_default_matches_contract() {
        let policy = ReconnectPolicy::default();
        assert!(policy.enabled);
        assert_eq!(policy.retry_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_reconnect_policy_disabled() {
        assert!(!ReconnectPolicy::disabled().enabled);
    }
}
