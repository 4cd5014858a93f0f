//! The client handle: connection lifecycle and the request API.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch, Mutex};

use courier_protocol::client::{
    ClientRequest, HandshakeRequest, HandshakeResponse,
};
use courier_protocol::server::ServerEvent;
use courier_protocol::{from_payload, Payload};
use courier_transport::{Dialer, ReconnectPolicy, WebSocketDialer};

use crate::driver::{Driver, DriverCommand, Signals};
use crate::ClientError;

/// Where the engine is in its connection lifecycle.
///
/// ```text
/// Idle → Connecting → Connected → Closing → Idle
///              ↑___________|
///         (transport redial after an unplanned drop)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No connection and none being attempted.
    Idle,
    /// A dial (or redial) is in flight.
    Connecting,
    /// The link is up; requests may be sent.
    Connected,
    /// A shutdown is waiting for the transport to confirm the close.
    Closing,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "Idle",
            Phase::Connecting => "Connecting",
            Phase::Connected => "Connected",
            Phase::Closing => "Closing",
        };
        f.write_str(name)
    }
}

/// Configuration for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the world server, e.g. `ws://127.0.0.1:9000`.
    pub url: String,

    /// What the transport should do after an unplanned drop.
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    /// A config with the default reconnect policy (enabled, 3 s delay).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// One client-side connection to a world server.
///
/// The handle is shareable (`&self` everywhere); the stateful work
/// happens in a driver task spawned by [`run`](Self::run). Signals fan
/// out through the typed subscription methods — one channel per signal
/// kind, no string-keyed event bus.
pub struct Client {
    config: ClientConfig,
    dialer: WebSocketDialer,
    phase_tx: Arc<watch::Sender<Phase>>,
    phase_rx: watch::Receiver<Phase>,
    /// Command channel of the active driver, if any. The mutex
    /// serializes run/shutdown against each other (run holds it across
    /// the dial on purpose, so a concurrent shutdown cannot interleave
    /// with connection establishment).
    active: Mutex<Option<mpsc::UnboundedSender<DriverCommand>>>,
    signals: Signals,
}

impl Client {
    /// Creates an idle client. Nothing touches the network until
    /// [`run`](Self::run).
    pub fn new(config: ClientConfig) -> Self {
        let (phase_tx, phase_rx) = watch::channel(Phase::Idle);
        let (connected, _) = broadcast::channel(16);
        let (disconnected, _) = broadcast::channel(16);
        let (events, _) = broadcast::channel(64);
        Self {
            config,
            dialer: WebSocketDialer,
            phase_tx: Arc::new(phase_tx),
            phase_rx,
            active: Mutex::new(None),
            signals: Signals {
                connected,
                disconnected,
                events,
            },
        }
    }

    // -- lifecycle --------------------------------------------------------

    /// Connects to the configured server.
    ///
    /// On success the engine is Connected, a driver task owns the link,
    /// and the Connected signal has fired. On failure the engine reverts
    /// to Idle and the error surfaces here — the engine never enters
    /// Connected on a failed attempt.
    ///
    /// # Errors
    /// [`ClientError::AlreadyRunning`] when not Idle;
    /// [`ClientError::Transport`] when the dial fails.
    pub async fn run(&self) -> Result<(), ClientError> {
        let mut active = self.active.lock().await;
        if self.phase() != Phase::Idle {
            return Err(ClientError::AlreadyRunning);
        }

        self.phase_tx.send_replace(Phase::Connecting);
        match self
            .dialer
            .dial(&self.config.url, self.config.reconnect)
            .await
        {
            Ok((link, events)) => {
                // Phase first, then the driver: if the link drops the
                // instant it is up, the driver's Connecting/Idle
                // transition must not be overwritten by this one.
                self.phase_tx.send_replace(Phase::Connected);
                let commands = Driver::spawn(
                    link,
                    events,
                    self.phase_tx.clone(),
                    self.signals.clone(),
                    self.config.reconnect.enabled,
                );
                *active = Some(commands);
                let _ = self.signals.connected.send(());
                Ok(())
            }
            Err(e) => {
                self.phase_tx.send_replace(Phase::Idle);
                Err(e.into())
            }
        }
    }

    /// Closes the connection: fails every pending request, waits for
    /// the transport's disconnect confirmation, returns to Idle.
    ///
    /// # Errors
    /// [`ClientError::NotRunning`] when no connection exists (Idle or
    /// already Closing).
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        let mut active = self.active.lock().await;
        match self.phase() {
            // A redial wait still counts as "a connection exists".
            Phase::Connected | Phase::Connecting => {}
            Phase::Idle | Phase::Closing => {
                return Err(ClientError::NotRunning);
            }
        }
        let commands = active.take().ok_or(ClientError::NotRunning)?;

        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        commands
            .send(DriverCommand::Shutdown { reply: reply_tx })
            .map_err(|_| ClientError::NotRunning)?;
        reply_rx.await.map_err(|_| ClientError::NotRunning)
    }

    /// The engine's current lifecycle phase.
    pub fn phase(&self) -> Phase {
        *self.phase_rx.borrow()
    }

    /// True while requests may be sent.
    pub fn is_connected(&self) -> bool {
        self.phase() == Phase::Connected
    }

    // -- requests ---------------------------------------------------------

    /// Sends a request and resolves when its Response arrives or the
    /// connection is lost — whichever happens first, exactly once.
    ///
    /// There is no request timeout: absent a disconnect, a request whose
    /// Response never arrives waits forever. Callers that want a bound
    /// wrap this in `tokio::time::timeout`.
    ///
    /// # Errors
    /// [`ClientError::NotConnected`] outside the Connected phase;
    /// [`ClientError::Rejected`] when the peer answers with a fault;
    /// [`ClientError::ConnectionLost`] when the link drops first.
    pub async fn request(
        &self,
        request: ClientRequest,
    ) -> Result<Payload, ClientError> {
        let commands = {
            let active = self.active.lock().await;
            if self.phase() != Phase::Connected {
                return Err(ClientError::NotConnected);
            }
            active.clone().ok_or(ClientError::NotConnected)?
        };

        let message = request.into_message()?;
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        commands
            .send(DriverCommand::Request {
                message,
                reply: reply_tx,
            })
            .map_err(|_| ClientError::NotConnected)?;
        reply_rx.await.map_err(|_| ClientError::ConnectionLost)?
    }

    /// Typed wrapper for the Handshake request.
    ///
    /// # Errors
    /// As [`request`](Self::request), plus [`ClientError::Protocol`] if
    /// the success payload does not decode as a handshake response.
    pub async fn handshake(
        &self,
        request: HandshakeRequest,
    ) -> Result<HandshakeResponse, ClientError> {
        let payload =
            self.request(ClientRequest::Handshake(request)).await?;
        Ok(from_payload(payload)?)
    }

    /// Sends a fire-and-forget keepalive Ping.
    ///
    /// # Errors
    /// [`ClientError::NotConnected`] outside the Connected phase.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let active = self.active.lock().await;
        if self.phase() != Phase::Connected {
            return Err(ClientError::NotConnected);
        }
        let commands = active.as_ref().ok_or(ClientError::NotConnected)?;
        commands
            .send(DriverCommand::Ping)
            .map_err(|_| ClientError::NotConnected)
    }

    // -- subscriptions ----------------------------------------------------

    /// Fires on every successful connect, initial and re-established.
    pub fn subscribe_connected(&self) -> broadcast::Receiver<()> {
        self.signals.connected.subscribe()
    }

    /// Fires on every disconnect, planned or not.
    pub fn subscribe_disconnected(&self) -> broadcast::Receiver<()> {
        self.signals.disconnected.subscribe()
    }

    /// Fires for every validated server event, fanned out to all
    /// subscribers.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ServerEvent> {
        self.signals.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_reconnect_policy() {
        let config = ClientConfig::new("ws://127.0.0.1:9000");
        assert!(config.reconnect.enabled);
        assert_eq!(
            config.reconnect.retry_delay,
            std::time::Duration::from_secs(3)
        );
    }

    #[test]
    fn test_new_client_starts_idle() {
        let client = Client::new(ClientConfig::new("ws://127.0.0.1:9000"));
        assert_eq!(client.phase(), Phase::Idle);
        assert!(!client.is_connected());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Connecting.to_string(), "Connecting");
        assert_eq!(Phase::Idle.to_string(), "Idle");
    }

    #[tokio::test]
    async fn test_subscriptions_work_before_run() {
        let client = Client::new(ClientConfig::new("ws://127.0.0.1:9000"));
        let mut events = client.subscribe_events();
        let mut connected = client.subscribe_connected();
        assert!(events.try_recv().is_err());
        assert!(connected.try_recv().is_err());
    }
}
