//! The driver: a task that owns one connection end to end.
//!
//! Exactly one driver task exists per live connection. It is the single
//! execution context for everything stateful — the pending-request table
//! is a plain `HashMap` with no lock, because only this task ever touches
//! it. The [`Client`](crate::Client) handle talks to the driver through a
//! command channel and gets answers back on oneshot channels, so a caller
//! never completes synchronously: submit now, resolve later.
//!
//! Completion discipline for pending requests:
//!
//! - a matching Response removes the entry and completes the caller,
//! - a disconnect drains every entry with [`ClientError::ConnectionLost`]
//!   and leaves the table empty,
//! - oneshot channels make double-completion unrepresentable: once an
//!   entry's sender is consumed, the entry is gone.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use courier_protocol::server::ServerEvent;
use courier_protocol::{wire, Message, MessageKind, Payload, ResponseOutcome};
use courier_schema::{Dispatch, ValidateError};
use courier_transport::{Link, LinkEvent};

use crate::{ClientError, Phase};

/// Completion channel for one pending request.
pub(crate) type RequestReply =
    oneshot::Sender<Result<Payload, ClientError>>;

/// Commands the client handle sends to its driver.
pub(crate) enum DriverCommand {
    /// Register the request as pending and transmit it.
    Request {
        message: Message,
        reply: RequestReply,
    },

    /// Fire-and-forget keepalive.
    Ping,

    /// Close the connection; reply fires once the transport confirms
    /// the disconnect and the pending table is drained.
    Shutdown { reply: oneshot::Sender<()> },
}

/// Signal fan-out shared between the handle and its drivers.
#[derive(Clone)]
pub(crate) struct Signals {
    pub(crate) connected: broadcast::Sender<()>,
    pub(crate) disconnected: broadcast::Sender<()>,
    pub(crate) events: broadcast::Sender<ServerEvent>,
}

pub(crate) struct Driver<L: Link> {
    link: L,
    dispatch: Dispatch,
    pending: HashMap<String, RequestReply>,
    commands: mpsc::UnboundedReceiver<DriverCommand>,
    events: mpsc::Receiver<LinkEvent>,
    phase: Arc<watch::Sender<Phase>>,
    signals: Signals,
    reconnect_enabled: bool,
    /// Present while a shutdown waits for the transport's disconnect.
    shutdown_reply: Option<oneshot::Sender<()>>,
    /// Whether the link is currently up. The driver starts on a freshly
    /// dialed link, so this starts true.
    connected: bool,
}

impl<L: Link> Driver<L> {
    /// Spawns a driver task for a freshly dialed link and returns its
    /// command channel.
    pub(crate) fn spawn(
        link: L,
        events: mpsc::Receiver<LinkEvent>,
        phase: Arc<watch::Sender<Phase>>,
        signals: Signals,
        reconnect_enabled: bool,
    ) -> mpsc::UnboundedSender<DriverCommand> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let driver = Driver {
            link,
            dispatch: Dispatch::client(),
            pending: HashMap::new(),
            commands: cmd_rx,
            events,
            phase,
            signals,
            reconnect_enabled,
            shutdown_reply: None,
            connected: true,
        };
        tokio::spawn(driver.run());
        cmd_tx
    }

    async fn run(mut self) {
        tracing::debug!("driver started");
        let mut commands_open = true;

        loop {
            tokio::select! {
                cmd = self.commands.recv(), if commands_open => match cmd {
                    Some(DriverCommand::Request { message, reply }) => {
                        self.handle_request(message, reply).await;
                    }
                    Some(DriverCommand::Ping) => self.handle_ping().await,
                    Some(DriverCommand::Shutdown { reply }) => {
                        self.phase.send_replace(Phase::Closing);
                        self.shutdown_reply = Some(reply);
                        let _ = self.link.close().await;
                    }
                    None => {
                        // Every handle is gone; wind the link down. The
                        // loop ends when the transport confirms.
                        commands_open = false;
                        let _ = self.link.close().await;
                    }
                },
                event = self.events.recv() => match event {
                    Some(LinkEvent::Message(frame)) => {
                        self.handle_frame(&frame);
                    }
                    Some(LinkEvent::Connected) => {
                        self.connected = true;
                        self.phase.send_replace(Phase::Connected);
                        let _ = self.signals.connected.send(());
                        tracing::info!("reconnected");
                    }
                    Some(LinkEvent::ConnectFailed(e)) => {
                        tracing::warn!(error = %e, "reconnect attempt failed");
                    }
                    Some(LinkEvent::Disconnected) => {
                        if self.on_disconnected() {
                            break;
                        }
                    }
                    None => {
                        self.finalize();
                        break;
                    }
                }
            }
        }

        tracing::debug!("driver stopped");
    }

    // -- outbound ---------------------------------------------------------

    async fn handle_request(
        &mut self,
        message: Message,
        reply: RequestReply,
    ) {
        if !self.connected {
            let _ = reply.send(Err(ClientError::NotConnected));
            return;
        }

        let frame = match wire::encode(&message) {
            Ok(frame) => frame,
            Err(e) => {
                let _ = reply.send(Err(e.into()));
                return;
            }
        };

        if !message.kind.is_keepalive() {
            tracing::trace!(
                frame = %String::from_utf8_lossy(&frame),
                "send"
            );
        }

        // Register before transmitting so a fast Response can never
        // beat the table entry.
        let id = message.id;
        self.pending.insert(id.clone(), reply);
        if let Err(e) = self.link.send(&frame).await {
            if let Some(reply) = self.pending.remove(&id) {
                let _ = reply.send(Err(e.into()));
            }
        }
    }

    async fn handle_ping(&mut self) {
        if !self.connected {
            return;
        }
        let message = Message::ping();
        match wire::encode(&message) {
            Ok(frame) => {
                if let Err(e) = self.link.send(&frame).await {
                    tracing::debug!(error = %e, "ping not sent");
                }
            }
            Err(e) => tracing::debug!(error = %e, "ping not encoded"),
        }
    }

    // -- inbound ----------------------------------------------------------

    fn handle_frame(&mut self, frame: &[u8]) {
        let value = match wire::parse(frame) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unparseable frame");
                return;
            }
        };

        let message = match self.dispatch.validate_envelope(&value) {
            Ok(message) => message,
            Err(e) => {
                log_validation_failure(&e, &value);
                return;
            }
        };

        if !message.kind.is_keepalive() {
            tracing::trace!(
                frame = %String::from_utf8_lossy(frame),
                "receive"
            );
        }

        if let Err(e) = self.dispatch.validate_body(&message) {
            log_validation_failure(&e, &value);
            return;
        }

        match message.kind {
            MessageKind::Response => self.handle_response(&message),
            MessageKind::Event => self.handle_event(&message),
            MessageKind::Pong => self.handle_pong(&message),
            MessageKind::Request | MessageKind::Ping => {
                tracing::warn!(
                    kind = %message.kind,
                    id = %message.id,
                    "client does not serve peer-initiated conversations, \
                     dropping"
                );
            }
        }
    }

    fn handle_response(&mut self, message: &Message) {
        let body = match message.response_body() {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable response");
                return;
            }
        };

        match self.pending.remove(&body.request_id) {
            Some(reply) => {
                let result = match body.outcome {
                    ResponseOutcome::Success(payload) => Ok(payload),
                    ResponseOutcome::Failure(fault) => {
                        Err(ClientError::Rejected(fault))
                    }
                };
                let _ = reply.send(result);
            }
            None => {
                // Stale, duplicate, or foreign. No side effect beyond
                // the log line.
                tracing::warn!(
                    request_id = %body.request_id,
                    "no pending request for response, dropping"
                );
            }
        }
    }

    fn handle_event(&mut self, message: &Message) {
        let body = match message.event_body() {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable event");
                return;
            }
        };
        match ServerEvent::from_body(body) {
            // Nobody listening is fine; the error just means zero
            // receivers.
            Ok(event) => {
                let _ = self.signals.events.send(event);
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping unroutable event");
            }
        }
    }

    fn handle_pong(&mut self, message: &Message) {
        // Liveness only; the ping id is not correlated with anything.
        match message.pong_body() {
            Ok(body) => {
                tracing::debug!(ping_id = %body.ping_id, "pong received");
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable pong");
            }
        }
    }

    // -- lifecycle --------------------------------------------------------

    /// Handles a transport disconnect. Returns true when the driver is
    /// done (shutdown confirmed or no redial coming).
    fn on_disconnected(&mut self) -> bool {
        self.connected = false;
        self.fail_all_pending();

        let shutdown_reply = self.shutdown_reply.take();
        let done = shutdown_reply.is_some() || !self.reconnect_enabled;
        if done {
            self.phase.send_replace(Phase::Idle);
        } else {
            // The transport is redialing; stay alive and wait for its
            // Connected event.
            self.phase.send_replace(Phase::Connecting);
        }

        // Phase settles before the signal fires, so a subscriber woken
        // by the signal observes the new phase.
        let _ = self.signals.disconnected.send(());
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
        done
    }

    /// The transport wound down entirely (event channel closed). Make
    /// sure every caller hears about it exactly once.
    fn finalize(&mut self) {
        let was_connected = self.connected;
        self.connected = false;
        self.fail_all_pending();
        self.phase.send_replace(Phase::Idle);
        if was_connected {
            let _ = self.signals.disconnected.send(());
        }
        if let Some(reply) = self.shutdown_reply.take() {
            let _ = reply.send(());
        }
    }

    /// Completes every pending request with a connection-lost error and
    /// clears the table in the same step.
    fn fail_all_pending(&mut self) {
        if !self.pending.is_empty() {
            tracing::info!(
                count = self.pending.len(),
                "failing pending requests after disconnect"
            );
        }
        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(ClientError::ConnectionLost));
        }
    }
}

fn log_validation_failure(
    error: &ValidateError,
    value: &serde_json::Value,
) {
    if error.is_catalog_defect() {
        tracing::error!(
            error = %error,
            message = %value,
            "catalog defect, dropping message"
        );
    } else {
        tracing::warn!(
            error = %error,
            message = %value,
            "validation failed, dropping message"
        );
    }
}
