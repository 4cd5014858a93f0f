//! WebSocket dialer implementation using `tokio-tungstenite`.
//!
//! A dialed link is supervised by its own task: the supervisor owns the
//! WebSocket stream, pumps inbound frames onto the event channel, applies
//! send/close commands from the [`WebSocketLink`] handle, and runs the
//! redial loop after unplanned drops.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::{Dialer, Link, LinkEvent, ReconnectPolicy, TransportError};

/// Counter for numbering links in logs.
static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

enum LinkCommand {
    Send(Vec<u8>),
    Close,
}

/// A [`Dialer`] that speaks WebSocket.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketDialer;

impl Dialer for WebSocketDialer {
    type Link = WebSocketLink;

    async fn dial(
        &self,
        url: &str,
        policy: ReconnectPolicy,
    ) -> Result<(Self::Link, mpsc::Receiver<LinkEvent>), TransportError>
    {
        tracing::info!(url, "...connecting");
        let (ws, _) = connect_async(url).await.map_err(|e| {
            TransportError::ConnectFailed {
                url: url.to_string(),
                source: e,
            }
        })?;

        let link_id = NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed);
        tracing::info!(link_id, url, "connection established");

        let (event_tx, event_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(supervise(
            link_id,
            ws,
            url.to_string(),
            policy,
            cmd_rx,
            event_tx,
        ));

        Ok((WebSocketLink { commands: cmd_tx }, event_rx))
    }
}

/// Handle to one supervised WebSocket connection. Cheap to clone.
#[derive(Clone)]
pub struct WebSocketLink {
    commands: mpsc::UnboundedSender<LinkCommand>,
}

impl Link for WebSocketLink {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        self.commands
            .send(LinkCommand::Send(frame.to_vec()))
            .map_err(|_| TransportError::SendFailed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.commands
            .send(LinkCommand::Close)
            .map_err(|_| TransportError::ConnectionClosed)
    }
}

/// Owns the stream for the life of the link: pump, report the drop,
/// redial per policy, repeat.
async fn supervise(
    link_id: u64,
    mut ws: WsStream,
    url: String,
    policy: ReconnectPolicy,
    mut commands: mpsc::UnboundedReceiver<LinkCommand>,
    events: mpsc::Sender<LinkEvent>,
) {
    'link: loop {
        let closing = pump(&mut ws, &mut commands, &events).await;

        tracing::info!(link_id, url = %url, "connection closed");
        if events.send(LinkEvent::Disconnected).await.is_err() {
            break;
        }
        if closing || !policy.enabled {
            break;
        }

        // Redial until the link is back or somebody gives up.
        loop {
            tokio::time::sleep(policy.retry_delay).await;

            // A close issued during the outage ends the redial loop.
            match commands.try_recv() {
                Ok(LinkCommand::Close)
                | Err(mpsc::error::TryRecvError::Disconnected) => {
                    break 'link;
                }
                Ok(LinkCommand::Send(_)) => {
                    tracing::debug!(
                        link_id,
                        "dropping frame sent while disconnected"
                    );
                }
                Err(mpsc::error::TryRecvError::Empty) => {}
            }

            match connect_async(&url).await {
                Ok((new_ws, _)) => {
                    ws = new_ws;
                    tracing::info!(
                        link_id,
                        url = %url,
                        "connection re-established"
                    );
                    if events.send(LinkEvent::Connected).await.is_err() {
                        break 'link;
                    }
                    continue 'link;
                }
                Err(e) => {
                    tracing::warn!(
                        link_id,
                        url = %url,
                        error = %e,
                        "redial failed"
                    );
                    let err = TransportError::ConnectFailed {
                        url: url.clone(),
                        source: e,
                    };
                    if events
                        .send(LinkEvent::ConnectFailed(err))
                        .await
                        .is_err()
                    {
                        break 'link;
                    }
                }
            }
        }
    }

    tracing::debug!(link_id, "link supervisor stopped");
}

/// Drives one live connection until it drops.
///
/// Returns true when the drop was requested from our side (close command
/// or the handle going away), false for an unplanned drop.
async fn pump(
    ws: &mut WsStream,
    commands: &mut mpsc::UnboundedReceiver<LinkCommand>,
    events: &mpsc::Sender<LinkEvent>,
) -> bool {
    let mut closing = false;
    loop {
        tokio::select! {
            cmd = commands.recv(), if !closing => match cmd {
                Some(LinkCommand::Send(frame)) => {
                    if ws.send(Message::Binary(frame.into())).await.is_err() {
                        return closing;
                    }
                }
                Some(LinkCommand::Close) | None => {
                    // Keep draining the stream until the close handshake
                    // completes and the peer hangs up.
                    closing = true;
                    let _ = ws.close(None).await;
                }
            },
            msg = ws.next() => match msg {
                Some(Ok(Message::Binary(data))) => {
                    if events
                        .send(LinkEvent::Message(data.into()))
                        .await
                        .is_err()
                    {
                        return true;
                    }
                }
                Some(Ok(Message::Text(text))) => {
                    if events
                        .send(LinkEvent::Message(text.as_bytes().to_vec()))
                        .await
                        .is_err()
                    {
                        return true;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return closing,
                Some(Ok(_)) => {} // skip ws-level ping/pong/frame
                Some(Err(_)) => return closing,
            }
        }
    }
}
