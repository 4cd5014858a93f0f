//! Integration tests for the connection engine.
//!
//! A mock world server speaking the protocol runs on a loopback port:
//! it answers Handshake requests, replies to Pings with Pongs, and can
//! be configured to misbehave (stay silent, drop connections, send
//! stale or wrong-version messages) to exercise the engine's failure
//! paths.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use courier::protocol::client as client_catalog;
use courier::protocol::server as server_catalog;
use courier::protocol::wire;
use courier::{
    Client, ClientConfig, ClientError, FightEndEvent, HandshakeRequest,
    HandshakeResponse, Message, MessageKind, Payload, Phase,
    ReconnectPolicy, ResponseOutcome, ServerEvent, Version,
};

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

// =========================================================================
// Mock world server
// =========================================================================

#[derive(Debug, Clone, Copy, Default)]
struct WorldBehavior {
    /// Answer requests with an empty success payload.
    answer_requests: bool,
    /// Send a response for a request id that was never issued before
    /// each real response.
    stale_response_first: bool,
    /// Emit a FightEnd event after answering a handshake.
    emit_fight_end: bool,
    /// Send a wrong-major copy of the event before the real one.
    wrong_version_event_first: bool,
    /// Drop the connection after receiving this many requests.
    drop_after_requests: Option<usize>,
    /// Drop the first accepted connection immediately (reconnect tests).
    drop_first_connection: bool,
}

impl WorldBehavior {
    fn answering() -> Self {
        Self {
            answer_requests: true,
            ..Self::default()
        }
    }
}

/// Spawns the mock server and returns its ws:// url. The server accepts
/// connections until the test ends.
async fn spawn_world(behavior: WorldBehavior) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let url = format!("ws://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let mut first = true;
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let Ok(ws) = tokio_tungstenite::accept_async(stream).await
            else {
                continue;
            };
            if behavior.drop_first_connection && first {
                first = false;
                drop(ws);
                continue;
            }
            first = false;
            tokio::spawn(serve_connection(ws, behavior));
        }
    });

    url
}

async fn send_message(ws: &mut ServerWs, message: &Message) {
    let frame = wire::encode(message).expect("mock messages encode");
    ws.send(WsMessage::Binary(frame.into()))
        .await
        .expect("mock send");
}

async fn serve_connection(mut ws: ServerWs, behavior: WorldBehavior) {
    let mut requests_seen = 0usize;

    while let Some(Ok(frame)) = ws.next().await {
        let data = match frame {
            WsMessage::Binary(data) => data.to_vec(),
            WsMessage::Text(text) => text.as_bytes().to_vec(),
            WsMessage::Close(_) => break,
            _ => continue,
        };
        let value = wire::parse(&data).expect("client frames are JSON");
        let message: Message = serde_json::from_value(value)
            .expect("client frames are envelopes");

        match message.kind {
            MessageKind::Request => {
                requests_seen += 1;
                if let Some(limit) = behavior.drop_after_requests {
                    if requests_seen >= limit {
                        break;
                    }
                }
                if !behavior.answer_requests {
                    continue;
                }

                let body = message.request_body().unwrap();
                let kind = client_catalog::ClientRequestKind::from_name(
                    &body.type_name,
                )
                .expect("known request type");

                if behavior.stale_response_first {
                    let stale = client_catalog::response(
                        kind,
                        "never-issued",
                        ResponseOutcome::Success(Payload::new()),
                    );
                    send_message(&mut ws, &stale).await;
                }

                let response = client_catalog::response(
                    kind,
                    message.id.clone(),
                    ResponseOutcome::Success(Payload::new()),
                );
                send_message(&mut ws, &response).await;

                if behavior.emit_fight_end {
                    if behavior.wrong_version_event_first {
                        let mut doctored =
                            server_catalog::fight_end_event(
                                FightEndEvent {
                                    fight_id: "from-the-future".into(),
                                },
                            )
                            .unwrap();
                        doctored.version = Version::new(99, 0);
                        send_message(&mut ws, &doctored).await;
                    }
                    let event = server_catalog::fight_end_event(
                        FightEndEvent {
                            fight_id: "f-1".into(),
                        },
                    )
                    .unwrap();
                    send_message(&mut ws, &event).await;
                }
            }
            MessageKind::Ping => {
                let pong = Message::pong(message.id.clone());
                send_message(&mut ws, &pong).await;
            }
            _ => {}
        }
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn no_reconnect(url: &str) -> ClientConfig {
    ClientConfig {
        url: url.to_string(),
        reconnect: ReconnectPolicy::disabled(),
    }
}

fn fast_reconnect(url: &str) -> ClientConfig {
    ClientConfig {
        url: url.to_string(),
        reconnect: ReconnectPolicy {
            enabled: true,
            retry_delay: Duration::from_millis(50),
        },
    }
}

async fn recv_signal<T: Clone>(rx: &mut broadcast::Receiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for signal")
        .expect("signal channel closed")
}

// =========================================================================
// Happy path
// =========================================================================

#[tokio::test]
async fn test_handshake_resolves_with_empty_payload() {
    let url = spawn_world(WorldBehavior::answering()).await;
    let client = Client::new(no_reconnect(&url));

    client.run().await.expect("run");
    assert!(client.is_connected());

    let response = client
        .handshake(HandshakeRequest {
            client_id: "abc".into(),
        })
        .await
        .expect("handshake");
    assert_eq!(response, HandshakeResponse {});

    client.shutdown().await.expect("shutdown");
    assert_eq!(client.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_connected_signal_fires_on_run() {
    let url = spawn_world(WorldBehavior::answering()).await;
    let client = Client::new(no_reconnect(&url));
    let mut connected = client.subscribe_connected();

    client.run().await.expect("run");
    recv_signal(&mut connected).await;

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_ping_is_answered_and_connection_stays_up() {
    let url = spawn_world(WorldBehavior::answering()).await;
    let client = Client::new(no_reconnect(&url));
    client.run().await.expect("run");

    client.ping().await.expect("ping");

    // The pong is observed for liveness only; a request afterwards
    // still works on the same connection.
    client
        .handshake(HandshakeRequest {
            client_id: "after-ping".into(),
        })
        .await
        .expect("handshake after ping");

    client.shutdown().await.expect("shutdown");
}

// =========================================================================
// Lifecycle errors
// =========================================================================

#[tokio::test]
async fn test_request_while_idle_is_not_connected() {
    let client = Client::new(no_reconnect("ws://127.0.0.1:9"));
    let err = client
        .handshake(HandshakeRequest {
            client_id: "x".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
}

#[tokio::test]
async fn test_shutdown_while_idle_is_not_running() {
    let client = Client::new(no_reconnect("ws://127.0.0.1:9"));
    let err = client.shutdown().await.unwrap_err();
    assert!(matches!(err, ClientError::NotRunning));
}

#[tokio::test]
async fn test_run_twice_is_already_running() {
    let url = spawn_world(WorldBehavior::answering()).await;
    let client = Client::new(no_reconnect(&url));

    client.run().await.expect("first run");
    let err = client.run().await.unwrap_err();
    assert!(matches!(err, ClientError::AlreadyRunning));

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_run_shutdown_run_cycle() {
    let url = spawn_world(WorldBehavior::answering()).await;
    let client = Client::new(no_reconnect(&url));

    for cycle in 0..2 {
        client.run().await.expect("run");
        client
            .handshake(HandshakeRequest {
                client_id: format!("cycle-{cycle}"),
            })
            .await
            .expect("handshake");
        client.shutdown().await.expect("shutdown");
        assert_eq!(client.phase(), Phase::Idle);
    }
}

#[tokio::test]
async fn test_failed_dial_reverts_to_idle() {
    // Bind and drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = Client::new(no_reconnect(&url));
    let err = client.run().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(client.phase(), Phase::Idle);
}

// =========================================================================
// Correlation failure paths
// =========================================================================

#[tokio::test]
async fn test_disconnect_fails_all_pending_requests() {
    // The server swallows requests and drops the connection after the
    // third one arrives; nothing is ever answered.
    let url = spawn_world(WorldBehavior {
        answer_requests: false,
        drop_after_requests: Some(3),
        ..WorldBehavior::default()
    })
    .await;

    let client = Client::new(no_reconnect(&url));
    let mut disconnected = client.subscribe_disconnected();
    client.run().await.expect("run");

    let request = |id: &str| {
        client.handshake(HandshakeRequest {
            client_id: id.into(),
        })
    };
    let (a, b, c) =
        tokio::join!(request("a"), request("b"), request("c"));

    for result in [a, b, c] {
        assert!(
            matches!(result, Err(ClientError::ConnectionLost)),
            "expected ConnectionLost, got {result:?}"
        );
    }
    recv_signal(&mut disconnected).await;
    assert_eq!(client.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
    // The server answers every request twice: first with a requestId
    // that was never issued, then correctly. The stale one must be
    // dropped without touching the pending entry.
    let url = spawn_world(WorldBehavior {
        answer_requests: true,
        stale_response_first: true,
        ..WorldBehavior::default()
    })
    .await;

    let client = Client::new(no_reconnect(&url));
    client.run().await.expect("run");

    let response = client
        .handshake(HandshakeRequest {
            client_id: "abc".into(),
        })
        .await
        .expect("handshake despite stale response");
    assert_eq!(response, HandshakeResponse {});

    client.shutdown().await.expect("shutdown");
}

// =========================================================================
// Events
// =========================================================================

#[tokio::test]
async fn test_server_events_fan_out_to_subscribers() {
    let url = spawn_world(WorldBehavior {
        answer_requests: true,
        emit_fight_end: true,
        ..WorldBehavior::default()
    })
    .await;

    let client = Client::new(no_reconnect(&url));
    let mut events_a = client.subscribe_events();
    let mut events_b = client.subscribe_events();
    client.run().await.expect("run");

    client
        .handshake(HandshakeRequest {
            client_id: "abc".into(),
        })
        .await
        .expect("handshake");

    for events in [&mut events_a, &mut events_b] {
        let ServerEvent::FightEnd(event) = recv_signal(events).await;
        assert_eq!(event.fight_id, "f-1");
    }

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_wrong_version_message_is_dropped_before_dispatch() {
    // The server sends a wrong-major FightEnd before the real one.
    // Only the real one may reach subscribers.
    let url = spawn_world(WorldBehavior {
        answer_requests: true,
        emit_fight_end: true,
        wrong_version_event_first: true,
        ..WorldBehavior::default()
    })
    .await;

    let client = Client::new(no_reconnect(&url));
    let mut events = client.subscribe_events();
    client.run().await.expect("run");

    client
        .handshake(HandshakeRequest {
            client_id: "abc".into(),
        })
        .await
        .expect("handshake");

    let ServerEvent::FightEnd(event) = recv_signal(&mut events).await;
    assert_eq!(event.fight_id, "f-1", "wrong-version event leaked");

    client.shutdown().await.expect("shutdown");
}

// =========================================================================
// Reconnection
// =========================================================================

#[tokio::test]
async fn test_reconnect_returns_to_connected_and_resignals() {
    // First connection is dropped by the server immediately; the
    // transport redials and the second connection behaves.
    let url = spawn_world(WorldBehavior {
        answer_requests: true,
        drop_first_connection: true,
        ..WorldBehavior::default()
    })
    .await;

    let client = Client::new(fast_reconnect(&url));
    let mut connected = client.subscribe_connected();
    let mut disconnected = client.subscribe_disconnected();

    client.run().await.expect("run");
    recv_signal(&mut connected).await; // initial connect
    recv_signal(&mut disconnected).await; // server drop
    recv_signal(&mut connected).await; // re-established

    assert!(client.is_connected());
    client
        .handshake(HandshakeRequest {
            client_id: "back-again".into(),
        })
        .await
        .expect("handshake on the new connection");

    client.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_requests_lost_in_outage_are_failed_not_replayed() {
    // The server never answers and drops after the first request; with
    // reconnect enabled the engine comes back up, but the in-flight
    // request was already failed at disconnect time.
    let url = spawn_world(WorldBehavior {
        answer_requests: false,
        drop_after_requests: Some(1),
        drop_first_connection: false,
        ..WorldBehavior::default()
    })
    .await;

    let client = Client::new(fast_reconnect(&url));
    let mut connected = client.subscribe_connected();
    client.run().await.expect("run");
    recv_signal(&mut connected).await;

    let err = client
        .handshake(HandshakeRequest {
            client_id: "doomed".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ConnectionLost));

    // The engine recovers on its own.
    recv_signal(&mut connected).await;
    assert!(client.is_connected());

    client.shutdown().await.expect("shutdown");
}
