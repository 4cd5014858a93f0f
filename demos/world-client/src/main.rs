//! Minimal world-server client: connect, handshake, watch events.
//!
//! ```text
//! cargo run -p world-client -- ws://127.0.0.1:9000
//! ```
//!
//! Set `RUST_LOG=courier=trace` to watch the wire traffic.

use std::time::Duration;

use courier::{Client, ClientConfig, HandshakeRequest};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:9000".to_string());

    let client = Client::new(ClientConfig::new(&url));
    let mut events = client.subscribe_events();
    let mut disconnected = client.subscribe_disconnected();

    client.run().await?;
    tracing::info!(url, "connected");

    let response = client
        .handshake(HandshakeRequest {
            client_id: format!("demo-{}", std::process::id()),
        })
        .await?;
    tracing::info!(?response, "handshake accepted");

    let mut keepalive = tokio::time::interval(Duration::from_secs(10));
    keepalive.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => tracing::info!(?event, "server event"),
                Err(_) => break,
            },
            _ = disconnected.recv() => {
                tracing::warn!("connection lost, transport is redialing");
            }
            _ = keepalive.tick() => {
                if client.is_connected() {
                    let _ = client.ping().await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    if client.is_connected() {
        client.shutdown().await?;
    }
    Ok(())
}
