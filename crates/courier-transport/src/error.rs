/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Establishing (or re-establishing) the connection failed.
    #[cfg(feature = "websocket")]
    #[error("connect to [{url}] failed: {source}")]
    ConnectFailed {
        /// The address that refused us.
        url: String,
        /// What the WebSocket layer reported.
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// A frame could not be handed to the link; the connection is gone.
    #[error("send failed: link is down")]
    SendFailed,

    /// The link was already closed.
    #[error("connection closed")]
    ConnectionClosed,
}
