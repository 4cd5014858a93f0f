//! Unified error type for the connection engine.

use courier_protocol::{Fault, ProtocolError};
use courier_transport::TransportError;

/// Everything that can go wrong between a caller and the engine.
///
/// Sub-layer errors pass through transparently via `#[from]`, so `?`
/// converts them automatically. The engine-local variants cover lifecycle
/// misuse and connection loss; [`Rejected`](Self::Rejected) is the one
/// variant that carries a *protocol-level* failure — the peer answered,
/// but with a fault.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A request was attempted outside the Connected phase.
    #[error("not connected")]
    NotConnected,

    /// Shutdown was requested while no connection exists.
    #[error("client is not running")]
    NotRunning,

    /// Run was requested while a connection already exists.
    #[error("client is already running")]
    AlreadyRunning,

    /// The connection dropped while the request was outstanding.
    ///
    /// Every pending request receives this uniformly at disconnect time;
    /// none are replayed after a reconnect.
    #[error("connection lost")]
    ConnectionLost,

    /// The peer answered the request with a protocol fault.
    #[error("request rejected: {0}")]
    Rejected(Fault),

    /// A transport-level error (dial, send, link state).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid payload).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_protocol::FaultCode;

    #[test]
    fn test_from_transport_error() {
        let err: ClientError = TransportError::SendFailed.into();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(err.to_string().contains("send failed"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: ClientError =
            ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_rejected_carries_the_fault() {
        let err = ClientError::Rejected(Fault::new(
            FaultCode::BadRequest,
            "unknown client",
        ));
        assert!(err.to_string().contains("unknown client"));
    }
}
