//! Catalog names: which side of the connection owns a conversation.

use serde::{Deserialize, Serialize};

use std::fmt;

/// The two direction-specific vocabularies of the protocol.
///
/// A catalog is named after the side that *initiates* its conversations:
/// the [`crate::server`] catalog holds server-initiated requests and
/// server-emitted events, the [`crate::client`] catalog the client-side
/// mirror. Responses and Pongs answer an existing conversation and are
/// validated under the initiator's catalog, whichever side they arrive on.
///
/// Both catalogs share the envelope shape but their type vocabularies are
/// disjoint: a `"Handshake"` request is meaningful only in the Client
/// catalog even though it serializes exactly like a Server request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Catalog {
    /// Server-initiated conversations (e.g. StartFight, FightEnd).
    Server,
    /// Client-initiated conversations (e.g. Handshake, Ready).
    Client,
}

impl Catalog {
    /// Both catalogs, in a fixed order. Used to build the validator table.
    pub const ALL: [Catalog; 2] = [Catalog::Server, Catalog::Client];

    /// The name used in schema keys, e.g. `"Client"` in
    /// `"Client.Request.Handshake"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Catalog::Server => "Server",
            Catalog::Client => "Client",
        }
    }

    /// The catalog owned by the other side of the connection.
    pub fn peer(&self) -> Catalog {
        match self {
            Catalog::Server => Catalog::Client,
            Catalog::Client => Catalog::Server,
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_peer_is_an_involution() {
        for catalog in Catalog::ALL {
            assert_eq!(catalog.peer().peer(), catalog);
        }
    }

    #[test]
    fn test_catalog_names() {
        assert_eq!(Catalog::Server.as_str(), "Server");
        assert_eq!(Catalog::Client.as_str(), "Client");
    }
}
