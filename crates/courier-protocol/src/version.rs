//! Protocol version and the compatibility rule.

use serde::{Deserialize, Serialize};

use std::fmt;

/// The protocol version this build speaks.
pub const VERSION: Version = Version { major: 1, minor: 0 };

/// A protocol version, carried by every [`crate::Message`].
///
/// Two versions are compatible iff their `major` components are equal.
/// `minor` bumps cover additive changes (new catalog entries, new optional
/// fields) that an older peer can safely ignore, so they are never a reason
/// to reject a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Incremented on breaking wire changes.
    pub major: u32,
    /// Incremented on additive changes.
    pub minor: u32,
}

impl Version {
    /// Builds a version. `const` so it can back [`VERSION`].
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The compatibility rule: majors must match, minors are ignored.
    pub fn compatible(&self, other: &Version) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
