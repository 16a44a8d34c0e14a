//! Session identity
//!
//! Session ids are ULIDs: 48 bits of millisecond timestamp followed by 80
//! random bits, rendered as 26 Crockford base32 characters. Their string form
//! sorts in creation order.

use parking_lot::Mutex;
use std::fmt;
use ulid::{Generator, Ulid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(Ulid);

impl SessionId {
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }

    /// Creation time in milliseconds since the Unix epoch
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(SessionId)
    }
}

/// Produces strictly increasing session ids.
///
/// Ids generated within the same millisecond increment the random component
/// instead of drawing a new one, so ordering holds even under rapid rotation.
pub struct IdentityGenerator {
    generator: Mutex<Generator>,
}

impl IdentityGenerator {
    pub fn new() -> Self {
        Self {
            generator: Mutex::new(Generator::new()),
        }
    }

    pub fn next(&self) -> SessionId {
        match self.generator.lock().generate() {
            Ok(ulid) => SessionId(ulid),
            Err(e) => {
                // Random component exhausted within one millisecond
                tracing::warn!(error = %e, "Monotonic session id overflow, using fresh id");
                SessionId(Ulid::new())
            }
        }
    }
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}
