//! Registry signatures for fast identity screening.
//!
//! A signature hashes the identity of a log registry:
//! - Level (case-insensitive)
//! - Marker names, in order
//! - Payload value
//! - Origin
//!
//! Equal identities always produce equal signatures. Different identities
//! almost always produce different ones, so history scans compare signatures
//! first and only fall back to full equality on a hit.

use crate::domain::level::Level;
use crate::domain::marker::Marker;
use crate::domain::origin::LogOrigin;
use crate::domain::payload::Payload;
use ahash::AHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Hash of a registry identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventSignature(u64);

impl EventSignature {
    /// Compute a signature from identity components.
    ///
    /// # Performance
    /// Runs on every `log()` call and uses the ahash algorithm. Markers hash
    /// their name only, matching their equality.
    pub fn new(
        level: &Level,
        markers: &[Marker],
        payload: Option<&Payload>,
        origin: Option<&LogOrigin>,
    ) -> Self {
        let mut hasher = AHasher::default();

        level.hash(&mut hasher);

        markers.len().hash(&mut hasher);
        for marker in markers {
            marker.hash(&mut hasher);
        }

        payload.hash(&mut hasher);
        origin.hash(&mut hasher);

        EventSignature(hasher.finish())
    }

    /// Signature of a bare level event.
    pub fn simple(level: &Level) -> Self {
        Self::new(level, &[], None, None)
    }

    /// Get the raw hash value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
