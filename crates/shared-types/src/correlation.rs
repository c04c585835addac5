//! Correlation identifiers.
//!
//! Ids are random decimal strings. They only need to be unique among the
//! requests currently pending on one node, so collisions are checked by the
//! owning table rather than prevented here.

use rand::Rng;
use std::fmt;

/// Token linking a request to its eventual response within one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Longest id whose space still fits in a `u64`.
    pub const MAX_DIGITS: usize = 18;

    /// Draw a fresh id of `digits` decimal characters (clamped to 1..=18).
    #[must_use]
    pub fn random(digits: usize) -> Self {
        Self::random_with(&mut rand::thread_rng(), digits)
    }

    /// Draw a fresh id from the supplied generator.
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R, digits: usize) -> Self {
        let digits = digits.clamp(1, Self::MAX_DIGITS);
        let token = (0..digits)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        Self(token)
    }

    /// Number of distinct ids of the given length.
    #[must_use]
    pub fn space(digits: usize) -> u64 {
        let exp = u32::try_from(digits.clamp(1, Self::MAX_DIGITS)).unwrap_or(18);
        10u64.pow(exp)
    }

    /// Parse an id from a wire frame. Empty or non-UTF-8 frames yield `None`.
    #[must_use]
    pub fn from_frame(frame: &[u8]) -> Option<Self> {
        std::str::from_utf8(frame)
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
