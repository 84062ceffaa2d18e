//! Version identifier type
//!
//! Every stored item carries a version. Versions drive optimistic
//! concurrency: a write either creates an item (no expected version) or names
//! the version it read, and the store rejects the write if they differ.
//!
//! ## Numbering
//!
//! - The first write of an item produces `Version(1)`
//! - Every accepted conditional write produces `previous.next()`
//! - Versions are only meaningful per item; they are never compared across items

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-item mutation counter
///
/// ## Invariants
///
/// - Versions are monotonically increasing within an item
/// - `Version(0)` is never assigned to a stored item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// The version assigned by the first write of an item
    pub const INITIAL: Version = Version(1);

    /// Create a version from its numeric value
    #[inline]
    pub const fn new(n: u64) -> Self {
        Version(n)
    }

    /// Get the numeric value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The version produced by the next accepted write
    #[inline]
    pub const fn next(&self) -> Self {
        Version(self.0.saturating_add(1))
    }

    /// The version a write produces given the caller's expected version
    ///
    /// `None` (create) yields [`Version::INITIAL`].
    #[inline]
    pub fn successor(expected: Option<Version>) -> Self {
        expected.map(|v| v.next()).unwrap_or(Version::INITIAL)
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::INITIAL
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(n: u64) -> Self {
        Version(n)
    }
}

impl From<Version> for u64 {
    fn from(v: Version) -> Self {
        v.0
    }
}
