//! Generic versioned wrapper type
//!
//! Every read returns its entity wrapped in `Versioned<T>`; every write takes
//! the version the caller read and returns the version it created.
//!
//! ```text
//! fn get(&self, ...) -> Result<Versioned<T>>
//! fn post(&self, ..., expected: Option<Version>) -> Result<Version>
//! ```
//!
//! The version lives beside the entity, never inside its encoded payload.

use super::{Timestamp, Version};
use serde::{Deserialize, Serialize};

/// A value with the version and write time of the item it was read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// The actual value
    pub value: T,

    /// Version of the stored item
    pub version: Version,

    /// When the stored item was last written
    pub timestamp: Timestamp,
}

impl<T> Versioned<T> {
    /// Wrap a value with its version and write time
    pub fn new(value: T, version: Version, timestamp: Timestamp) -> Self {
        Versioned {
            value,
            version,
            timestamp,
        }
    }

    /// Map the inner value to a new type
    pub fn map<U, F>(self, f: F) -> Versioned<U>
    where
        F: FnOnce(T) -> U,
    {
        Versioned {
            value: f(self.value),
            version: self.version,
            timestamp: self.timestamp,
        }
    }

    /// Map the inner value with a fallible function, keeping version metadata
    pub fn try_map<U, E, F>(self, f: F) -> Result<Versioned<U>, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        Ok(Versioned {
            value: f(self.value)?,
            version: self.version,
            timestamp: self.timestamp,
        })
    }

    /// Get a reference to the inner value
    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consume and return the inner value
    #[inline]
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get the version
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get the write time
    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl<T> AsRef<T> for Versioned<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}
