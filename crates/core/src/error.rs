//! Error types for kifudb
//!
//! Every layer (key scheme, codec, store, pipeline, facade) reports failures
//! through the single [`Error`] enum defined here.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Taxonomy
//!
//! | Variant | Meaning | Retry |
//! |---------|---------|-------|
//! | `Validation` | empty or malformed identifiers, caller's fault | no |
//! | `NotFound` | the addressed header/record is absent | no |
//! | `Lock` | optimistic version mismatch | re-read, then retry |
//! | `Decode` | payload unreadable (corruption or schema drift) | never |
//! | `Canceled` | unwound by the caller's cancellation token | caller decides |
//! | `Store` | transport/backend failure | at caller's discretion |
//! | `Internal` | a worker task panicked or was aborted | no |

use thiserror::Error;

/// Result type alias for kifudb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for kifudb
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Empty or malformed identifiers
    #[error("Validation error: {0}")]
    Validation(String),

    /// Header or record is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Version mismatch on a conditional write or delete
    ///
    /// `expected` is the version the caller supplied (`None` = "must not exist"),
    /// `actual` is the version currently stored (`None` = absent).
    #[error("Optimistic lock error: expected {expected:?}, found {actual:?}")]
    Lock {
        /// Version supplied by the caller
        expected: Option<u64>,
        /// Version found in the store
        actual: Option<u64>,
    },

    /// Payload could not be decoded into a known document kind
    #[error("Decode error: {0}")]
    Decode(String),

    /// Operation aborted by cancellation
    #[error("Operation canceled")]
    Canceled,

    /// Backend or transport failure
    #[error("Store error: {0}")]
    Store(String),

    /// Worker task failure unrelated to the store
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Build a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Build a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    /// Build a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }

    /// Build an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// True for `Canceled`
    #[inline]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }

    /// True if the caller may retry the same call unchanged.
    ///
    /// Only backend failures qualify; the core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Store(_))
    }

    /// True for errors the caller can correct (bad input, stale version).
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Lock { .. })
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Decode(e.to_string())
    }
}
