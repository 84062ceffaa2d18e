//! Contract types for API stability
//!
//! These types define what every read returns and every write requires:
//!
//! - `versioned`: Generic versioned wrapper returned by reads
//! - `version`: Per-item version used for optimistic concurrency
//! - `timestamp`: Microsecond write times
//!
//! ## Usage
//!
//! ```
//! use kifudb_core::contract::{Timestamp, Version, Versioned};
//! ```

pub mod timestamp;
pub mod version;
pub mod versioned;

// Re-exports
pub use timestamp::Timestamp;
pub use version::Version;
pub use versioned::Versioned;
