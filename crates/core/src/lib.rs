//! Core types for kifudb
//!
//! This crate defines the foundational types used throughout the system:
//! - Contract types: `Version`, `Versioned<T>`, `Timestamp`
//! - Entities: `Kifu`, `Step`, `Position`, `Signature`
//! - `Document`: closed variant over all stored entities, plus the payload codec
//! - Key scheme: `ItemKey`, `EntityKind` and the per-kind key builders
//! - Error: the single error taxonomy shared by every layer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod document;
pub mod error;
pub mod key;
pub mod types;

pub use contract::{Timestamp, Version, Versioned};
pub use document::Document;
pub use error::{Error, Result};
pub use key::{validate_id, EntityKind, ItemKey, MAX_STEPS, SEQ_WIDTH};
pub use types::{
    new_kifu_id, FinishedStatus, Handicap, Kifu, Piece, Player, PlayerOrder, Pos, Position,
    PositionMatch, Signature, Step,
};
