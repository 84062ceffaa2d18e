//! kifudb - game record storage and position search
//!
//! kifudb persists shogi game records (a header, one row per step, derived
//! position back-references and a duplicate-detection signature) in a
//! single-table key-value store, and answers point, range, recency and
//! same-position queries over them.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use kifudb::{CancellationToken, KifuDb, KifuDbConfig, MemoryStore};
//!
//! let db = KifuDb::new(Arc::new(MemoryStore::new()), KifuDbConfig::default(), tracing::Span::none())?;
//! let cancel = CancellationToken::new();
//!
//! let version = db.post(kifu, steps, None, &cancel).await?;
//! let matches = db.search("lnsgkgsnl/1r5b1/...", &[user_id], 3, &[], &cancel).await?;
//! ```
//!
//! # Architecture
//!
//! - `kifudb-core`: entities, key scheme, payload codec, errors
//! - `kifudb-storage`: the `KvStore` trait, `MemoryStore`, batch pipeline
//! - `kifudb-engine`: `KifuDb` facade, query planner, recency reader

pub use kifudb_core::{
    new_kifu_id, validate_id, Document, EntityKind, Error, FinishedStatus, Handicap, ItemKey,
    Kifu, Piece, Player, PlayerOrder, Pos, Position, PositionMatch, Result, Signature, Step,
    Timestamp, Version, Versioned, MAX_STEPS,
};
pub use kifudb_engine::{KifuDb, KifuDbConfig, QueryPlanner, RecencyReader, CONFIG_FILE_NAME};
pub use kifudb_storage::{KvStore, MemoryStore, MemoryStoreConfig, WorkQueue};

/// Cancellation handle accepted by every operation
pub use tokio_util::sync::CancellationToken;
