//! Query engine for kifudb
//!
//! This crate sits on top of `kifudb-storage` and provides:
//! - `KifuDb`: the storage facade (post, get, search, delete, ...)
//! - `KifuDbConfig`: tunables, loadable from `kifudb.toml`
//! - `QueryPlanner`: step range reads and the same-position search fan-out
//! - `RecencyReader`: most recently written headers via a secondary index
//! - Row derivation: the position and signature rows a record produces
//!
//! The engine never talks to a transport; it drives whatever `KvStore` it is
//! given.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod planner;
pub mod position;
pub mod recent;

pub use database::{KifuDb, KifuDbConfig, CONFIG_FILE_NAME};
pub use planner::QueryPlanner;
pub use position::{derive_positions, derive_signature, orphaned_keys, RecordRows};
pub use recent::RecencyReader;
