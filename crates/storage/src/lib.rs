//! Storage layer for kifudb
//!
//! This crate implements everything that talks to the key-value store:
//! - `KvStore`: the capability trait of a remote single-table store
//! - `MemoryStore`: BTreeMap-based in-process implementation with a recency index
//! - `PartitionScan`: paginated partition queries
//! - `WorkQueue`: bounded work queue + worker pool with first-error-wins join
//! - `batch_write` / `batch_delete` / `batch_get`: store-sized chunking on a `WorkQueue`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod item;
pub mod memory;
pub mod pipeline;
pub mod scan;
pub mod traits;

pub use batch::{batch_delete, batch_get, batch_write, chunk, BatchOptions};
pub use item::{Item, Page, SortKeyRange, WriteItem};
pub use memory::{MemoryStore, MemoryStoreConfig};
pub use pipeline::{WorkQueue, DEFAULT_PARALLELISM};
pub use scan::PartitionScan;
pub use traits::KvStore;
