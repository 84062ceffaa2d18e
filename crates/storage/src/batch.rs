//! Batch write/delete/get pipeline
//!
//! Splits an arbitrary-length list into store-sized chunks and runs one store
//! call per chunk on a [`WorkQueue`]. Without error, `N` entries take exactly
//! `ceil(N / B)` store calls, where `B` is the smaller of the configured chunk
//! size and the store's own limit.
//!
//! Once any call fails the outcome is all-or-unknown: some chunks may have
//! been applied, and the caller cannot tell which.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use kifudb_core::{ItemKey, Result};

use crate::item::{Item, WriteItem};
use crate::pipeline::{WorkQueue, DEFAULT_PARALLELISM};
use crate::traits::KvStore;

/// Chunking and parallelism of one batch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Concurrent store calls
    pub parallelism: usize,
    /// Entries per store call, capped by the store's own limit
    pub chunk_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            chunk_size: usize::MAX,
        }
    }
}

impl BatchOptions {
    /// Options with the given parallelism and chunk size
    pub fn new(parallelism: usize, chunk_size: usize) -> Self {
        Self {
            parallelism,
            chunk_size,
        }
    }

    fn effective_chunk(&self, store_limit: usize) -> usize {
        self.chunk_size.min(store_limit).max(1)
    }
}

/// Split `items` into consecutive chunks of at most `size` entries
pub fn chunk<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}

/// Write every item, one `batch_put` per chunk
pub async fn batch_write(
    store: &Arc<dyn KvStore>,
    items: Vec<WriteItem>,
    opts: BatchOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let chunks = chunk(items, opts.effective_chunk(store.max_batch_write()));
    let store = Arc::clone(store);
    WorkQueue::new(opts.parallelism)
        .run(chunks, cancel, move |chunk, _| {
            let store = Arc::clone(&store);
            async move { store.batch_put(chunk).await }
        })
        .await
        .map(|_| ())
}

/// Delete every key, one `batch_delete` per chunk
pub async fn batch_delete(
    store: &Arc<dyn KvStore>,
    keys: Vec<ItemKey>,
    opts: BatchOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let chunks = chunk(keys, opts.effective_chunk(store.max_batch_write()));
    let store = Arc::clone(store);
    WorkQueue::new(opts.parallelism)
        .run(chunks, cancel, move |chunk, _| {
            let store = Arc::clone(&store);
            async move { store.batch_delete(chunk).await }
        })
        .await
        .map(|_| ())
}

/// Read every key, one `batch_get` per chunk
///
/// Absent keys are omitted. Result order is unspecified.
pub async fn batch_get(
    store: &Arc<dyn KvStore>,
    keys: Vec<ItemKey>,
    opts: BatchOptions,
    cancel: &CancellationToken,
) -> Result<Vec<Item>> {
    let chunks = chunk(keys, opts.effective_chunk(store.max_batch_get()));
    let store = Arc::clone(store);
    let pages = WorkQueue::new(opts.parallelism)
        .run(chunks, cancel, move |chunk, _| {
            let store = Arc::clone(&store);
            async move { store.batch_get(&chunk).await }
        })
        .await?;
    Ok(pages.into_iter().flatten().collect())
}
