//! Recency index reader
//!
//! Two steps: a keys-only query of the secondary index ordered by last
//! write, then chunked batch gets to resolve the headers. Results keep the
//! index order; headers deleted between the two steps are skipped.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use kifudb_core::key::kifu_partition;
use kifudb_core::{Document, ItemKey, Kifu, Result, Versioned};
use kifudb_storage::{batch_get, BatchOptions, Item, KvStore};

use crate::planner::cancellable;

/// Reorder `items` to follow `keys`, dropping keys with no item
///
/// A key listed more than once yields its item once per occurrence.
pub(crate) fn in_key_order(keys: &[ItemKey], items: Vec<Item>) -> Vec<Item> {
    let by_key: HashMap<ItemKey, Item> =
        items.into_iter().map(|item| (item.key.clone(), item)).collect();
    keys.iter().filter_map(|key| by_key.get(key).cloned()).collect()
}

/// Batch-get `keys` and decode the headers in key order
///
/// Each distinct key is read once; repeats in `keys` repeat in the result.
pub(crate) async fn get_kifus(
    store: &Arc<dyn KvStore>,
    keys: Vec<ItemKey>,
    opts: BatchOptions,
    cancel: &CancellationToken,
) -> Result<Vec<Versioned<Kifu>>> {
    let mut seen = BTreeSet::new();
    let distinct: Vec<ItemKey> = keys.iter().filter(|k| seen.insert(*k)).cloned().collect();
    let items = batch_get(store, distinct, opts, cancel).await?;
    in_key_order(&keys, items)
        .iter()
        .map(|item| item.decode()?.try_map(Document::into_kifu))
        .collect()
}

/// Reads the most recently written headers of an owner
#[derive(Clone)]
pub struct RecencyReader {
    store: Arc<dyn KvStore>,
    index: String,
    options: BatchOptions,
}

impl RecencyReader {
    /// Reader over secondary index `index`
    pub fn new(store: Arc<dyn KvStore>, index: impl Into<String>, options: BatchOptions) -> Self {
        Self {
            store,
            index: index.into(),
            options,
        }
    }

    /// Index this reader queries
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Up to `limit` headers of `user_id`, most recently written first
    pub async fn recent(
        &self,
        user_id: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Versioned<Kifu>>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let pk = kifu_partition(user_id);
        let keys = cancellable(
            cancel,
            self.store.query_index(&self.index, &pk, true, limit),
        )
        .await?;
        debug!(target: "kifudb::recent", index = %self.index, keys = keys.len(), "index read");

        get_kifus(&self.store, keys, self.options, cancel).await
    }
}
