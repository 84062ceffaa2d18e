//! The key-value store capability the engine is written against
//!
//! This trait is the boundary between kifudb and a remote single-table
//! store. Implementations own transport, retries and consistency; kifudb owns
//! keys, payloads, batching and fan-out.
//!
//! Thread safety: all methods must be safe to call concurrently from many
//! tasks (requires Send + Sync).

use async_trait::async_trait;

use kifudb_core::{ItemKey, Result, Version};

use crate::item::{Item, Page, SortKeyRange, WriteItem};

/// Remote single-table key-value store
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Largest number of keys accepted by [`KvStore::batch_get`]
    fn max_batch_get(&self) -> usize;

    /// Largest number of entries accepted by [`KvStore::batch_put`] and
    /// [`KvStore::batch_delete`]
    fn max_batch_write(&self) -> usize;

    /// Point read. `Ok(None)` if the item is absent.
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>>;

    /// Read many items in one call
    ///
    /// Absent keys are omitted. Result order is unspecified.
    ///
    /// # Errors
    ///
    /// `Validation` if more than `max_batch_get()` keys are passed.
    async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<Item>>;

    /// Conditional write
    ///
    /// With `expected == None` the item must not exist; otherwise the stored
    /// version must equal `expected`. Returns the version now stored.
    ///
    /// # Errors
    ///
    /// `Lock` on mismatch; the stored item is left unchanged.
    async fn put(&self, key: ItemKey, payload: Vec<u8>, expected: Option<Version>)
        -> Result<Version>;

    /// Unconditional write of many items, each stamped with its own version
    ///
    /// # Errors
    ///
    /// `Validation` if more than `max_batch_write()` items are passed.
    async fn batch_put(&self, items: Vec<WriteItem>) -> Result<()>;

    /// Delete one item
    ///
    /// With `expected == None` the delete is unconditional and absent items
    /// are ignored. Otherwise the item must exist with exactly that version.
    ///
    /// # Errors
    ///
    /// `NotFound` if `expected` is set and the item is absent,
    /// `Lock` on version mismatch.
    async fn delete(&self, key: &ItemKey, expected: Option<Version>) -> Result<()>;

    /// Unconditional delete of many items; absent keys are ignored
    ///
    /// # Errors
    ///
    /// `Validation` if more than `max_batch_write()` keys are passed.
    async fn batch_delete(&self, keys: Vec<ItemKey>) -> Result<()>;

    /// One page of a partition query, in ascending sort-key order
    ///
    /// `start_after` resumes after the `last_evaluated` of a previous page.
    /// `limit` caps the page size; the store may return fewer items.
    async fn query(
        &self,
        pk: &str,
        range: &SortKeyRange,
        start_after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Page>;

    /// Keys of partition `pk` from a secondary index ordered by last-write time
    ///
    /// # Errors
    ///
    /// `Store` if the index does not exist.
    async fn query_index(
        &self,
        index: &str,
        pk: &str,
        descending: bool,
        limit: usize,
    ) -> Result<Vec<ItemKey>>;
}
