//! MemoryStore: in-process single-table store
//!
//! Implements [`KvStore`] using:
//! - `BTreeMap<pk, BTreeMap<sk, StoredItem>>` so partition scans come out in
//!   sort-key order
//! - `parking_lot::RwLock` for thread-safe access
//! - `AtomicU64` as a write clock, so every write gets a strictly increasing
//!   `updated_at` even when the system clock does not advance
//!
//! Batch and page limits mirror a remote store's, so callers exercise the
//! same chunking and pagination paths they would in production.
//!
//! # Secondary indexes
//!
//! Each configured index orders the items of a partition by `updated_at`.
//! Indexes are computed at query time from the primary data, so they are
//! always consistent with it.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use kifudb_core::{Error, ItemKey, Result, Timestamp, Version};

use crate::item::{Item, Page, SortKeyRange, WriteItem};
use crate::traits::KvStore;

/// Limits of a [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Keys per `batch_get` call
    pub max_batch_get: usize,
    /// Entries per `batch_put` / `batch_delete` call
    pub max_batch_write: usize,
    /// Largest page a query returns
    pub page_size: usize,
    /// Names of the secondary indexes served by `query_index`
    pub indexes: Vec<String>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_batch_get: 100,
            max_batch_write: 25,
            page_size: 100,
            indexes: vec!["recent".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
struct StoredItem {
    payload: Vec<u8>,
    version: Version,
    updated_at: Timestamp,
}

impl StoredItem {
    fn to_item(&self, pk: &str, sk: &str) -> Item {
        Item {
            key: ItemKey::new(pk, sk),
            payload: self.payload.clone(),
            version: self.version,
            updated_at: self.updated_at,
        }
    }
}

type Partitions = BTreeMap<String, BTreeMap<String, StoredItem>>;

/// In-memory implementation of the single-table store
#[derive(Debug)]
pub struct MemoryStore {
    data: RwLock<Partitions>,
    /// Last `updated_at` handed out, in microseconds
    clock: AtomicU64,
    config: MemoryStoreConfig,
}

impl MemoryStore {
    /// Create an empty store with default limits
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Create an empty store with the given limits
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            clock: AtomicU64::new(0),
            config,
        }
    }

    /// Limits in effect
    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    /// Total number of stored items
    pub fn len(&self) -> usize {
        self.data.read().values().map(BTreeMap::len).sum()
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored key, in table order
    pub fn keys(&self) -> Vec<ItemKey> {
        self.data
            .read()
            .iter()
            .flat_map(|(pk, part)| part.keys().map(move |sk| ItemKey::new(pk.clone(), sk.clone())))
            .collect()
    }

    /// Number of items in partition `pk`
    pub fn partition_len(&self, pk: &str) -> usize {
        self.data.read().get(pk).map(BTreeMap::len).unwrap_or(0)
    }

    /// Allocate the next write time
    ///
    /// Wall-clock time, bumped to stay strictly above the previous write.
    fn next_timestamp(&self) -> Timestamp {
        let now = Timestamp::now().as_micros();
        let prev = self
            .clock
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or(now);
        Timestamp::from_micros(now.max(prev.saturating_add(1)))
    }

    fn check_batch(&self, op: &str, len: usize, limit: usize) -> Result<()> {
        if len > limit {
            return Err(Error::validation(format!(
                "{} of {} entries exceeds the batch limit of {}",
                op, len, limit
            )));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn max_batch_get(&self) -> usize {
        self.config.max_batch_get
    }

    fn max_batch_write(&self) -> usize {
        self.config.max_batch_write
    }

    async fn get(&self, key: &ItemKey) -> Result<Option<Item>> {
        let data = self.data.read();
        Ok(data
            .get(&key.pk)
            .and_then(|part| part.get(&key.sk))
            .map(|stored| stored.to_item(&key.pk, &key.sk)))
    }

    async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<Item>> {
        self.check_batch("batch_get", keys.len(), self.config.max_batch_get)?;
        let data = self.data.read();
        Ok(keys
            .iter()
            .filter_map(|key| {
                data.get(&key.pk)
                    .and_then(|part| part.get(&key.sk))
                    .map(|stored| stored.to_item(&key.pk, &key.sk))
            })
            .collect())
    }

    async fn put(
        &self,
        key: ItemKey,
        payload: Vec<u8>,
        expected: Option<Version>,
    ) -> Result<Version> {
        let updated_at = self.next_timestamp();
        let mut data = self.data.write();
        let current = data
            .get(&key.pk)
            .and_then(|part| part.get(&key.sk))
            .map(|s| s.version);

        if current != expected {
            return Err(Error::Lock {
                expected: expected.map(|v| v.as_u64()),
                actual: current.map(|v| v.as_u64()),
            });
        }

        let version = Version::successor(expected);
        trace!(sk = %key.sk, %version, "conditional put");
        data.entry(key.pk).or_default().insert(
            key.sk,
            StoredItem {
                payload,
                version,
                updated_at,
            },
        );
        Ok(version)
    }

    async fn batch_put(&self, items: Vec<WriteItem>) -> Result<()> {
        self.check_batch("batch_put", items.len(), self.config.max_batch_write)?;
        let mut data = self.data.write();
        for item in items {
            let updated_at = self.next_timestamp();
            data.entry(item.key.pk).or_default().insert(
                item.key.sk,
                StoredItem {
                    payload: item.payload,
                    version: item.version,
                    updated_at,
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, key: &ItemKey, expected: Option<Version>) -> Result<()> {
        let mut data = self.data.write();
        let current = data
            .get(&key.pk)
            .and_then(|part| part.get(&key.sk))
            .map(|s| s.version);

        match (expected, current) {
            (Some(_), None) => return Err(Error::not_found(key.to_string())),
            (Some(e), Some(c)) if e != c => {
                return Err(Error::Lock {
                    expected: Some(e.as_u64()),
                    actual: Some(c.as_u64()),
                })
            }
            _ => {}
        }

        if let Some(part) = data.get_mut(&key.pk) {
            part.remove(&key.sk);
            if part.is_empty() {
                data.remove(&key.pk);
            }
        }
        Ok(())
    }

    async fn batch_delete(&self, keys: Vec<ItemKey>) -> Result<()> {
        self.check_batch("batch_delete", keys.len(), self.config.max_batch_write)?;
        let mut data = self.data.write();
        for key in keys {
            if let Some(part) = data.get_mut(&key.pk) {
                part.remove(&key.sk);
                if part.is_empty() {
                    data.remove(&key.pk);
                }
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        pk: &str,
        range: &SortKeyRange,
        start_after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Page> {
        let page_size = limit
            .unwrap_or(self.config.page_size)
            .min(self.config.page_size)
            .max(1);

        let data = self.data.read();
        let Some(part) = data.get(pk) else {
            return Ok(Page::default());
        };

        let lower = match start_after {
            Some(sk) => Bound::Excluded(sk.to_string()),
            None => Bound::Unbounded,
        };

        let mut matching = part
            .range((lower, Bound::Unbounded))
            .filter(|(sk, _)| range.contains(sk));

        let items: Vec<Item> = matching
            .by_ref()
            .take(page_size)
            .map(|(sk, stored)| stored.to_item(pk, sk))
            .collect();

        let last_evaluated = if matching.next().is_some() {
            items.last().map(|item| item.key.sk.clone())
        } else {
            None
        };

        Ok(Page {
            items,
            last_evaluated,
        })
    }

    async fn query_index(
        &self,
        index: &str,
        pk: &str,
        descending: bool,
        limit: usize,
    ) -> Result<Vec<ItemKey>> {
        if !self.config.indexes.iter().any(|name| name == index) {
            return Err(Error::store(format!("unknown index: {}", index)));
        }

        let data = self.data.read();
        let Some(part) = data.get(pk) else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<(Timestamp, &String)> =
            part.iter().map(|(sk, s)| (s.updated_at, sk)).collect();
        entries.sort();
        if descending {
            entries.reverse();
        }

        Ok(entries
            .into_iter()
            .take(limit)
            .map(|(_, sk)| ItemKey::new(pk, sk.clone()))
            .collect())
    }
}
