//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use kifudb_core::{Error, ItemKey, Kifu, Result, Step, Version};
use kifudb_engine::{KifuDb, KifuDbConfig};
use kifudb_storage::{
    Item, KvStore, MemoryStore, MemoryStoreConfig, Page, SortKeyRange, WriteItem,
};

// ============================================================================
// Setup
// ============================================================================

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("kifudb=debug")
        .try_init();
}

/// Facade over a fresh in-memory store with default limits
pub fn setup() -> (KifuDb, Arc<MemoryStore>) {
    setup_with(KifuDbConfig::default(), MemoryStoreConfig::default())
}

/// Facade over a fresh in-memory store
pub fn setup_with(config: KifuDbConfig, store_config: MemoryStoreConfig) -> (KifuDb, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(MemoryStore::with_config(store_config));
    let db = KifuDb::new(store.clone(), config, tracing::info_span!("kifudb-test"))
        .expect("valid config");
    (db, store)
}

// ============================================================================
// Record builders
// ============================================================================

/// A record whose step `i` reaches `positions[i]`
pub fn record(user: &str, kifu: &str, sfen: &str, positions: &[&str]) -> (Kifu, Vec<Step>) {
    let header = Kifu {
        sfen: sfen.to_string(),
        game_name: format!("game {}", kifu),
        created_ts: 1_700_000_000,
        ..Kifu::new(user, kifu)
    };
    let steps = positions
        .iter()
        .enumerate()
        .map(|(i, p)| Step {
            sfen_move: if i == 0 { String::new() } else { format!("m{}", i) },
            thinking_sec: i as i64,
            ..Step::new(user, kifu, i as u32, *p)
        })
        .collect();
    (header, steps)
}

/// A record with `n` steps reaching distinct positions `<kifu>-<i>`
pub fn linear_record(user: &str, kifu: &str, n: usize) -> (Kifu, Vec<Step>) {
    let positions: Vec<String> = (0..n).map(|i| format!("{}-{}", kifu, i)).collect();
    let refs: Vec<&str> = positions.iter().map(String::as_str).collect();
    record(user, kifu, &format!("sig-{}", kifu), &refs)
}

// ============================================================================
// Fault-injecting store
// ============================================================================

/// How a [`FaultStore`] treats writes and queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Forward everything
    None,
    /// Fail the n-th `batch_put` call (0-based) with a store error
    FailBatchPut(usize),
    /// Never complete `batch_put`
    HangBatchPut,
    /// Fail the n-th `batch_delete` call (0-based) with a store error
    FailBatchDelete(usize),
    /// Never complete `batch_delete`
    HangBatchDelete,
    /// Fail every single-item `delete` with a store error
    FailDelete,
    /// Never complete partition queries
    HangQuery,
}

/// Wraps a MemoryStore, counting calls and injecting faults
pub struct FaultStore {
    pub inner: MemoryStore,
    fault: Mutex<Fault>,
    pub batch_put_calls: AtomicUsize,
    pub batch_delete_calls: AtomicUsize,
    pub batch_get_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
}

impl FaultStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            inner: MemoryStore::with_config(config),
            fault: Mutex::new(Fault::None),
            batch_put_calls: AtomicUsize::new(0),
            batch_delete_calls: AtomicUsize::new(0),
            batch_get_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock() = fault;
    }

    pub fn reset_counts(&self) {
        for c in [
            &self.batch_put_calls,
            &self.batch_delete_calls,
            &self.batch_get_calls,
            &self.query_calls,
        ] {
            c.store(0, Ordering::SeqCst);
        }
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn fault(&self) -> Fault {
        *self.fault.lock()
    }
}

#[async_trait]
impl KvStore for FaultStore {
    fn max_batch_get(&self) -> usize {
        self.inner.max_batch_get()
    }

    fn max_batch_write(&self) -> usize {
        self.inner.max_batch_write()
    }

    async fn get(&self, key: &ItemKey) -> Result<Option<Item>> {
        self.inner.get(key).await
    }

    async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<Item>> {
        self.batch_get_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.batch_get(keys).await
    }

    async fn put(&self, key: ItemKey, payload: Vec<u8>, expected: Option<Version>) -> Result<Version> {
        self.inner.put(key, payload, expected).await
    }

    async fn batch_put(&self, items: Vec<WriteItem>) -> Result<()> {
        let n = self.batch_put_calls.fetch_add(1, Ordering::SeqCst);
        match self.fault() {
            Fault::FailBatchPut(i) if i == n => return Err(Error::store("provisioned throughput exceeded")),
            Fault::HangBatchPut => std::future::pending::<()>().await,
            _ => {}
        }
        self.inner.batch_put(items).await
    }

    async fn delete(&self, key: &ItemKey, expected: Option<Version>) -> Result<()> {
        if self.fault() == Fault::FailDelete {
            return Err(Error::store("provisioned throughput exceeded"));
        }
        self.inner.delete(key, expected).await
    }

    async fn batch_delete(&self, keys: Vec<ItemKey>) -> Result<()> {
        let n = self.batch_delete_calls.fetch_add(1, Ordering::SeqCst);
        match self.fault() {
            Fault::FailBatchDelete(i) if i == n => return Err(Error::store("provisioned throughput exceeded")),
            Fault::HangBatchDelete => std::future::pending::<()>().await,
            _ => {}
        }
        self.inner.batch_delete(keys).await
    }

    async fn query(
        &self,
        pk: &str,
        range: &SortKeyRange,
        start_after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Page> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fault() == Fault::HangQuery {
            std::future::pending::<()>().await;
        }
        self.inner.query(pk, range, start_after, limit).await
    }

    async fn query_index(&self, index: &str, pk: &str, descending: bool, limit: usize) -> Result<Vec<ItemKey>> {
        self.inner.query_index(index, pk, descending, limit).await
    }
}

/// Facade over a FaultStore
pub fn setup_faulty(config: KifuDbConfig, store_config: MemoryStoreConfig) -> (KifuDb, Arc<FaultStore>) {
    init_tracing();
    let store = Arc::new(FaultStore::new(store_config));
    let db = KifuDb::new(store.clone(), config, tracing::info_span!("kifudb-test"))
        .expect("valid config");
    (db, store)
}
