//! KifuDb: the storage facade
//!
//! `KifuDb` is the public entry point. It validates identifiers, builds keys,
//! and drives the query planner, recency reader and batch pipeline against a
//! caller-supplied [`KvStore`].
//!
//! ## Operations
//!
//! | Operation | Shape |
//! |-----------|-------|
//! | `post` | conditional header put, then batch write of derived rows |
//! | `get` / `batch_get` | point get / chunked batch get of headers |
//! | `get_kifu_and_steps` / `get_steps` | header + step partition scan |
//! | `list_kifu` | paged scan of an owner's headers |
//! | `delete_kifu` | conditional header delete, then batch delete of rows |
//! | `search` | same-position fan-out |
//! | `recent_kifu` | recency index, then batch get |
//! | `duplicate_kifu` | signature partition scan |
//!
//! Every operation takes the caller's cancellation token and logs under the
//! span injected at construction.

pub mod config;
mod write;

pub use config::{KifuDbConfig, CONFIG_FILE_NAME};

use std::ops::{ControlFlow, RangeInclusive};
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, Instrument, Span};

use kifudb_core::key::{kifu_key, kifu_partition, signature_partition};
use kifudb_core::{
    validate_id, Document, Kifu, PositionMatch, Result, Signature, Step, Versioned,
};
use kifudb_storage::{KvStore, PartitionScan, SortKeyRange};

use crate::planner::QueryPlanner;
use crate::recent::{get_kifus, RecencyReader};

// ============================================================================
// KifuDb Struct
// ============================================================================

/// Game record storage over a single-table key-value store
///
/// # Example
///
/// ```text
/// let db = KifuDb::new(store, KifuDbConfig::default(), tracing::info_span!("kifudb"))?;
/// let version = db.post(kifu, steps, None, &cancel).await?;
/// let header = db.get("user", "kifu", &cancel).await?;
/// assert_eq!(header.version, version);
/// ```
pub struct KifuDb {
    store: Arc<dyn KvStore>,
    config: KifuDbConfig,
    planner: QueryPlanner,
    recency: RecencyReader,
    span: Span,
}

impl KifuDb {
    /// Create a facade over `store`
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `config` is unusable.
    pub fn new(store: Arc<dyn KvStore>, config: KifuDbConfig, span: Span) -> Result<Self> {
        config.validate()?;

        let planner = QueryPlanner::new(
            Arc::clone(&store),
            config.parallelism,
            config.query_page_size,
            config.search_channel_capacity,
        );
        let recency = RecencyReader::new(
            Arc::clone(&store),
            config.updated_index.clone(),
            config.get_options(),
        );

        span.in_scope(|| {
            info!(
                target: "kifudb::db",
                parallelism = config.parallelism,
                batch_write_unit = config.batch_write_unit,
                batch_get_unit = config.batch_get_unit,
                updated_index = %config.updated_index,
                "KifuDb ready"
            );
        });

        Ok(Self {
            store,
            config,
            planner,
            recency,
            span,
        })
    }

    /// Create a facade configured from `kifudb.toml` in `config_dir`
    ///
    /// A default config file is written first if none exists.
    pub fn open(store: Arc<dyn KvStore>, config_dir: &Path, span: Span) -> Result<Self> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        KifuDbConfig::write_default_if_missing(&path)?;
        let config = KifuDbConfig::from_file(&path)?;
        Self::new(store, config, span)
    }

    /// Configuration in effect
    pub fn config(&self) -> &KifuDbConfig {
        &self.config
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Span every operation logs under
    pub fn span(&self) -> &Span {
        &self.span
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read one header
    ///
    /// # Errors
    ///
    /// `NotFound` if the record does not exist.
    pub async fn get(
        &self,
        user_id: &str,
        kifu_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Versioned<Kifu>> {
        async {
            validate_id("user_id", user_id)?;
            validate_id("kifu_id", kifu_id)?;
            self.planner.get_kifu(user_id, kifu_id, cancel).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// Read a header and all of its steps, in seq order
    pub async fn get_kifu_and_steps(
        &self,
        user_id: &str,
        kifu_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(Versioned<Kifu>, Vec<Versioned<Step>>)> {
        async {
            validate_id("user_id", user_id)?;
            validate_id("kifu_id", kifu_id)?;
            self.planner.get_kifu_and_steps(user_id, kifu_id, cancel).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// Read the steps of one record, optionally restricted to an inclusive
    /// seq window
    pub async fn get_steps(
        &self,
        user_id: &str,
        kifu_id: &str,
        range: Option<RangeInclusive<u32>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Versioned<Step>>> {
        async {
            validate_id("user_id", user_id)?;
            validate_id("kifu_id", kifu_id)?;
            self.planner.get_steps(user_id, kifu_id, range, cancel).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// Read many headers in request order; absent records are skipped
    ///
    /// A pair requested twice is read once and returned twice.
    pub async fn batch_get(
        &self,
        ids: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<Vec<Versioned<Kifu>>> {
        async {
            let mut keys = Vec::with_capacity(ids.len());
            for (user_id, kifu_id) in ids {
                validate_id("user_id", user_id)?;
                validate_id("kifu_id", kifu_id)?;
                keys.push(kifu_key(user_id, kifu_id));
            }
            let found = get_kifus(&self.store, keys, self.config.get_options(), cancel).await?;
            debug!(target: "kifudb::db", requested = ids.len(), found = found.len(), "batch get");
            Ok(found)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Visit every header of `user_id` in record-id order
    ///
    /// The scan stops early when `visitor` returns `ControlFlow::Break`.
    pub async fn list_kifu<F>(
        &self,
        user_id: &str,
        mut visitor: F,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        F: FnMut(Versioned<Kifu>) -> ControlFlow<()>,
    {
        async {
            validate_id("user_id", user_id)?;
            let mut scan = PartitionScan::new(
                Arc::clone(&self.store),
                kifu_partition(user_id),
                SortKeyRange::All,
            )
            .with_page_size(self.config.query_page_size);

            let mut visited = 0usize;
            while let Some(page) = scan.next_page(cancel).await? {
                for item in page {
                    let kifu = item.decode()?.try_map(Document::into_kifu)?;
                    visited += 1;
                    if visitor(kifu).is_break() {
                        debug!(target: "kifudb::db", visited, "list stopped by visitor");
                        return Ok(());
                    }
                }
            }
            debug!(target: "kifudb::db", visited, "list done");
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Find every step of `user_ids` that reached `position`
    ///
    /// Each match carries up to `steps` following steps. Matches from
    /// `exclude_kifu_ids` are dropped. An empty position or owner list
    /// yields no matches.
    pub async fn search(
        &self,
        position: &str,
        user_ids: &[String],
        steps: u32,
        exclude_kifu_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<PositionMatch>> {
        self.planner
            .same_positions(position, user_ids, steps, exclude_kifu_ids, cancel)
            .instrument(self.span.clone())
            .await
    }

    /// Up to `limit` headers of `user_id`, most recently written first
    pub async fn recent_kifu(
        &self,
        user_id: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Versioned<Kifu>>> {
        async {
            validate_id("user_id", user_id)?;
            self.recency.recent(user_id, limit, cancel).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// Every record, of any owner, whose full-game signature is `sfen`
    pub async fn duplicate_kifu(
        &self,
        sfen: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Versioned<Signature>>> {
        if sfen.is_empty() {
            return Ok(Vec::new());
        }
        self.planner
            .scan(
                signature_partition(sfen),
                SortKeyRange::All,
                Document::into_signature,
                cancel,
            )
            .instrument(self.span.clone())
            .await
    }
}

impl std::fmt::Debug for KifuDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KifuDb")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
