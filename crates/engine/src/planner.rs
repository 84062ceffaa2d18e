//! Query planner
//!
//! Read shapes over the single table:
//!
//! 1. Header point get
//! 2. Step range scan, optionally bounded to an inclusive seq window
//! 3. Header + steps, fetched concurrently
//! 4. Same-position search:
//!
//! ```text
//! owners ──▶ WorkQueue (P workers)
//!              └─ per owner: scanner ──▶ bounded channel ──▶ fetcher
//!                  POSITION:<owner>:<pos>                     steps seq+1..=seq+n
//! ```
//!
//! Every store call races the caller's cancellation token.

use std::collections::HashSet;
use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use kifudb_core::key::{kifu_key, position_partition, seq_sort_key, step_partition};
use kifudb_core::{
    validate_id, Document, Error, Kifu, Position, PositionMatch, Result, Step, Versioned,
    MAX_STEPS,
};
use kifudb_storage::{KvStore, PartitionScan, SortKeyRange, WorkQueue};

/// Race `fut` against `cancel`
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Canceled),
        r = fut => r,
    }
}

/// Sort-key window of an optional seq range; `None` if the window is empty
fn step_sort_range(range: Option<&RangeInclusive<u32>>) -> Option<SortKeyRange> {
    let Some(range) = range else {
        return Some(SortKeyRange::All);
    };
    // Padded keys order numerically only below MAX_STEPS
    let last = (MAX_STEPS - 1) as u32;
    let (start, end) = (*range.start(), (*range.end()).min(last));
    if start > end {
        return None;
    }
    Some(SortKeyRange::Between {
        start: seq_sort_key(start),
        end: seq_sort_key(end),
    })
}

/// Executes the read shapes against a store
#[derive(Clone)]
pub struct QueryPlanner {
    store: Arc<dyn KvStore>,
    parallelism: usize,
    page_size: Option<usize>,
    channel_capacity: usize,
}

impl QueryPlanner {
    /// Create a planner
    pub fn new(
        store: Arc<dyn KvStore>,
        parallelism: usize,
        page_size: Option<usize>,
        channel_capacity: usize,
    ) -> Self {
        Self {
            store,
            parallelism: parallelism.max(1),
            page_size,
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Scan a partition and decode each item with `into`
    pub(crate) async fn scan<T>(
        &self,
        pk: String,
        range: SortKeyRange,
        into: fn(Document) -> Result<T>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Versioned<T>>> {
        let items = PartitionScan::new(Arc::clone(&self.store), pk, range)
            .with_page_size(self.page_size)
            .collect(cancel)
            .await?;
        items
            .iter()
            .map(|item| item.decode()?.try_map(into))
            .collect()
    }

    /// Read one header
    ///
    /// # Errors
    ///
    /// `NotFound` if the record has no header.
    pub async fn get_kifu(
        &self,
        user_id: &str,
        kifu_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Versioned<Kifu>> {
        let key = kifu_key(user_id, kifu_id);
        match cancellable(cancel, self.store.get(&key)).await? {
            Some(item) => item.decode()?.try_map(Document::into_kifu),
            None => Err(Error::not_found(format!("kifu {}/{}", user_id, kifu_id))),
        }
    }

    /// Read the steps of one record in seq order
    ///
    /// `range` restricts the result to an inclusive seq window. An empty
    /// window, or a record without steps, yields an empty list.
    pub async fn get_steps(
        &self,
        user_id: &str,
        kifu_id: &str,
        range: Option<RangeInclusive<u32>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Versioned<Step>>> {
        let Some(range) = step_sort_range(range.as_ref()) else {
            return Ok(Vec::new());
        };
        let mut steps = self
            .scan(step_partition(user_id, kifu_id), range, Document::into_step, cancel)
            .await?;
        steps.sort_by_key(|s| s.value.seq);
        Ok(steps)
    }

    /// Read a header and all of its steps concurrently
    ///
    /// Either read failing fails the call; the other is cancelled.
    pub async fn get_kifu_and_steps(
        &self,
        user_id: &str,
        kifu_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(Versioned<Kifu>, Vec<Versioned<Step>>)> {
        let token = cancel.child_token();
        let _guard = token.clone().drop_guard();
        tokio::try_join!(
            self.get_kifu(user_id, kifu_id, &token),
            self.get_steps(user_id, kifu_id, None, &token),
        )
    }

    /// Find every step of `user_ids` that reached `position`
    ///
    /// Each match carries the `steps` steps following it. Records in
    /// `exclude_kifu_ids` are skipped. Results across owners are unordered.
    pub async fn same_positions(
        &self,
        position: &str,
        user_ids: &[String],
        steps: u32,
        exclude_kifu_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<PositionMatch>> {
        if position.is_empty() || user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut owners = Vec::with_capacity(user_ids.len());
        let mut seen = HashSet::new();
        for user_id in user_ids {
            validate_id("user_id", user_id)?;
            if seen.insert(user_id.as_str()) {
                owners.push(user_id.clone());
            }
        }

        let search = Arc::new(OwnerSearch {
            planner: self.clone(),
            position: position.to_string(),
            steps,
            exclude: exclude_kifu_ids.iter().cloned().collect(),
        });

        let per_owner = WorkQueue::new(self.parallelism)
            .run(owners, cancel, move |owner, token| {
                let search = Arc::clone(&search);
                async move { search.run(owner, &token).await }
            })
            .await?;

        let matches: Vec<PositionMatch> = per_owner.into_iter().flatten().collect();
        debug!(target: "kifudb::search", matches = matches.len(), "same-position search done");
        Ok(matches)
    }
}

/// One same-position search, shared by its owner branches
struct OwnerSearch {
    planner: QueryPlanner,
    position: String,
    steps: u32,
    exclude: HashSet<String>,
}

impl OwnerSearch {
    /// Scanner and fetcher of one owner, joined by a bounded channel
    async fn run(&self, owner: String, cancel: &CancellationToken) -> Result<Vec<PositionMatch>> {
        let (tx, mut rx) = mpsc::channel::<Position>(self.planner.channel_capacity);

        let scanner = async move {
            let mut scan = PartitionScan::new(
                Arc::clone(&self.planner.store),
                position_partition(&owner, &self.position),
                SortKeyRange::All,
            )
            .with_page_size(self.planner.page_size);

            while let Some(page) = scan.next_page(cancel).await? {
                for item in page {
                    let position = item.decode()?.into_value().into_position()?;
                    if self.exclude.contains(&position.kifu_id) {
                        trace!(target: "kifudb::search", kifu_id = %position.kifu_id, "excluded");
                        continue;
                    }
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Canceled),
                        sent = tx.send(position) => {
                            if sent.is_err() {
                                // Fetcher has failed; it reports why.
                                return Ok(());
                            }
                        }
                    }
                }
            }
            Ok::<(), Error>(())
        };

        let fetcher = async {
            let mut matches = Vec::new();
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Canceled),
                    next = rx.recv() => next,
                };
                let Some(position) = next else {
                    return Ok(matches);
                };

                let steps = if self.steps == 0 {
                    Vec::new()
                } else {
                    let start = position.seq.saturating_add(1);
                    let end = position.seq.saturating_add(self.steps);
                    self.planner
                        .get_steps(&position.user_id, &position.kifu_id, Some(start..=end), cancel)
                        .await?
                };

                matches.push(PositionMatch {
                    user_id: position.user_id,
                    kifu_id: position.kifu_id,
                    seq: position.seq,
                    steps,
                });
            }
        };

        let ((), matches) = tokio::try_join!(scanner, fetcher)?;
        Ok(matches)
    }
}
