//! Write path: post and delete
//!
//! `post` writes the header first with a version condition, so a stale
//! caller fails with `Lock` before any other row is written. The derived
//! rows follow through the batch pipeline. A failure after the header write
//! leaves the record partially written; callers retry the whole operation.
//!
//! `delete_kifu` runs the other way round: derived rows go first and the
//! header is removed last, again conditionally. Until the header is gone the
//! record stays addressable, so a failed delete can be retried and re-derives
//! the same row keys.
//!
//! Rows are always removed index rows first, then steps. Position keys are
//! derived from stored steps, so a step row must outlive its position row.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use kifudb_core::key::{kifu_key, position_key};
use kifudb_core::{
    validate_id, Document, EntityKind, Error, ItemKey, Kifu, Result, Step, Version, Versioned,
    MAX_STEPS,
};
use kifudb_storage::{batch_delete, batch_get, batch_write, WriteItem};

use super::KifuDb;
use crate::planner::cancellable;
use crate::position::{orphaned_keys, RecordRows};

/// Check identities and step numbering; returns the steps in seq order
fn validate_record(kifu: &Kifu, mut steps: Vec<Step>) -> Result<Vec<Step>> {
    validate_id("user_id", &kifu.user_id)?;
    validate_id("kifu_id", &kifu.kifu_id)?;

    if steps.len() > MAX_STEPS {
        return Err(Error::validation(format!(
            "{} steps exceeds the limit of {}",
            steps.len(),
            MAX_STEPS
        )));
    }
    if let Some(s) = steps
        .iter()
        .find(|s| s.user_id != kifu.user_id || s.kifu_id != kifu.kifu_id)
    {
        return Err(Error::validation(format!(
            "step {} belongs to {}/{}, not {}/{}",
            s.seq, s.user_id, s.kifu_id, kifu.user_id, kifu.kifu_id
        )));
    }

    steps.sort_by_key(|s| s.seq);
    for (i, s) in steps.iter().enumerate() {
        if s.seq as usize != i {
            return Err(Error::validation(format!(
                "steps must be numbered from 0 without gaps: expected seq {}, found {}",
                i, s.seq
            )));
        }
    }
    Ok(steps)
}

fn lock_error(expected: Option<Version>, actual: Option<Version>) -> Error {
    Error::Lock {
        expected: expected.map(|v| v.as_u64()),
        actual: actual.map(|v| v.as_u64()),
    }
}

fn unversioned(steps: Vec<Versioned<Step>>) -> Vec<Step> {
    steps.into_iter().map(Versioned::into_value).collect()
}

impl KifuDb {
    /// Store a record and its steps
    ///
    /// `expected` is `None` to create the record, or the version last read to
    /// replace it. Rows of the replaced version that the new version no
    /// longer produces are removed. Position rows are write-once: a stored
    /// position row the new version still produces is left as it is. Returns
    /// the new version, which every written row carries.
    ///
    /// Steps, positions and signature are consistent with the header only
    /// once `post` has returned. Two replacing posts for the same record must
    /// not overlap: the second one's conditional header write can succeed
    /// while the first is still writing rows, and those late rows, stamped
    /// with the older version, overwrite the newer ones.
    ///
    /// # Errors
    ///
    /// - `Validation` for malformed identifiers or step numbering
    /// - `Lock` if the stored version differs from `expected`; nothing is
    ///   written in that case
    pub async fn post(
        &self,
        kifu: Kifu,
        steps: Vec<Step>,
        expected: Option<Version>,
        cancel: &CancellationToken,
    ) -> Result<Version> {
        async {
            let steps = validate_record(&kifu, steps)?;
            let user_id = kifu.user_id.clone();
            let kifu_id = kifu.kifu_id.clone();

            let previous = match expected {
                Some(expected) => self.previous_keys(&user_id, &kifu_id, expected, cancel).await?,
                None => None,
            };

            let mut rows = RecordRows::derive(&kifu, steps);
            let next_keys = rows.keys();
            let mut kept = 0;
            if let Some(previous) = &previous {
                let stored = self.stored_positions(previous, &rows, cancel).await?;
                kept = stored.len();
                rows.positions.retain(|p| {
                    !stored.contains(&position_key(&p.user_id, &p.position, &p.kifu_id, p.seq))
                });
            }

            let payload = Document::from(kifu).encode()?;
            let version = match cancellable(
                cancel,
                self.store.put(kifu_key(&user_id, &kifu_id), payload, expected),
            )
            .await
            {
                Ok(v) => v,
                Err(e) => {
                    if matches!(e, Error::Lock { .. }) {
                        warn!(target: "kifudb::db", %user_id, %kifu_id, error = %e, "post rejected");
                    }
                    return Err(e);
                }
            };

            let row_count = rows.len();
            let items = rows
                .into_documents()
                .iter()
                .map(|doc| WriteItem::from_document(doc, version))
                .collect::<Result<Vec<_>>>()?;
            batch_write(&self.store, items, self.config.write_options(), cancel).await?;

            let mut removed = 0;
            if let Some(previous) = previous {
                let orphans = orphaned_keys(&previous, &next_keys);
                removed = orphans.len();
                self.delete_rows(orphans, cancel).await?;
            }

            info!(
                target: "kifudb::db",
                %user_id,
                %kifu_id,
                %version,
                rows = row_count,
                kept,
                removed,
                "kifu posted"
            );
            Ok(version)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Keys of the stored version being replaced
    ///
    /// `None` if there is no stored header; the conditional put then reports
    /// the mismatch.
    async fn previous_keys(
        &self,
        user_id: &str,
        kifu_id: &str,
        expected: Version,
        cancel: &CancellationToken,
    ) -> Result<Option<BTreeSet<ItemKey>>> {
        let (header, steps) = match self.planner.get_kifu_and_steps(user_id, kifu_id, cancel).await {
            Ok(found) => found,
            Err(Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        if header.version != expected {
            return Err(lock_error(Some(expected), Some(header.version)));
        }
        let keys = RecordRows::derive(&header.value, unversioned(steps)).keys();
        debug!(target: "kifudb::db", rows = keys.len(), "previous version resolved");
        Ok(Some(keys))
    }

    /// Remove `keys`: position and signature rows, then step rows
    async fn delete_rows(&self, keys: Vec<ItemKey>, cancel: &CancellationToken) -> Result<()> {
        let (steps, index): (Vec<ItemKey>, Vec<ItemKey>) = keys
            .into_iter()
            .partition(|key| key.kind() == Some(EntityKind::Step));
        batch_delete(&self.store, index, self.config.write_options(), cancel).await?;
        batch_delete(&self.store, steps, self.config.write_options(), cancel).await
    }

    /// Position rows of `rows` already stored for the version being replaced
    async fn stored_positions(
        &self,
        previous: &BTreeSet<ItemKey>,
        rows: &RecordRows,
        cancel: &CancellationToken,
    ) -> Result<BTreeSet<ItemKey>> {
        let candidates: Vec<ItemKey> = rows
            .positions
            .iter()
            .map(|p| position_key(&p.user_id, &p.position, &p.kifu_id, p.seq))
            .filter(|key| previous.contains(key))
            .collect();
        if candidates.is_empty() {
            return Ok(BTreeSet::new());
        }
        let found = batch_get(&self.store, candidates, self.config.get_options(), cancel).await?;
        Ok(found.into_iter().map(|item| item.key).collect())
    }

    /// Delete a record: steps, position rows, signature, then the header
    ///
    /// A delete that fails part way leaves the header in place; calling it
    /// again with the same `expected` finishes the job.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the record does not exist
    /// - `Lock` if the stored version differs from `expected`; nothing is
    ///   deleted in that case
    pub async fn delete_kifu(
        &self,
        user_id: &str,
        kifu_id: &str,
        expected: Version,
        cancel: &CancellationToken,
    ) -> Result<()> {
        async {
            validate_id("user_id", user_id)?;
            validate_id("kifu_id", kifu_id)?;

            let (header, steps) = self.planner.get_kifu_and_steps(user_id, kifu_id, cancel).await?;
            if header.version != expected {
                return Err(lock_error(Some(expected), Some(header.version)));
            }

            let keys: Vec<ItemKey> = RecordRows::derive(&header.value, unversioned(steps))
                .keys()
                .into_iter()
                .collect();
            let row_count = keys.len();
            self.delete_rows(keys, cancel).await?;

            cancellable(
                cancel,
                self.store.delete(&kifu_key(user_id, kifu_id), Some(expected)),
            )
            .await?;

            info!(target: "kifudb::db", %user_id, %kifu_id, rows = row_count, "kifu deleted");
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }
}
