//! Paginated partition scans
//!
//! `PartitionScan` walks one partition page by page, resuming each query after
//! the previous page's `last_evaluated` sort key. Every store call races the
//! caller's cancellation token.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use kifudb_core::{Error, Result};

use crate::item::{Item, SortKeyRange};
use crate::traits::KvStore;

/// Cursor over one partition of the table
pub struct PartitionScan {
    store: Arc<dyn KvStore>,
    pk: String,
    range: SortKeyRange,
    page_size: Option<usize>,
    cursor: Option<String>,
    done: bool,
}

impl PartitionScan {
    /// Scan partition `pk`, restricted to `range`
    pub fn new(store: Arc<dyn KvStore>, pk: impl Into<String>, range: SortKeyRange) -> Self {
        Self {
            store,
            pk: pk.into(),
            range,
            page_size: None,
            cursor: None,
            done: false,
        }
    }

    /// Ask the store for pages of at most `page_size` items
    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        self.page_size = page_size;
        self
    }

    /// Partition being scanned
    pub fn partition(&self) -> &str {
        &self.pk
    }

    /// Fetch the next page; `Ok(None)` once the partition is exhausted
    pub async fn next_page(&mut self, cancel: &CancellationToken) -> Result<Option<Vec<Item>>> {
        if self.done {
            return Ok(None);
        }

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Canceled),
            page = self.store.query(&self.pk, &self.range, self.cursor.as_deref(), self.page_size) => page?,
        };

        trace!(pk = %self.pk, items = page.items.len(), more = page.last_evaluated.is_some(), "scan page");
        match page.last_evaluated {
            Some(sk) => self.cursor = Some(sk),
            None => self.done = true,
        }
        Ok(Some(page.items))
    }

    /// Drain the whole partition
    pub async fn collect(mut self, cancel: &CancellationToken) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        while let Some(mut page) = self.next_page(cancel).await? {
            items.append(&mut page);
        }
        Ok(items)
    }
}
