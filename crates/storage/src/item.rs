//! Store item types
//!
//! - `Item`: what a read returns (payload + version + write time)
//! - `WriteItem`: what a batch write sends (payload + version to stamp)
//! - `SortKeyRange`: sort-key restriction of a partition query
//! - `Page`: one page of a paginated partition query

use kifudb_core::{Document, ItemKey, Result, Timestamp, Version, Versioned};

/// A stored item as returned by reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Table key
    pub key: ItemKey,
    /// Encoded document
    pub payload: Vec<u8>,
    /// Version attribute
    pub version: Version,
    /// Last write time
    pub updated_at: Timestamp,
}

impl Item {
    /// Decode the payload, keeping version metadata
    pub fn decode(&self) -> Result<Versioned<Document>> {
        let doc = Document::decode(&self.payload)?;
        Ok(Versioned::new(doc, self.version, self.updated_at))
    }
}

/// An item to write unconditionally with a given version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteItem {
    /// Table key
    pub key: ItemKey,
    /// Encoded document
    pub payload: Vec<u8>,
    /// Version attribute to store
    pub version: Version,
}

impl WriteItem {
    /// Encode a document and address it by its own key
    pub fn from_document(doc: &Document, version: Version) -> Result<Self> {
        Ok(WriteItem {
            key: doc.key(),
            payload: doc.encode()?,
            version,
        })
    }
}

/// Sort-key restriction for a partition query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SortKeyRange {
    /// Every item of the partition
    #[default]
    All,
    /// Sort keys in `[start, end]`, both inclusive
    Between {
        /// Lowest sort key
        start: String,
        /// Highest sort key
        end: String,
    },
    /// Sort keys beginning with the prefix
    Prefix(String),
}

impl SortKeyRange {
    /// Whether `sk` satisfies the restriction
    pub fn contains(&self, sk: &str) -> bool {
        match self {
            SortKeyRange::All => true,
            SortKeyRange::Between { start, end } => sk >= start.as_str() && sk <= end.as_str(),
            SortKeyRange::Prefix(p) => sk.starts_with(p.as_str()),
        }
    }
}

/// One page of a partition query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Items in sort-key order
    pub items: Vec<Item>,
    /// Sort key to resume after, `None` on the last page
    pub last_evaluated: Option<String>,
}
