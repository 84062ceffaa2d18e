//! Rows derived from a record
//!
//! A posted record is stored as its header plus the rows below, all stamped
//! with the header's version:
//!
//! - one Step row per step
//! - one Position row per step that reached a non-empty position
//! - one Signature row when the header carries a full-game signature
//!
//! The same derivation drives replacement and deletion: the keys a record
//! version produces are exactly the keys removed when it goes away.

use std::collections::BTreeSet;

use kifudb_core::{Document, ItemKey, Kifu, Position, Signature, Step};

/// Position back-references of `steps`
pub fn derive_positions(steps: &[Step]) -> Vec<Position> {
    steps
        .iter()
        .filter(|s| !s.position.is_empty())
        .map(|s| Position {
            user_id: s.user_id.clone(),
            kifu_id: s.kifu_id.clone(),
            seq: s.seq,
            position: s.position.clone(),
        })
        .collect()
}

/// Duplicate-detection marker of `kifu`, if it has a signature
pub fn derive_signature(kifu: &Kifu) -> Option<Signature> {
    if kifu.sfen.is_empty() {
        return None;
    }
    Some(Signature {
        sfen: kifu.sfen.clone(),
        user_id: kifu.user_id.clone(),
        kifu_id: kifu.kifu_id.clone(),
        created_ts: kifu.created_ts,
    })
}

/// Every non-header row of one record version
#[derive(Debug, Clone, Default)]
pub struct RecordRows {
    /// Steps in seq order
    pub steps: Vec<Step>,
    /// Derived position rows
    pub positions: Vec<Position>,
    /// Derived signature row
    pub signature: Option<Signature>,
}

impl RecordRows {
    /// Derive the rows of `kifu` with `steps`
    pub fn derive(kifu: &Kifu, steps: Vec<Step>) -> Self {
        let positions = derive_positions(&steps);
        RecordRows {
            steps,
            positions,
            signature: derive_signature(kifu),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.steps.len() + self.positions.len() + usize::from(self.signature.is_some())
    }

    /// True if the record has no rows besides its header
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Table keys of every row
    pub fn keys(&self) -> BTreeSet<ItemKey> {
        self.documents().map(|d| d.key()).collect()
    }

    /// Consume into documents, steps first
    pub fn into_documents(self) -> Vec<Document> {
        let mut docs = Vec::with_capacity(self.len());
        docs.extend(self.steps.into_iter().map(Document::Step));
        docs.extend(self.positions.into_iter().map(Document::Position));
        docs.extend(self.signature.map(Document::Signature));
        docs
    }

    fn documents(&self) -> impl Iterator<Item = Document> + '_ {
        self.steps
            .iter()
            .cloned()
            .map(Document::Step)
            .chain(self.positions.iter().cloned().map(Document::Position))
            .chain(self.signature.iter().cloned().map(Document::Signature))
    }
}

/// Keys of `previous` that `next` no longer produces
pub fn orphaned_keys(previous: &BTreeSet<ItemKey>, next: &BTreeSet<ItemKey>) -> Vec<ItemKey> {
    previous.difference(next).cloned().collect()
}
