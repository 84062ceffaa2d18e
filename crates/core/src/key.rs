//! Key scheme for the single-table layout
//!
//! Every entity kind shares one flat keyspace. An item is addressed by a
//! partition key, which embeds a kind tag plus the owner/discriminator, and a
//! sort key, which orders items inside the partition:
//!
//! ```text
//! Kifu       KIFU:<user>                  <kifu_id>
//! Step       STEP:<user>:<kifu_id>        <seq:04>
//! Position   POSITION:<user>:<position>   <kifu_id>:<seq:04>
//! Signature  KIFU_SIG:<sfen>              <user>:<kifu_id>
//! ```
//!
//! A range query against one partition never crosses kinds or owners, and
//! zero-padded sequence numbers make lexicographic order equal numeric order.
//!
//! The builders are pure and never fail. They do not validate identifiers;
//! [`validate_id`] is applied by the facade before any key is built.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Width of zero-padded step ordinals in sort keys
pub const SEQ_WIDTH: usize = 4;

/// Steps per record that keep padded sort keys in numeric order
pub const MAX_STEPS: usize = 10_000;

/// Separator between key segments
pub const SEPARATOR: char = ':';

/// Entity kind tag embedded in every partition key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Record header
    Kifu,
    /// One ply
    Step,
    /// Position back-reference
    Position,
    /// Duplicate-detection marker
    Signature,
}

impl EntityKind {
    /// All kinds, in tag order
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Kifu,
        EntityKind::Step,
        EntityKind::Position,
        EntityKind::Signature,
    ];

    /// Partition key prefix tag
    pub const fn tag(&self) -> &'static str {
        match self {
            EntityKind::Kifu => "KIFU",
            EntityKind::Step => "STEP",
            EntityKind::Position => "POSITION",
            EntityKind::Signature => "KIFU_SIG",
        }
    }

    /// Recover the kind from a partition key
    pub fn from_partition(pk: &str) -> Option<Self> {
        let (tag, _) = pk.split_once(SEPARATOR)?;
        EntityKind::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Partition key + sort key of one stored item
///
/// Ordering is `pk` then `sk`, which is the order a store scan returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    /// Partition key
    pub pk: String,
    /// Sort key
    pub sk: String,
}

impl ItemKey {
    /// Create a key from its two parts
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        ItemKey {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Kind encoded in the partition key
    pub fn kind(&self) -> Option<EntityKind> {
        EntityKind::from_partition(&self.pk)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pk, self.sk)
    }
}

/// Sort key of step `seq`
pub fn seq_sort_key(seq: u32) -> String {
    format!("{:0width$}", seq, width = SEQ_WIDTH)
}

/// Partition holding all headers of `user_id`
pub fn kifu_partition(user_id: &str) -> String {
    format!("{}:{}", EntityKind::Kifu.tag(), user_id)
}

/// Header key
pub fn kifu_key(user_id: &str, kifu_id: &str) -> ItemKey {
    ItemKey::new(kifu_partition(user_id), kifu_id)
}

/// Partition holding all steps of one record
pub fn step_partition(user_id: &str, kifu_id: &str) -> String {
    format!("{}:{}:{}", EntityKind::Step.tag(), user_id, kifu_id)
}

/// Step key
pub fn step_key(user_id: &str, kifu_id: &str, seq: u32) -> ItemKey {
    ItemKey::new(step_partition(user_id, kifu_id), seq_sort_key(seq))
}

/// Partition holding every step of `user_id` that reached `position`
pub fn position_partition(user_id: &str, position: &str) -> String {
    format!("{}:{}:{}", EntityKind::Position.tag(), user_id, position)
}

/// Position back-reference key
pub fn position_key(user_id: &str, position: &str, kifu_id: &str, seq: u32) -> ItemKey {
    ItemKey::new(
        position_partition(user_id, position),
        format!("{}:{}", kifu_id, seq_sort_key(seq)),
    )
}

/// Partition holding every record whose full game has signature `sfen`
pub fn signature_partition(sfen: &str) -> String {
    format!("{}:{}", EntityKind::Signature.tag(), sfen)
}

/// Signature key
pub fn signature_key(sfen: &str, user_id: &str, kifu_id: &str) -> ItemKey {
    ItemKey::new(signature_partition(sfen), format!("{}:{}", user_id, kifu_id))
}

/// Validate an owner or record identifier
///
/// Identifiers must be non-empty and must not contain the key separator or
/// NUL, so that partitions of different owners can never collide.
pub fn validate_id(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(format!("{} is empty", field)));
    }
    if value.contains(SEPARATOR) {
        return Err(Error::validation(format!(
            "{} must not contain '{}': {:?}",
            field, SEPARATOR, value
        )));
    }
    if value.contains('\0') {
        return Err(Error::validation(format!("{} contains NUL", field)));
    }
    Ok(())
}
