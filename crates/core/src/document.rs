//! Documents and the payload codec
//!
//! `Document` is the closed set of entities stored in the table. The key
//! scheme and the codec both dispatch on this variant; nothing inspects key
//! strings to decide what a payload contains.
//!
//! The payload is the bincode encoding of `Document`. The version is not part
//! of the payload: stores keep it as a separate attribute of the item.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key::{self, EntityKind, ItemKey};
use crate::types::{Kifu, Position, Signature, Step};

/// Any entity that can be stored in the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Document {
    /// Record header
    Kifu(Kifu),
    /// One ply
    Step(Step),
    /// Position back-reference
    Position(Position),
    /// Duplicate-detection marker
    Signature(Signature),
}

impl Document {
    /// Kind of the wrapped entity
    pub fn kind(&self) -> EntityKind {
        match self {
            Document::Kifu(_) => EntityKind::Kifu,
            Document::Step(_) => EntityKind::Step,
            Document::Position(_) => EntityKind::Position,
            Document::Signature(_) => EntityKind::Signature,
        }
    }

    /// Table key of the wrapped entity
    pub fn key(&self) -> ItemKey {
        match self {
            Document::Kifu(k) => key::kifu_key(&k.user_id, &k.kifu_id),
            Document::Step(s) => key::step_key(&s.user_id, &s.kifu_id, s.seq),
            Document::Position(p) => {
                key::position_key(&p.user_id, &p.position, &p.kifu_id, p.seq)
            }
            Document::Signature(s) => key::signature_key(&s.sfen, &s.user_id, &s.kifu_id),
        }
    }

    /// Serialize to an opaque payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::internal(format!("encode {}: {}", self.kind(), e)))
    }

    /// Deserialize a payload produced by [`Document::encode`]
    ///
    /// Malformed bytes and unknown variants fail with `Error::Decode`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Unwrap a header, failing with `Decode` for any other kind
    pub fn into_kifu(self) -> Result<Kifu> {
        match self {
            Document::Kifu(k) => Ok(k),
            other => Err(mismatch(EntityKind::Kifu, other.kind())),
        }
    }

    /// Unwrap a step, failing with `Decode` for any other kind
    pub fn into_step(self) -> Result<Step> {
        match self {
            Document::Step(s) => Ok(s),
            other => Err(mismatch(EntityKind::Step, other.kind())),
        }
    }

    /// Unwrap a position, failing with `Decode` for any other kind
    pub fn into_position(self) -> Result<Position> {
        match self {
            Document::Position(p) => Ok(p),
            other => Err(mismatch(EntityKind::Position, other.kind())),
        }
    }

    /// Unwrap a signature, failing with `Decode` for any other kind
    pub fn into_signature(self) -> Result<Signature> {
        match self {
            Document::Signature(s) => Ok(s),
            other => Err(mismatch(EntityKind::Signature, other.kind())),
        }
    }
}

fn mismatch(expected: EntityKind, found: EntityKind) -> Error {
    Error::decode(format!("expected {} document, found {}", expected, found))
}

impl From<Kifu> for Document {
    fn from(k: Kifu) -> Self {
        Document::Kifu(k)
    }
}

impl From<Step> for Document {
    fn from(s: Step) -> Self {
        Document::Step(s)
    }
}

impl From<Position> for Document {
    fn from(p: Position) -> Self {
        Document::Position(p)
    }
}

impl From<Signature> for Document {
    fn from(s: Signature) -> Self {
        Document::Signature(s)
    }
}
