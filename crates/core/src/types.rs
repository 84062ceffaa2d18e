//! Entity types for game records
//!
//! A game record ("kifu") is a tree:
//! - `Kifu`: the header, owned by one user
//! - `Step`: one ply, dense ordinals from 0 (seq 0 is the initial position)
//! - `Position`: back-reference from a board state to the step that reached it
//! - `Signature`: dedup marker keyed by the full game's `sfen`
//!
//! None of these types carry a version; reads wrap them in
//! [`Versioned`](crate::Versioned).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::contract::Versioned;

/// Generate a fresh kifu identifier (UUID v4, hyphenated)
pub fn new_kifu_id() -> String {
    Uuid::new_v4().to_string()
}

/// Handicap of a game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handicap {
    /// Even game
    #[default]
    None,
    /// Lance
    DropL,
    /// Right lance
    DropLR,
    /// Bishop
    DropB,
    /// Rook
    DropR,
    /// Rook and lance
    DropRL,
    /// Two pieces
    DropTwo,
    /// Three pieces
    DropThree,
    /// Four pieces
    DropFour,
    /// Five pieces
    DropFive,
    /// Left five pieces
    DropFiveL,
    /// Six pieces
    DropSix,
    /// Eight pieces
    DropEight,
    /// Ten pieces
    DropTen,
    /// Anything else
    Other,
}

/// Piece kinds, including promoted forms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Piece {
    /// No piece
    #[default]
    Null,
    /// King
    Gyoku,
    /// Rook
    Hisha,
    /// Promoted rook
    Ryu,
    /// Bishop
    Kaku,
    /// Promoted bishop
    Uma,
    /// Gold
    Kin,
    /// Silver
    Gin,
    /// Promoted silver
    NariGin,
    /// Knight
    Kei,
    /// Promoted knight
    NariKei,
    /// Lance
    Kyou,
    /// Promoted lance
    NariKyou,
    /// Pawn
    Fu,
    /// Promoted pawn
    To,
}

/// How a game ended at a given step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinishedStatus {
    /// Ordinary move
    #[default]
    NotFinished,
    /// Game suspended
    Suspend,
    /// Resignation
    Surrender,
    /// Draw
    Draw,
    /// Draw by repetition
    RepetitionDraw,
    /// Checkmate
    Checkmate,
    /// Time forfeit
    OverTimeLimit,
    /// Loss by illegal move
    FoulLoss,
    /// Win by opponent's illegal move
    FoulWin,
    /// Win by entering king
    NyugyokuWin,
}

/// Side to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerOrder {
    /// First player
    Black,
    /// Second player
    White,
}

/// A player listed in the header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Side played
    pub order: PlayerOrder,
    /// Display name
    pub name: String,
    /// Free-text note
    pub note: String,
}

/// Board square, 1-based file (`x`) and rank (`y`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    /// File
    pub x: u8,
    /// Rank
    pub y: u8,
}

/// Game record header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kifu {
    /// Owner
    pub user_id: String,
    /// Record identifier, unique per owner
    pub kifu_id: String,
    /// Submission time (unix seconds)
    pub created_ts: i64,
    /// Game start (unix seconds, 0 if unknown)
    pub start_ts: i64,
    /// Game end (unix seconds, 0 if unknown)
    pub end_ts: i64,
    /// Handicap
    pub handicap: Handicap,
    /// Tournament or game name
    pub game_name: String,
    /// Free-text note
    pub note: String,
    /// Players in header order
    pub players: Vec<Player>,
    /// Header fields with no dedicated attribute
    pub other_fields: BTreeMap<String, String>,
    /// Signature of the full game, used for duplicate detection
    pub sfen: String,
}

impl Kifu {
    /// Create an empty header for the given owner and record id
    pub fn new(user_id: impl Into<String>, kifu_id: impl Into<String>) -> Self {
        Kifu {
            user_id: user_id.into(),
            kifu_id: kifu_id.into(),
            ..Default::default()
        }
    }
}

/// One ply of a game record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Owner of the record
    pub user_id: String,
    /// Record the step belongs to
    pub kifu_id: String,
    /// Dense ordinal, 0 = initial position
    pub seq: u32,
    /// Move in engine notation, empty for seq 0 and terminal steps
    pub sfen_move: String,
    /// Source square, `None` for drops
    pub src: Option<Pos>,
    /// Destination square
    pub dst: Option<Pos>,
    /// Piece moved
    pub piece: Piece,
    /// Piece captured, `Piece::Null` if none
    pub captured: Piece,
    /// Move promotes
    pub promoted: bool,
    /// Move is a drop
    pub drop: bool,
    /// Terminal status, if the game ended at this step
    pub finished_status: FinishedStatus,
    /// Elapsed game time at this step (seconds)
    pub timestamp_sec: i64,
    /// Time spent on this move (seconds)
    pub thinking_sec: i64,
    /// Commentary
    pub notes: Vec<String>,
    /// Board position reached after this step
    pub position: String,
}

impl Step {
    /// Create a step with only identity and resulting position set
    pub fn new(
        user_id: impl Into<String>,
        kifu_id: impl Into<String>,
        seq: u32,
        position: impl Into<String>,
    ) -> Self {
        Step {
            user_id: user_id.into(),
            kifu_id: kifu_id.into(),
            seq,
            position: position.into(),
            ..Default::default()
        }
    }
}

/// Index row: `position` was reached by step `seq` of `kifu_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Owner of the record
    pub user_id: String,
    /// Record that reached the position
    pub kifu_id: String,
    /// Step that reached the position
    pub seq: u32,
    /// Board position string
    pub position: String,
}

/// Duplicate-detection marker for a full game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Signature of the full game
    pub sfen: String,
    /// Owner of the record
    pub user_id: String,
    /// Record carrying this signature
    pub kifu_id: String,
    /// Submission time of the record (unix seconds)
    pub created_ts: i64,
}

/// One hit of a same-position search
#[derive(Debug, Clone, PartialEq)]
pub struct PositionMatch {
    /// Owner of the matched record
    pub user_id: String,
    /// Matched record
    pub kifu_id: String,
    /// Step that reached the searched position
    pub seq: u32,
    /// Steps following `seq`, in seq order; empty when none were requested
    pub steps: Vec<Versioned<Step>>,
}
