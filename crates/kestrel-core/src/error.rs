//! Error types for FEN parsing, position validation and move parsing.

use thiserror::Error;

/// A FEN string that cannot be turned into a position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected 4 to 6 FEN fields, found {found}")]
    WrongFieldCount { found: usize },

    #[error("expected 8 ranks in piece placement, found {found}")]
    WrongRankCount { found: usize },

    /// `rank_index` counts from the top of the board as written in FEN.
    #[error("rank {rank_index} describes {length} squares, expected 8")]
    BadRankLength { rank_index: usize, length: usize },

    #[error("invalid piece character '{character}'")]
    InvalidPiece { character: char },

    #[error("invalid active color \"{found}\"")]
    InvalidColor { found: String },

    #[error("invalid castling character '{character}'")]
    InvalidCastling { character: char },

    #[error("invalid en passant square \"{found}\"")]
    InvalidEnPassant { found: String },

    #[error("invalid {field} \"{found}\"")]
    InvalidMoveCounter { field: &'static str, found: String },

    #[error("invalid position: {0}")]
    Invalid(#[from] PositionError),
}

/// A structurally impossible position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("{color} has {count} kings, expected exactly one")]
    KingCount { color: &'static str, count: u32 },

    #[error("pawn on back rank at {square}")]
    PawnOnBackRank { square: String },

    #[error("side not to move is in check")]
    OpponentInCheck,
}

/// A coordinate-notation move that cannot be played.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("malformed move \"{0}\"")]
    Malformed(String),

    #[error("illegal move \"{0}\"")]
    Illegal(String),
}
