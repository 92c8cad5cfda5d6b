//! Board collaborator for the kestrel search: position state with make/undo,
//! incremental hashing, attack detection, and legal move generation.

mod attacks;
mod bitboard;
mod castle_rights;
mod color;
mod error;
mod fen;
mod movegen;
mod moves;
mod perft;
mod piece;
mod position;
mod repetition;
mod square;
mod zobrist;

pub use attacks::{
    bishop_attacks, king_attacks, knight_attacks, pawn_attacks, queen_attacks, rook_attacks,
};
pub use bitboard::Bitboard;
pub use castle_rights::{CastleRights, CastleSide};
pub use color::Color;
pub use error::{FenError, MoveParseError, PositionError};
pub use fen::STARTING_FEN;
pub use movegen::{
    MoveList, generate_all, generate_captures, generate_quiet_checks, generate_quiets, legal_moves,
};
pub use moves::{Move, MoveType};
pub use perft::{divide, perft};
pub use piece::{Piece, PieceKind};
pub use position::{Attack, GamePhase, Position};
pub use repetition::RepetitionTable;
pub use square::Square;
