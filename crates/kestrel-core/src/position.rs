//! The mutable game position searched by the engine.
//!
//! Moves are applied in place with [`Position::make_move`] and reverted with
//! [`Position::undo_move`]. Everything a move cannot reconstruct by itself
//! (castling rights, en passant square, halfmove clock, hashes, last capture
//! square) is kept on an undo stack.

use std::fmt;

use crate::attacks::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks};
use crate::bitboard::Bitboard;
use crate::castle_rights::CastleRights;
use crate::color::Color;
use crate::error::{MoveParseError, PositionError};
use crate::movegen;
use crate::moves::{Move, MoveType};
use crate::piece::{Piece, PieceKind};
use crate::repetition::RepetitionTable;
use crate::square::Square;
use crate::zobrist;

/// Checkers against one side's king.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attack {
    checkers: Bitboard,
}

impl Attack {
    #[inline]
    pub fn is_check(&self) -> bool {
        self.checkers.is_nonempty()
    }

    /// Number of pieces giving check.
    #[inline]
    pub fn count(&self) -> u32 {
        self.checkers.count()
    }

    #[inline]
    pub fn checkers(&self) -> Bitboard {
        self.checkers
    }
}

/// Coarse game stage derived from the material left on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamePhase {
    Opening,
    Middle,
    Endgame,
}

const OPENING_MATERIAL: i32 = PieceKind::King.value()
    + PieceKind::Queen.value()
    + 2 * PieceKind::Rook.value()
    + 2 * PieceKind::Bishop.value()
    + 2 * PieceKind::Knight.value();

const ENDGAME_MATERIAL: i32 = PieceKind::King.value() + 2 * PieceKind::Rook.value();

#[derive(Debug, Clone, Copy)]
struct Undo {
    castling: CastleRights,
    en_passant: Option<Square>,
    halfmove_clock: u16,
    hash: u64,
    pawn_hash: u64,
    capture_square: Option<Square>,
}

/// Board state seen by one side's pieces after a hypothetical move.
struct Outcome {
    occupied: Bitboard,
    ours: [Bitboard; PieceKind::COUNT],
    theirs: [Bitboard; PieceKind::COUNT],
}

#[derive(Clone)]
pub struct Position {
    squares: [Option<Piece>; Square::COUNT],
    pieces: [Bitboard; Piece::COUNT],
    sides: [Bitboard; Color::COUNT],
    occupied: Bitboard,
    side_to_move: Color,
    castling: CastleRights,
    en_passant: Option<Square>,
    halfmove_clock: u16,
    fullmove_number: u16,
    hash: u64,
    pawn_hash: u64,
    capture_square: Option<Square>,
    material_count: [u8; Color::COUNT],
    material_value: [i32; Color::COUNT],
    history: Vec<Undo>,
    repetitions: RepetitionTable,
}

impl Position {
    pub(crate) fn empty() -> Position {
        Position {
            squares: [None; Square::COUNT],
            pieces: [Bitboard::EMPTY; Piece::COUNT],
            sides: [Bitboard::EMPTY; Color::COUNT],
            occupied: Bitboard::EMPTY,
            side_to_move: Color::White,
            castling: CastleRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
            pawn_hash: 0,
            capture_square: None,
            material_count: [0; Color::COUNT],
            material_value: [0; Color::COUNT],
            history: Vec::with_capacity(512),
            repetitions: RepetitionTable::new(),
        }
    }

    /// The standard starting position.
    pub fn starting_position() -> Position {
        const BACK_RANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        let mut pos = Position::empty();
        for (file, kind) in BACK_RANK.into_iter().enumerate() {
            let file = file as u8;
            pos.put_piece(Piece::new(kind, Color::White), Square::new(file, 0));
            pos.put_piece(Piece::new(PieceKind::Pawn, Color::White), Square::new(file, 1));
            pos.put_piece(Piece::new(PieceKind::Pawn, Color::Black), Square::new(file, 6));
            pos.put_piece(Piece::new(kind, Color::Black), Square::new(file, 7));
        }
        pos.set_state(Color::White, CastleRights::ALL, None, 0, 1);
        pos
    }

    /// Install the non-placement state and fold it into the hash.
    pub(crate) fn set_state(
        &mut self,
        side_to_move: Color,
        castling: CastleRights,
        en_passant: Option<Square>,
        halfmove_clock: u16,
        fullmove_number: u16,
    ) {
        self.hash ^= zobrist::side(self.side_to_move)
            ^ zobrist::castling(self.castling)
            ^ zobrist::en_passant(self.en_passant);
        self.side_to_move = side_to_move;
        self.castling = castling;
        self.en_passant = en_passant;
        self.halfmove_clock = halfmove_clock;
        self.fullmove_number = fullmove_number.max(1);
        self.hash ^= zobrist::side(side_to_move)
            ^ zobrist::castling(castling)
            ^ zobrist::en_passant(en_passant);
    }

    // ── Accessors ──

    #[inline]
    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    #[inline]
    pub fn pieces(&self, kind: PieceKind, color: Color) -> Bitboard {
        self.pieces[Piece::new(kind, color).index()]
    }

    /// Pieces of `kind` for both colors.
    #[inline]
    pub fn kind(&self, kind: PieceKind) -> Bitboard {
        self.pieces(kind, Color::White) | self.pieces(kind, Color::Black)
    }

    #[inline]
    pub fn side(&self, color: Color) -> Bitboard {
        self.sides[color.index()]
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.occupied
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.pieces(PieceKind::King, color).lsb().unwrap_or(Square::A1)
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn castling(&self) -> CastleRights {
        self.castling
    }

    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    /// Zobrist hash of the full position.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Zobrist hash over pawns only.
    #[inline]
    pub fn pawn_hash(&self) -> u64 {
        self.pawn_hash
    }

    /// Target square of the last move if it captured.
    #[inline]
    pub fn capture_square(&self) -> Option<Square> {
        self.capture_square
    }

    /// Number of knights, bishops, rooks and queens.
    #[inline]
    pub fn material_count(&self, color: Color) -> u32 {
        u32::from(self.material_count[color.index()])
    }

    /// Sum of piece values, king included.
    #[inline]
    pub fn material_value(&self, color: Color) -> i32 {
        self.material_value[color.index()]
    }

    /// Number of moves made since the position was set up.
    #[inline]
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    pub fn game_phase(&self) -> GamePhase {
        let white = self.material_value(Color::White);
        let black = self.material_value(Color::Black);
        if white >= OPENING_MATERIAL && black >= OPENING_MATERIAL {
            GamePhase::Opening
        } else if white <= ENDGAME_MATERIAL
            || black <= ENDGAME_MATERIAL
            || self.material_count(Color::White) <= 2
            || self.material_count(Color::Black) <= 2
        {
            GamePhase::Endgame
        } else {
            GamePhase::Middle
        }
    }

    /// Whether the current position already occurred on this line.
    #[inline]
    pub fn is_repetition(&self) -> bool {
        self.repetitions.exists(self.hash)
    }

    pub fn repetitions(&self) -> &RepetitionTable {
        &self.repetitions
    }

    // ── Attacks ──

    /// Pieces of `by` attacking `sq` given the occupancy `occupied`.
    pub fn attackers(&self, sq: Square, by: Color, occupied: Bitboard) -> Bitboard {
        let bishops = self.pieces(PieceKind::Bishop, by) | self.pieces(PieceKind::Queen, by);
        let rooks = self.pieces(PieceKind::Rook, by) | self.pieces(PieceKind::Queen, by);
        (pawn_attacks(by.flip(), sq) & self.pieces(PieceKind::Pawn, by))
            | (knight_attacks(sq) & self.pieces(PieceKind::Knight, by))
            | (king_attacks(sq) & self.pieces(PieceKind::King, by))
            | (bishop_attacks(sq, occupied) & bishops)
            | (rook_attacks(sq, occupied) & rooks)
    }

    #[inline]
    pub fn is_attacked(&self, sq: Square, by: Color) -> bool {
        self.attackers(sq, by, self.occupied).is_nonempty()
    }

    /// Pieces checking `color`'s king.
    pub fn attack(&self, color: Color) -> Attack {
        let king = self.king_square(color);
        Attack {
            checkers: self.attackers(king, color.flip(), self.occupied),
        }
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        self.attack(self.side_to_move).is_check()
    }

    fn outcome(&self, mv: Move) -> Outcome {
        let us = self.side_to_move;
        let them = us.flip();
        let mut ours = [Bitboard::EMPTY; PieceKind::COUNT];
        let mut theirs = [Bitboard::EMPTY; PieceKind::COUNT];
        for kind in PieceKind::ALL {
            ours[kind.index()] = self.pieces(kind, us);
            theirs[kind.index()] = self.pieces(kind, them);
        }

        let moved = mv.moved().kind();
        let placed = mv.promotion().unwrap_or(moved);
        ours[moved.index()] = ours[moved.index()].without(mv.from());
        ours[placed.index()] = ours[placed.index()].with(mv.to());

        if let Some(captured) = mv.captured() {
            let at = capture_target(mv, us);
            theirs[captured.kind().index()] = theirs[captured.kind().index()].without(at);
        }
        if mv.move_type() == MoveType::Castling {
            let (rook_from, rook_to) = castling_rook_squares(mv.to());
            let rooks = &mut ours[PieceKind::Rook.index()];
            *rooks = rooks.without(rook_from).with(rook_to);
        }

        let occupied = ours
            .iter()
            .chain(theirs.iter())
            .fold(Bitboard::EMPTY, |acc, &bb| acc | bb);
        Outcome { occupied, ours, theirs }
    }

    /// Whether pseudo-legal `mv` keeps the mover's king safe.
    pub fn is_legal(&self, mv: Move) -> bool {
        let us = self.side_to_move;
        let after = self.outcome(mv);
        let king = match after.ours[PieceKind::King.index()].lsb() {
            Some(sq) => sq,
            None => return false,
        };
        attacked_in(&after.theirs, us, king, after.occupied).is_empty()
    }

    /// Whether `mv` gives check, directly or by discovery.
    pub fn is_checking_move(&self, mv: Move) -> bool {
        let them = self.side_to_move.flip();
        let after = self.outcome(mv);
        let king = match after.theirs[PieceKind::King.index()].lsb() {
            Some(sq) => sq,
            None => return false,
        };
        attacked_in(&after.ours, them, king, after.occupied).is_nonempty()
    }

    /// Whether `mv` is a move the current position could generate. Used to
    /// vet moves taken from tables keyed by hash or height.
    pub fn is_pseudo_legal(&self, mv: Move) -> bool {
        if mv.is_none() || mv.is_null() {
            return false;
        }
        let us = self.side_to_move;
        let (from, to, moved) = (mv.from(), mv.to(), mv.moved());
        if moved.color() != us || self.piece_on(from) != Some(moved) {
            return false;
        }
        match mv.move_type() {
            MoveType::Castling => {
                let mut found = false;
                movegen::castling_moves(self, &mut |candidate| found |= candidate == mv);
                return found;
            }
            MoveType::EnPassant => {
                return moved.kind() == PieceKind::Pawn
                    && self.en_passant == Some(to)
                    && mv.captured() == Some(Piece::new(PieceKind::Pawn, us.flip()))
                    && pawn_attacks(us, from).contains(to);
            }
            MoveType::Null => return false,
            MoveType::Normal | MoveType::PawnDouble | MoveType::Promotion => {}
        }

        // The target holds exactly the recorded capture
        if self.piece_on(to) != mv.captured() || mv.captured().is_some_and(|piece| piece.color() == us) {
            return false;
        }

        if moved.kind() != PieceKind::Pawn {
            return mv.move_type() == MoveType::Normal
                && movegen::piece_targets(moved.kind(), from, self.occupied).contains(to);
        }
        let promoting = from.relative_rank(us) == 6;
        if promoting != (mv.move_type() == MoveType::Promotion) || promoting != mv.promotion().is_some() {
            return false;
        }
        if mv.is_capture() {
            return pawn_attacks(us, from).contains(to);
        }
        let one = from.offset(us.forward());
        if mv.move_type() == MoveType::PawnDouble {
            from.relative_rank(us) == 1 && !self.occupied.contains(one) && to == one.offset(us.forward())
        } else {
            to == one
        }
    }

    // ── Make / undo ──

    pub(crate) fn put_piece(&mut self, piece: Piece, sq: Square) {
        debug_assert!(self.squares[sq.index()].is_none());
        let color = piece.color().index();
        self.squares[sq.index()] = Some(piece);
        self.pieces[piece.index()] = self.pieces[piece.index()].with(sq);
        self.sides[color] = self.sides[color].with(sq);
        self.occupied = self.occupied.with(sq);

        let key = zobrist::piece_square(piece, sq);
        self.hash ^= key;
        if piece.kind() == PieceKind::Pawn {
            self.pawn_hash ^= key;
        }
        if piece.kind().is_officer() {
            self.material_count[color] += 1;
        }
        self.material_value[color] += piece.kind().value();
    }

    fn remove_piece(&mut self, sq: Square) -> Option<Piece> {
        let piece = self.squares[sq.index()].take()?;
        let color = piece.color().index();
        self.pieces[piece.index()] = self.pieces[piece.index()].without(sq);
        self.sides[color] = self.sides[color].without(sq);
        self.occupied = self.occupied.without(sq);

        let key = zobrist::piece_square(piece, sq);
        self.hash ^= key;
        if piece.kind() == PieceKind::Pawn {
            self.pawn_hash ^= key;
        }
        if piece.kind().is_officer() {
            self.material_count[color] -= 1;
        }
        self.material_value[color] -= piece.kind().value();
        Some(piece)
    }

    fn shift_piece(&mut self, from: Square, to: Square) {
        if let Some(piece) = self.remove_piece(from) {
            self.put_piece(piece, to);
        }
    }

    fn push_undo(&mut self) {
        self.history.push(Undo {
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            hash: self.hash,
            pawn_hash: self.pawn_hash,
            capture_square: self.capture_square,
        });
    }

    fn pop_undo(&mut self) -> Option<Undo> {
        let undo = self.history.pop()?;
        self.castling = undo.castling;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.hash = undo.hash;
        self.pawn_hash = undo.pawn_hash;
        self.capture_square = undo.capture_square;
        Some(undo)
    }

    /// Play `mv`, which must be pseudo-legal in this position.
    pub fn make_move(&mut self, mv: Move) {
        debug_assert!(!mv.is_none() && !mv.is_null());
        let us = self.side_to_move;
        let from = mv.from();
        let to = mv.to();

        self.push_undo();
        self.repetitions.put(self.hash);

        self.hash ^= zobrist::en_passant(self.en_passant) ^ zobrist::castling(self.castling);
        self.en_passant = None;
        self.capture_square = None;
        self.halfmove_clock += 1;

        if mv.captured().is_some() {
            self.remove_piece(capture_target(mv, us));
            self.capture_square = Some(to);
            self.halfmove_clock = 0;
        }

        match mv.move_type() {
            MoveType::Promotion => {
                self.remove_piece(from);
                let kind = mv.promotion().unwrap_or(PieceKind::Queen);
                self.put_piece(Piece::new(kind, us), to);
            }
            MoveType::Castling => {
                self.shift_piece(from, to);
                let (rook_from, rook_to) = castling_rook_squares(to);
                self.shift_piece(rook_from, rook_to);
            }
            MoveType::PawnDouble => {
                self.shift_piece(from, to);
                self.en_passant = Some(from.offset(us.forward()));
            }
            MoveType::Normal | MoveType::EnPassant | MoveType::Null => self.shift_piece(from, to),
        }

        if mv.moved().kind() == PieceKind::Pawn {
            self.halfmove_clock = 0;
        }

        self.castling = self.castling.revoke(from).revoke(to);
        self.hash ^= zobrist::en_passant(self.en_passant) ^ zobrist::castling(self.castling);

        if us == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = us.flip();
        self.hash ^= zobrist::KEYS.black_to_move;
    }

    /// Take back `mv`, which must be the last move made.
    pub fn undo_move(&mut self, mv: Move) {
        let us = self.side_to_move.flip();
        let from = mv.from();
        let to = mv.to();
        self.side_to_move = us;
        if us == Color::Black {
            self.fullmove_number -= 1;
        }

        match mv.move_type() {
            MoveType::Promotion => {
                self.remove_piece(to);
                self.put_piece(mv.moved(), from);
            }
            MoveType::Castling => {
                let (rook_from, rook_to) = castling_rook_squares(to);
                self.shift_piece(rook_to, rook_from);
                self.shift_piece(to, from);
            }
            _ => self.shift_piece(to, from),
        }
        if let Some(captured) = mv.captured() {
            self.put_piece(captured, capture_target(mv, us));
        }

        if self.pop_undo().is_some() {
            self.repetitions.remove(self.hash);
        }
    }

    /// Pass the turn. Not recorded for repetition detection.
    pub fn make_null_move(&mut self) {
        self.push_undo();
        self.hash ^= zobrist::en_passant(self.en_passant) ^ zobrist::KEYS.black_to_move;
        self.en_passant = None;
        self.capture_square = None;
        self.halfmove_clock += 1;
        self.side_to_move = self.side_to_move.flip();
    }

    pub fn undo_null_move(&mut self) {
        self.side_to_move = self.side_to_move.flip();
        self.pop_undo();
    }

    // ── Utilities ──

    /// The same position with colors swapped and the board flipped vertically.
    pub fn mirrored(&self) -> Position {
        let mut pos = Position::empty();
        for sq in self.occupied {
            if let Some(piece) = self.piece_on(sq) {
                pos.put_piece(piece.flip(), sq.mirror());
            }
        }
        pos.set_state(
            self.side_to_move.flip(),
            self.castling.mirror(),
            self.en_passant.map(Square::mirror),
            self.halfmove_clock,
            self.fullmove_number,
        );
        pos
    }

    /// Resolve coordinate notation against the legal moves of this position.
    pub fn parse_move(&self, text: &str) -> Result<Move, MoveParseError> {
        let malformed = || MoveParseError::Malformed(text.to_string());
        if !(4..=5).contains(&text.len()) || !text.is_ascii() {
            return Err(malformed());
        }
        let from = Square::from_algebraic(&text[0..2]).ok_or_else(malformed)?;
        let to = Square::from_algebraic(&text[2..4]).ok_or_else(malformed)?;
        let promotion = match text[4..].chars().next() {
            None => None,
            Some(c) => match PieceKind::from_letter(c) {
                Some(kind @ (PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen)) => {
                    Some(kind)
                }
                _ => return Err(malformed()),
            },
        };

        movegen::legal_moves(self)
            .iter()
            .copied()
            .find(|mv| mv.from() == from && mv.to() == to && mv.promotion() == promotion)
            .ok_or_else(|| MoveParseError::Illegal(text.to_string()))
    }

    /// Check the structural rules every reachable position obeys.
    pub fn validate(&self) -> Result<(), PositionError> {
        for color in Color::ALL {
            let count = self.pieces(PieceKind::King, color).count();
            if count != 1 {
                let color = match color {
                    Color::White => "white",
                    Color::Black => "black",
                };
                return Err(PositionError::KingCount { color, count });
            }
        }
        let back_ranks = Bitboard::RANK_1 | Bitboard::RANK_8;
        if let Some(sq) = (self.kind(PieceKind::Pawn) & back_ranks).lsb() {
            return Err(PositionError::PawnOnBackRank { square: sq.to_string() });
        }
        if self.attack(self.side_to_move.flip()).is_check() {
            return Err(PositionError::OpponentInCheck);
        }
        Ok(())
    }

    /// Recompute both hashes from scratch.
    pub fn compute_hashes(&self) -> (u64, u64) {
        let mut hash = zobrist::side(self.side_to_move)
            ^ zobrist::castling(self.castling)
            ^ zobrist::en_passant(self.en_passant);
        let mut pawn_hash = 0;
        for sq in self.occupied {
            if let Some(piece) = self.piece_on(sq) {
                let key = zobrist::piece_square(piece, sq);
                hash ^= key;
                if piece.kind() == PieceKind::Pawn {
                    pawn_hash ^= key;
                }
            }
        }
        (hash, pawn_hash)
    }
}

/// Square the captured piece stands on.
#[inline]
fn capture_target(mv: Move, us: Color) -> Square {
    if mv.move_type() == MoveType::EnPassant {
        mv.to().offset(-us.forward())
    } else {
        mv.to()
    }
}

/// Rook origin and target for a castling move landing the king on `king_to`.
#[inline]
pub(crate) fn castling_rook_squares(king_to: Square) -> (Square, Square) {
    match king_to {
        Square::G1 => (Square::H1, Square::F1),
        Square::C1 => (Square::A1, Square::D1),
        Square::G8 => (Square::H8, Square::F8),
        _ => (Square::A8, Square::D8),
    }
}

/// Pieces in `attackers` (indexed by kind) hitting `victim`'s square `sq`.
fn attacked_in(
    attackers: &[Bitboard; PieceKind::COUNT],
    victim: Color,
    sq: Square,
    occupied: Bitboard,
) -> Bitboard {
    let queens = attackers[PieceKind::Queen.index()];
    (pawn_attacks(victim, sq) & attackers[PieceKind::Pawn.index()])
        | (knight_attacks(sq) & attackers[PieceKind::Knight.index()])
        | (king_attacks(sq) & attackers[PieceKind::King.index()])
        | (bishop_attacks(sq, occupied) & (attackers[PieceKind::Bishop.index()] | queens))
        | (rook_attacks(sq, occupied) & (attackers[PieceKind::Rook.index()] | queens))
}

impl Default for Position {
    fn default() -> Self {
        Position::starting_position()
    }
}

impl PartialEq for Position {
    /// Positions are equal when the board and game state match. The undo
    /// stack and line history are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.squares == other.squares
            && self.side_to_move == other.side_to_move
            && self.castling == other.castling
            && self.en_passant == other.en_passant
            && self.halfmove_clock == other.halfmove_clock
            && self.fullmove_number == other.fullmove_number
    }
}

impl Eq for Position {}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        for rank in (0..8u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8u8 {
                let c = self.piece_on(Square::new(file, rank)).map_or('.', Piece::fen_char);
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "   a b c d e f g h")?;
        write!(f, "{}", self.to_fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(fen: &str) -> Position {
        fen.parse().unwrap()
    }

    fn play(position: &mut Position, text: &str) -> Move {
        let mv = position.parse_move(text).unwrap();
        position.make_move(mv);
        mv
    }

    #[test]
    fn starting_position_matches_fen() {
        let start = Position::starting_position();
        assert_eq!(start, pos(crate::STARTING_FEN));
        assert_eq!(start.hash(), pos(crate::STARTING_FEN).hash());
        assert_eq!(start.material_count(Color::White), 7);
        assert_eq!(start.game_phase(), GamePhase::Opening);
    }

    #[test]
    fn make_undo_restores_everything() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let mut position = pos(fen);
        let original = position.clone();
        for mv in movegen::legal_moves(&original).iter().copied() {
            position.make_move(mv);
            let (hash, pawn_hash) = position.compute_hashes();
            assert_eq!(position.hash(), hash, "{mv}");
            assert_eq!(position.pawn_hash(), pawn_hash, "{mv}");
            position.undo_move(mv);
            assert_eq!(position, original, "{mv}");
            assert_eq!(position.hash(), original.hash());
            assert!(position.repetitions().is_empty());
        }
    }

    #[test]
    fn en_passant_and_capture_square() {
        let mut position = pos("4k3/8/8/8/1p6/8/P7/4K3 w - - 0 1");
        play(&mut position, "a2a4");
        assert_eq!(position.en_passant(), Square::from_algebraic("a3"));
        let ep = play(&mut position, "b4a3");
        assert_eq!(ep.move_type(), MoveType::EnPassant);
        assert_eq!(position.capture_square(), Square::from_algebraic("a3"));
        assert!(position.kind(PieceKind::Pawn).count() == 1);
        assert_eq!(position.halfmove_clock(), 0);
    }

    #[test]
    fn castling_moves_rook_and_revokes_rights() {
        let mut position = pos("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let mv = play(&mut position, "e1g1");
        assert_eq!(mv.move_type(), MoveType::Castling);
        assert_eq!(position.piece_on(Square::F1), Some(Piece::new(PieceKind::Rook, Color::White)));
        assert_eq!(position.castling().to_string(), "kq");
        position.undo_move(mv);
        assert_eq!(position.piece_on(Square::H1), Some(Piece::new(PieceKind::Rook, Color::White)));
        assert_eq!(position.castling(), CastleRights::ALL);
    }

    #[test]
    fn null_move_round_trip() {
        let mut position = pos("4k3/8/8/8/1p6/8/P7/4K3 w - - 0 1");
        play(&mut position, "a2a4");
        let before = position.clone();
        position.make_null_move();
        assert_eq!(position.side_to_move(), Color::White);
        assert_eq!(position.en_passant(), None);
        assert_ne!(position.hash(), before.hash());
        position.undo_null_move();
        assert_eq!(position, before);
        assert_eq!(position.hash(), before.hash());
    }

    #[test]
    fn checking_moves_direct_and_discovered() {
        let position = pos("4k3/8/8/8/8/8/4B3/R3K3 w - - 0 1");
        assert!(position.is_checking_move(position.parse_move("a1a8").unwrap()));
        assert!(!position.is_checking_move(position.parse_move("a1a7").unwrap()));
        let discovered = pos("4k3/8/8/8/8/8/4B3/4RK2 w - - 0 1");
        assert!(discovered.is_checking_move(discovered.parse_move("e2b5").unwrap()));
    }

    #[test]
    fn pseudo_legality_matches_generation() {
        let positions: Vec<Position> = [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
            "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1",
        ]
        .into_iter()
        .map(pos)
        .collect();
        let generated: Vec<Vec<Move>> = positions
            .iter()
            .map(|position| {
                let mut moves = Vec::new();
                movegen::generate_all(position, |mv| moves.push(mv));
                moves
            })
            .collect();

        for (position, own) in positions.iter().zip(&generated) {
            for mv in generated.iter().flatten() {
                assert_eq!(position.is_pseudo_legal(*mv), own.contains(mv), "{mv} in {position:?}");
            }
            assert!(!position.is_pseudo_legal(Move::NONE));
            assert!(!position.is_pseudo_legal(Move::NULL));
        }
    }

    #[test]
    fn pinned_piece_moves_are_illegal() {
        let position = pos("4k3/4r3/8/8/8/8/4N3/4K3 w - - 0 1");
        let moves = movegen::legal_moves(&position);
        assert!(moves.iter().all(|mv| mv.moved().kind() != PieceKind::Knight));
    }

    #[test]
    fn repetition_along_the_line() {
        let mut position = Position::starting_position();
        for mv in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            play(&mut position, mv);
        }
        assert!(position.is_repetition());
        let mut fresh = Position::starting_position();
        play(&mut fresh, "g1f3");
        assert!(!fresh.is_repetition());
    }

    #[test]
    fn mirrored_position_swaps_sides() {
        let position = pos("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        let mirrored = position.mirrored();
        assert_eq!(mirrored.side_to_move(), Color::Black);
        assert_eq!(mirrored.material_value(Color::Black), position.material_value(Color::White));
        assert_eq!(mirrored.mirrored(), position);
        assert_eq!(mirrored.compute_hashes().0, mirrored.hash());
    }

    #[test]
    fn game_phase_endgame() {
        assert_eq!(pos("4k3/8/8/8/8/8/8/R3K2R w - - 0 1").game_phase(), GamePhase::Endgame);
        assert_eq!(
            pos("r1b1k2r/pppp1ppp/2n2n2/8/8/2N2N2/PPPP1PPP/R1B1K2R w KQkq - 0 1").game_phase(),
            GamePhase::Middle
        );
    }

    #[test]
    fn parse_move_errors() {
        let position = Position::starting_position();
        assert!(matches!(position.parse_move("e2e5"), Err(MoveParseError::Illegal(_))));
        assert!(matches!(position.parse_move("e2"), Err(MoveParseError::Malformed(_))));
        assert!(matches!(position.parse_move("e7e8x"), Err(MoveParseError::Malformed(_))));
    }

    #[test]
    fn validate_rejects_opponent_in_check() {
        let mut position = Position::empty();
        position.put_piece(Piece::new(PieceKind::King, Color::White), Square::E1);
        position.put_piece(Piece::new(PieceKind::King, Color::Black), Square::E8);
        position.put_piece(Piece::new(PieceKind::Rook, Color::White), Square::new(4, 4));
        assert_eq!(position.validate(), Err(PositionError::OpponentInCheck));
    }
}
