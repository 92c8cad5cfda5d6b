//! Pseudo-legal move generation.
//!
//! Generators push moves into a caller-provided sink so the staged move
//! picker can fill its own buffers. [`legal_moves`] filters the full set
//! with [`Position::is_legal`].

use crate::attacks::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, queen_attacks, rook_attacks};
use crate::bitboard::Bitboard;
use crate::castle_rights::CastleSide;
use crate::color::Color;
use crate::moves::{Move, MoveType};
use crate::piece::{Piece, PieceKind};
use crate::position::Position;
use crate::square::Square;

/// Stack-allocated buffer for generated moves. 256 covers the theoretical maximum of 218.
pub struct MoveList {
    moves: [Move; 256],
    len: usize,
}

impl MoveList {
    pub fn new() -> MoveList {
        MoveList {
            moves: [Move::NONE; 256],
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, mv: Move) {
        debug_assert!(self.len < 256);
        self.moves[self.len] = mv;
        self.len += 1;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Move] {
        &mut self.moves[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.as_slice().iter()
    }

    pub fn contains(&self, mv: Move) -> bool {
        self.as_slice().contains(&mv)
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<usize> for MoveList {
    type Output = Move;
    #[inline]
    fn index(&self, index: usize) -> &Move {
        &self.as_slice()[index]
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for MoveList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

const PROMOTIONS: [PieceKind; 4] = [PieceKind::Queen, PieceKind::Rook, PieceKind::Bishop, PieceKind::Knight];

fn push_promotions(from: Square, to: Square, pawn: Piece, captured: Option<Piece>, sink: &mut impl FnMut(Move)) {
    for kind in PROMOTIONS {
        sink(Move::new(MoveType::Promotion, from, to, pawn, captured, Some(kind)));
    }
}

pub(crate) fn piece_targets(kind: PieceKind, sq: Square, occupied: Bitboard) -> Bitboard {
    match kind {
        PieceKind::Knight => knight_attacks(sq),
        PieceKind::Bishop => bishop_attacks(sq, occupied),
        PieceKind::Rook => rook_attacks(sq, occupied),
        PieceKind::Queen => queen_attacks(sq, occupied),
        PieceKind::King => king_attacks(sq),
        PieceKind::Pawn => Bitboard::EMPTY,
    }
}

/// Moves of every non-pawn piece of the side to move onto `targets`.
fn piece_moves(pos: &Position, targets: Bitboard, sink: &mut impl FnMut(Move)) {
    let us = pos.side_to_move();
    for kind in [PieceKind::Knight, PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen, PieceKind::King] {
        let piece = Piece::new(kind, us);
        for from in pos.pieces(kind, us) {
            for to in piece_targets(kind, from, pos.occupied()) & targets {
                sink(Move::new(MoveType::Normal, from, to, piece, pos.piece_on(to), None));
            }
        }
    }
}

/// Captures, en passant and every promotion (quiet ones included).
pub fn generate_captures(pos: &Position, mut sink: impl FnMut(Move)) {
    let us = pos.side_to_move();
    let them = us.flip();
    let enemies = pos.side(them);
    let pawn = Piece::new(PieceKind::Pawn, us);

    for from in pos.pieces(PieceKind::Pawn, us) {
        let promoting = from.relative_rank(us) == 6;
        for to in pawn_attacks(us, from) & enemies {
            let captured = pos.piece_on(to);
            if promoting {
                push_promotions(from, to, pawn, captured, &mut sink);
            } else {
                sink(Move::new(MoveType::Normal, from, to, pawn, captured, None));
            }
        }
        if promoting {
            let to = from.offset(us.forward());
            if !pos.occupied().contains(to) {
                push_promotions(from, to, pawn, None, &mut sink);
            }
        }
    }

    if let Some(ep) = pos.en_passant() {
        let captured = Piece::new(PieceKind::Pawn, them);
        for from in pawn_attacks(them, ep) & pos.pieces(PieceKind::Pawn, us) {
            sink(Move::new(MoveType::EnPassant, from, ep, pawn, Some(captured), None));
        }
    }

    piece_moves(pos, enemies, &mut sink);
}

/// Non-capturing, non-promoting moves including castling.
pub fn generate_quiets(pos: &Position, mut sink: impl FnMut(Move)) {
    let us = pos.side_to_move();
    let empty = !pos.occupied();
    let pawn = Piece::new(PieceKind::Pawn, us);

    for from in pos.pieces(PieceKind::Pawn, us) {
        let rank = from.relative_rank(us);
        if rank == 6 {
            continue;
        }
        let one = from.offset(us.forward());
        if !empty.contains(one) {
            continue;
        }
        sink(Move::new(MoveType::Normal, from, one, pawn, None, None));
        if rank == 1 {
            let two = one.offset(us.forward());
            if empty.contains(two) {
                sink(Move::new(MoveType::PawnDouble, from, two, pawn, None, None));
            }
        }
    }

    piece_moves(pos, empty, &mut sink);
    castling_moves(pos, &mut sink);
}

pub(crate) fn castling_moves(pos: &Position, sink: &mut impl FnMut(Move)) {
    let us = pos.side_to_move();
    let them = us.flip();
    let rights = pos.castling();
    let (king_from, rank) = match us {
        Color::White => (Square::E1, 0),
        Color::Black => (Square::E8, 7),
    };
    let king = Piece::new(PieceKind::King, us);
    if rights.is_empty() || pos.piece_on(king_from) != Some(king) {
        return;
    }
    let rook = Some(Piece::new(PieceKind::Rook, us));

    for side in CastleSide::ALL {
        if !rights.has(us, side) {
            continue;
        }
        // (rook file, king target file, files that must be empty, files the king crosses)
        let (rook_file, target_file, between, crossed): (u8, u8, &[u8], [u8; 2]) = match side {
            CastleSide::KingSide => (7, 6, &[5, 6], [4, 5]),
            CastleSide::QueenSide => (0, 2, &[1, 2, 3], [4, 3]),
        };
        if pos.piece_on(Square::new(rook_file, rank)) != rook {
            continue;
        }
        if between.iter().any(|&file| pos.occupied().contains(Square::new(file, rank))) {
            continue;
        }
        if crossed.iter().any(|&file| pos.is_attacked(Square::new(file, rank), them)) {
            continue;
        }
        let to = Square::new(target_file, rank);
        sink(Move::new(MoveType::Castling, king_from, to, king, None, None));
    }
}

/// Quiet moves that give check.
pub fn generate_quiet_checks(pos: &Position, mut sink: impl FnMut(Move)) {
    generate_quiets(pos, |mv| {
        if pos.is_checking_move(mv) {
            sink(mv);
        }
    });
}

/// Every pseudo-legal move.
pub fn generate_all(pos: &Position, mut sink: impl FnMut(Move)) {
    generate_captures(pos, &mut sink);
    generate_quiets(pos, &mut sink);
}

/// Every legal move.
pub fn legal_moves(pos: &Position) -> MoveList {
    let mut list = MoveList::new();
    generate_all(pos, |mv| {
        if pos.is_legal(mv) {
            list.push(mv);
        }
    });
    list
}
