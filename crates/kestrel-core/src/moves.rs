//! Move encoding.
//!
//! A move carries everything the search needs without consulting the board:
//! its type, both squares, the moving piece, any captured piece and the
//! promotion kind. Two moves are the same move exactly when their encodings
//! are equal.

use std::fmt;

use crate::piece::{Piece, PieceKind};
use crate::square::Square;

const TYPE_MASK: u32 = 0x7;
const FROM_SHIFT: u32 = 3;
const TO_SHIFT: u32 = 9;
const MOVED_SHIFT: u32 = 15;
const CAPTURED_SHIFT: u32 = 19;
const PROMOTION_SHIFT: u32 = 23;
const SQUARE_MASK: u32 = 0x3F;
const PIECE_MASK: u32 = 0xF;

/// How a move changes the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MoveType {
    Normal = 0,
    PawnDouble = 1,
    Castling = 2,
    EnPassant = 3,
    Promotion = 4,
    Null = 5,
}

impl MoveType {
    const fn from_bits(bits: u32) -> MoveType {
        match bits {
            1 => MoveType::PawnDouble,
            2 => MoveType::Castling,
            3 => MoveType::EnPassant,
            4 => MoveType::Promotion,
            5 => MoveType::Null,
            _ => MoveType::Normal,
        }
    }
}

/// A packed move.
///
/// ```text
/// bits  0-2   move type
/// bits  3-8   origin square
/// bits  9-14  target square
/// bits 15-18  moved piece + 1
/// bits 19-22  captured piece + 1 (0 = none)
/// bits 23-25  promotion kind (0 = none)
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Move(u32);

impl Move {
    /// "No move". Never produced by a generator.
    pub const NONE: Move = Move(0);

    /// The pass move used by null-move pruning.
    pub const NULL: Move = Move(MoveType::Null as u32);

    pub const fn new(
        move_type: MoveType,
        from: Square,
        to: Square,
        moved: Piece,
        captured: Option<Piece>,
        promotion: Option<PieceKind>,
    ) -> Move {
        let captured_bits = match captured {
            Some(piece) => piece.index() as u32 + 1,
            None => 0,
        };
        let promotion_bits = match promotion {
            Some(kind) => kind.index() as u32,
            None => 0,
        };
        Move(
            move_type as u32
                | (from.index() as u32) << FROM_SHIFT
                | (to.index() as u32) << TO_SHIFT
                | (moved.index() as u32 + 1) << MOVED_SHIFT
                | captured_bits << CAPTURED_SHIFT
                | promotion_bits << PROMOTION_SHIFT,
        )
    }

    /// Raw encoding, for compact table storage.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Rebuild a move from [`Move::raw`].
    #[inline]
    pub const fn from_raw(raw: u32) -> Move {
        Move(raw)
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == Move::NULL.0
    }

    #[inline]
    pub const fn move_type(self) -> MoveType {
        MoveType::from_bits(self.0 & TYPE_MASK)
    }

    #[inline]
    pub const fn from(self) -> Square {
        Square::from_index_unchecked(((self.0 >> FROM_SHIFT) & SQUARE_MASK) as u8)
    }

    #[inline]
    pub const fn to(self) -> Square {
        Square::from_index_unchecked(((self.0 >> TO_SHIFT) & SQUARE_MASK) as u8)
    }

    /// The piece that moves. Only meaningful for real moves.
    #[inline]
    pub fn moved(self) -> Piece {
        let bits = ((self.0 >> MOVED_SHIFT) & PIECE_MASK) as u8;
        debug_assert!(bits != 0, "moved piece of an empty move");
        Piece::from_index_unchecked(bits.saturating_sub(1))
    }

    #[inline]
    pub fn captured(self) -> Option<Piece> {
        let bits = ((self.0 >> CAPTURED_SHIFT) & PIECE_MASK) as u8;
        if bits == 0 { None } else { Piece::from_index(bits - 1) }
    }

    #[inline]
    pub fn promotion(self) -> Option<PieceKind> {
        let bits = ((self.0 >> PROMOTION_SHIFT) & TYPE_MASK) as u8;
        if bits == 0 { None } else { PieceKind::from_index(bits) }
    }

    #[inline]
    pub const fn is_capture(self) -> bool {
        (self.0 >> CAPTURED_SHIFT) & PIECE_MASK != 0
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        matches!(self.move_type(), MoveType::Promotion)
    }

    /// Neither a capture nor a promotion.
    #[inline]
    pub const fn is_quiet(self) -> bool {
        !self.is_capture() && !self.is_promotion()
    }

    /// Coordinate notation, e.g. `e2e4`, `e7e8q`, `0000` for the pass move.
    pub fn to_uci(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() || self.is_null() {
            return f.write_str("0000");
        }
        write!(f, "{}{}", self.from(), self.to())?;
        if let Some(kind) = self.promotion() {
            write!(f, "{}", kind.letter())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("Move(none)");
        }
        write!(f, "Move({self} {:?})", self.move_type())
    }
}

#[cfg(test)]
mod tests {
    use super::{Move, MoveType};
    use crate::color::Color;
    use crate::piece::{Piece, PieceKind};
    use crate::square::Square;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    #[test]
    fn fields_survive_packing() {
        let mv = Move::new(
            MoveType::Promotion,
            sq("b7"),
            sq("a8"),
            Piece::new(PieceKind::Pawn, Color::White),
            Some(Piece::new(PieceKind::Rook, Color::Black)),
            Some(PieceKind::Knight),
        );
        assert_eq!(mv.move_type(), MoveType::Promotion);
        assert_eq!(mv.from(), sq("b7"));
        assert_eq!(mv.to(), sq("a8"));
        assert_eq!(mv.moved(), Piece::new(PieceKind::Pawn, Color::White));
        assert_eq!(mv.captured(), Some(Piece::new(PieceKind::Rook, Color::Black)));
        assert_eq!(mv.promotion(), Some(PieceKind::Knight));
        assert!(mv.is_capture());
        assert!(!mv.is_quiet());
        assert_eq!(mv.to_string(), "b7a8n");
        assert_eq!(Move::from_raw(mv.raw()), mv);
    }

    #[test]
    fn white_pawn_move_is_not_none() {
        // White pawn has piece index 0; the +1 bias keeps the move distinct from NONE.
        let mv = Move::new(
            MoveType::Normal,
            Square::A1,
            Square::A1,
            Piece::new(PieceKind::Pawn, Color::White),
            None,
            None,
        );
        assert!(!mv.is_none());
        assert!(mv.is_quiet());
    }

    #[test]
    fn sentinels() {
        assert!(Move::NONE.is_none());
        assert!(Move::NULL.is_null());
        assert_ne!(Move::NONE, Move::NULL);
        assert_eq!(Move::NULL.move_type(), MoveType::Null);
        assert_eq!(Move::NULL.to_string(), "0000");
    }
}
