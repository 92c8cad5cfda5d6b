//! Piece kinds and colored pieces.

use std::fmt;

use crate::color::Color;

/// Piece kind without color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    pub const COUNT: usize = 6;

    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub(crate) const fn from_index(index: u8) -> Option<PieceKind> {
        match index {
            0 => Some(PieceKind::Pawn),
            1 => Some(PieceKind::Knight),
            2 => Some(PieceKind::Bishop),
            3 => Some(PieceKind::Rook),
            4 => Some(PieceKind::Queen),
            5 => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Material value in centipawns, used for exchange and pruning decisions.
    #[inline]
    pub const fn value(self) -> i32 {
        match self {
            PieceKind::Pawn => 100,
            PieceKind::Knight => 325,
            PieceKind::Bishop => 325,
            PieceKind::Rook => 500,
            PieceKind::Queen => 975,
            PieceKind::King => 20000,
        }
    }

    /// Lowercase letter used in FEN and coordinate notation.
    #[inline]
    pub const fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    pub fn from_letter(c: char) -> Option<PieceKind> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Knights, bishops, rooks and queens.
    #[inline]
    pub const fn is_officer(self) -> bool {
        !matches!(self, PieceKind::Pawn | PieceKind::King)
    }
}

/// A piece of a given color. Index layout: White P..K = 0..5, Black P..K = 6..11.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece(u8);

impl Piece {
    pub const COUNT: usize = 12;

    #[inline]
    pub const fn new(kind: PieceKind, color: Color) -> Piece {
        Piece(color as u8 * 6 + kind as u8)
    }

    #[inline]
    pub(crate) const fn from_index(index: u8) -> Option<Piece> {
        if index < 12 { Some(Piece(index)) } else { None }
    }

    #[inline]
    pub(crate) const fn from_index_unchecked(index: u8) -> Piece {
        debug_assert!(index < 12);
        Piece(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn kind(self) -> PieceKind {
        match PieceKind::from_index(self.0 % 6) {
            Some(kind) => kind,
            None => PieceKind::King,
        }
    }

    #[inline]
    pub const fn color(self) -> Color {
        if self.0 < 6 { Color::White } else { Color::Black }
    }

    /// Same kind, other color.
    #[inline]
    pub const fn flip(self) -> Piece {
        Piece::new(self.kind(), self.color().flip())
    }

    /// FEN letter: uppercase for White, lowercase for Black.
    pub fn fen_char(self) -> char {
        let c = self.kind().letter();
        match self.color() {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    pub fn from_fen_char(c: char) -> Option<Piece> {
        let kind = PieceKind::from_letter(c)?;
        let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
        Some(Piece::new(kind, color))
    }
}

impl fmt::Debug for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Piece({})", self.fen_char())
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fen_char())
    }
}

#[cfg(test)]
mod tests {
    use super::{Piece, PieceKind};
    use crate::color::Color;

    #[test]
    fn index_layout() {
        assert_eq!(Piece::new(PieceKind::Pawn, Color::White).index(), 0);
        assert_eq!(Piece::new(PieceKind::King, Color::White).index(), 5);
        assert_eq!(Piece::new(PieceKind::Pawn, Color::Black).index(), 6);
        assert_eq!(Piece::new(PieceKind::King, Color::Black).index(), 11);
    }

    #[test]
    fn kind_and_color_roundtrip() {
        for color in Color::ALL {
            for kind in PieceKind::ALL {
                let piece = Piece::new(kind, color);
                assert_eq!(piece.kind(), kind);
                assert_eq!(piece.color(), color);
                assert_eq!(Piece::from_fen_char(piece.fen_char()), Some(piece));
                assert_eq!(piece.flip().flip(), piece);
            }
        }
    }

    #[test]
    fn values_are_ordered() {
        assert_eq!(PieceKind::Knight.value(), PieceKind::Bishop.value());
        assert!(PieceKind::Pawn.value() < PieceKind::Knight.value());
        assert!(PieceKind::Rook.value() < PieceKind::Queen.value());
        assert!(PieceKind::Queen.value() < PieceKind::King.value());
    }

    #[test]
    fn officers() {
        assert!(!PieceKind::Pawn.is_officer());
        assert!(PieceKind::Rook.is_officer());
        assert!(!PieceKind::King.is_officer());
    }

    #[test]
    fn rejects_unknown_letters() {
        assert_eq!(Piece::from_fen_char('x'), None);
        assert_eq!(PieceKind::from_letter('1'), None);
    }
}
