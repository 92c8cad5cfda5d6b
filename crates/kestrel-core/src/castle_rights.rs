//! Castling rights as a four-bit set.

use std::fmt;

use crate::color::Color;
use crate::error::FenError;
use crate::square::Square;

/// Castling direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastleSide {
    KingSide,
    QueenSide,
}

impl CastleSide {
    pub const ALL: [CastleSide; 2] = [CastleSide::KingSide, CastleSide::QueenSide];
}

/// Bit 0 = White king side, 1 = White queen side, 2 = Black king side,
/// 3 = Black queen side.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastleRights(u8);

/// Rights lost when a move starts or ends on the square.
const REVOKED_BY_SQUARE: [u8; 64] = {
    let mut table = [0u8; 64];
    table[Square::A1.index()] = 0b0010;
    table[Square::E1.index()] = 0b0011;
    table[Square::H1.index()] = 0b0001;
    table[Square::A8.index()] = 0b1000;
    table[Square::E8.index()] = 0b1100;
    table[Square::H8.index()] = 0b0100;
    table
};

impl CastleRights {
    pub const NONE: CastleRights = CastleRights(0);
    pub const ALL: CastleRights = CastleRights(0b1111);

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    const fn flag(color: Color, side: CastleSide) -> u8 {
        let shift = color.index() * 2
            + match side {
                CastleSide::KingSide => 0,
                CastleSide::QueenSide => 1,
            };
        1 << shift
    }

    #[inline]
    pub const fn has(self, color: Color, side: CastleSide) -> bool {
        self.0 & Self::flag(color, side) != 0
    }

    #[inline]
    pub const fn with(self, color: Color, side: CastleSide) -> CastleRights {
        CastleRights(self.0 | Self::flag(color, side))
    }

    /// Rights remaining after a piece leaves or lands on `sq`.
    #[inline]
    pub const fn revoke(self, sq: Square) -> CastleRights {
        CastleRights(self.0 & !REVOKED_BY_SQUARE[sq.index()])
    }

    /// Swap White's and Black's rights.
    #[inline]
    pub const fn mirror(self) -> CastleRights {
        CastleRights(((self.0 & 0b0011) << 2) | ((self.0 & 0b1100) >> 2))
    }

    pub fn from_fen(field: &str) -> Result<CastleRights, FenError> {
        if field == "-" {
            return Ok(CastleRights::NONE);
        }
        field.chars().try_fold(CastleRights::NONE, |rights, c| {
            let (color, side) = match c {
                'K' => (Color::White, CastleSide::KingSide),
                'Q' => (Color::White, CastleSide::QueenSide),
                'k' => (Color::Black, CastleSide::KingSide),
                'q' => (Color::Black, CastleSide::QueenSide),
                _ => return Err(FenError::InvalidCastling { character: c }),
            };
            Ok(rights.with(color, side))
        })
    }
}

impl fmt::Display for CastleRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        for (color, side, c) in [
            (Color::White, CastleSide::KingSide, 'K'),
            (Color::White, CastleSide::QueenSide, 'Q'),
            (Color::Black, CastleSide::KingSide, 'k'),
            (Color::Black, CastleSide::QueenSide, 'q'),
        ] {
            if self.has(color, side) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CastleRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CastleRights({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::{CastleRights, CastleSide};
    use crate::color::Color;
    use crate::square::Square;

    #[test]
    fn fen_roundtrip() {
        for field in ["KQkq", "Kq", "k", "-", "Qk"] {
            let rights = CastleRights::from_fen(field).unwrap();
            assert_eq!(CastleRights::from_fen(&rights.to_string()).unwrap(), rights);
        }
        assert_eq!(CastleRights::from_fen("KQkq").unwrap(), CastleRights::ALL);
    }

    #[test]
    fn rejects_bad_letters() {
        assert!(CastleRights::from_fen("KX").is_err());
    }

    #[test]
    fn king_move_revokes_both() {
        let rights = CastleRights::ALL.revoke(Square::E1);
        assert!(!rights.has(Color::White, CastleSide::KingSide));
        assert!(!rights.has(Color::White, CastleSide::QueenSide));
        assert!(rights.has(Color::Black, CastleSide::KingSide));
    }

    #[test]
    fn rook_square_revokes_one() {
        let rights = CastleRights::ALL.revoke(Square::H8);
        assert!(!rights.has(Color::Black, CastleSide::KingSide));
        assert!(rights.has(Color::Black, CastleSide::QueenSide));
        assert_eq!(CastleRights::ALL.revoke(Square::D1), CastleRights::ALL);
    }

    #[test]
    fn mirror_swaps_colors() {
        let rights = CastleRights::from_fen("Kq").unwrap();
        assert_eq!(rights.mirror().to_string(), "Qk");
    }
}
