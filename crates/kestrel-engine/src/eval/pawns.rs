//! Pawn structure: passed, isolated and doubled pawns.
//!
//! The structure term depends only on pawn placement, so results are cached
//! in a [`PawnCache`] keyed by the position's pawn hash.

use kestrel_core::{Bitboard, Color, PieceKind, Position};

use crate::eval::score::{S, Score};

const fn adjacent_files(file: u8) -> u64 {
    let mut bits = 0;
    if file > 0 {
        bits |= Bitboard::file(file - 1).bits();
    }
    if file < 7 {
        bits |= Bitboard::file(file + 1).bits();
    }
    bits
}

/// Squares in front of a pawn on its own and the adjacent files. No enemy
/// pawn there means the pawn is passed.
static PASSED_SPAN: [[Bitboard; 64]; 2] = {
    let mut table = [[Bitboard::EMPTY; 64]; 2];
    let mut sq = 0;
    while sq < 64 {
        let file = (sq % 8) as u8;
        let rank = (sq / 8) as u8;
        let span = Bitboard::file(file).bits() | adjacent_files(file);
        let mut white = 0u64;
        let mut black = 0u64;
        let mut r = 0;
        while r < 8 {
            if r > rank {
                white |= Bitboard::rank(r).bits();
            } else if r < rank {
                black |= Bitboard::rank(r).bits();
            }
            r += 1;
        }
        table[0][sq] = Bitboard::new(span & white);
        table[1][sq] = Bitboard::new(span & black);
        sq += 1;
    }
    table
};

/// Indexed by relative rank.
const PASSED: [Score; 8] = [
    S(0, 0),
    S(5, 10),
    S(10, 18),
    S(18, 35),
    S(35, 65),
    S(60, 110),
    S(95, 170),
    S(0, 0),
];

const ISOLATED: Score = S(-12, -18);
const DOUBLED: Score = S(-10, -20);

fn side_structure(ours: Bitboard, theirs: Bitboard, color: Color) -> Score {
    let mut score = Score::ZERO;
    for sq in ours {
        let file = sq.file();
        if (PASSED_SPAN[color.index()][sq.index()] & theirs).is_empty() {
            score += PASSED[sq.relative_rank(color) as usize];
        }
        if (Bitboard::new(adjacent_files(file)) & ours).is_empty() {
            score += ISOLATED;
        }
    }
    for file in 0..8 {
        let count = (Bitboard::file(file) & ours).count();
        if count > 1 {
            score += DOUBLED * (count - 1) as i16;
        }
    }
    score
}

/// Pawn structure balance from White's side.
pub fn pawn_structure(pos: &Position) -> Score {
    let white = pos.pieces(PieceKind::Pawn, Color::White);
    let black = pos.pieces(PieceKind::Pawn, Color::Black);
    side_structure(white, black, Color::White) - side_structure(black, white, Color::Black)
}

#[derive(Clone, Copy, Default)]
struct PawnEntry {
    key: u64,
    score: Score,
    filled: bool,
}

/// Direct-mapped cache of [`pawn_structure`] results.
#[derive(Clone)]
pub struct PawnCache {
    entries: Vec<PawnEntry>,
}

impl PawnCache {
    /// Cache with `size` slots, at least one.
    pub fn new(size: usize) -> PawnCache {
        PawnCache {
            entries: vec![PawnEntry::default(); size.max(1)],
        }
    }

    pub fn probe(&mut self, pos: &Position) -> Score {
        let key = pos.pawn_hash();
        let index = (key % self.entries.len() as u64) as usize;
        let entry = &mut self.entries[index];
        if entry.filled && entry.key == key {
            return entry.score;
        }
        let score = pawn_structure(pos);
        *entry = PawnEntry {
            key,
            score,
            filled: true,
        };
        score
    }

    pub fn clear(&mut self) {
        self.entries.fill(PawnEntry::default());
    }
}

#[cfg(test)]
mod tests {
    use kestrel_core::Position;

    use super::{DOUBLED, ISOLATED, PASSED, PawnCache, pawn_structure};
    use crate::eval::score::Score;

    fn pos(fen: &str) -> Position {
        fen.parse().unwrap()
    }

    #[test]
    fn symmetric_structure_is_even() {
        assert_eq!(pawn_structure(&Position::starting_position()), Score::ZERO);
    }

    #[test]
    fn lone_pawn_is_passed_and_isolated() {
        // white pawn on d5 (relative rank index 4) with nothing to stop it
        let p = pos("4k3/8/8/3P4/8/8/8/4K3 w - - 0 1");
        assert_eq!(pawn_structure(&p), PASSED[4] + ISOLATED);
    }

    #[test]
    fn doubled_pawns_are_penalised() {
        // black has c7/c6 facing white b2/c2/d2
        let p = pos("4k3/2p5/2p5/8/8/8/1PPP4/4K3 w - - 0 1");
        // black: doubled, both isolated, neither passed; white: nothing notable
        assert_eq!(pawn_structure(&p), -(DOUBLED + ISOLATED * 2));
    }

    #[test]
    fn cache_returns_computed_value() {
        let p = pos("4k3/8/8/3P4/8/8/8/4K3 w - - 0 1");
        let mut cache = PawnCache::new(64);
        let first = cache.probe(&p);
        assert_eq!(first, cache.probe(&p));
        assert_eq!(first, pawn_structure(&p));
    }
}
