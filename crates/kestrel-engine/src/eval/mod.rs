//! Static evaluation.
//!
//! The search only sees the [`Evaluate`] trait: a centipawn score from the
//! side to move's point of view. [`Evaluator`] is the full hand-crafted
//! evaluation; [`MaterialEvaluator`] counts material only and is handy when
//! a test needs exactly predictable scores.

pub mod material;
pub mod pawns;
pub mod phase;
pub mod pst;
pub mod score;

use kestrel_core::{Color, PieceKind, Position};

use self::pawns::PawnCache;
use self::score::Score;

/// Default number of pawn cache slots.
pub const DEFAULT_PAWN_CACHE_SIZE: usize = 1 << 14;

/// Position evaluation as consumed by the search.
///
/// Implementations may keep caches, hence `&mut self`; every search thread
/// works on its own clone.
pub trait Evaluate: Clone + Send + Sync + 'static {
    /// Score in centipawns, positive when the side to move stands better.
    fn evaluate(&mut self, pos: &Position) -> i32;
}

/// Tapered material, piece-square and pawn-structure evaluation.
#[derive(Clone)]
pub struct Evaluator {
    pawns: PawnCache,
}

impl Evaluator {
    pub fn new() -> Evaluator {
        Evaluator::with_pawn_cache(DEFAULT_PAWN_CACHE_SIZE)
    }

    pub fn with_pawn_cache(slots: usize) -> Evaluator {
        Evaluator {
            pawns: PawnCache::new(slots),
        }
    }

    /// Score from White's side, before the side-to-move flip.
    pub fn white_score(&mut self, pos: &Position) -> i32 {
        let mut score = material::material(pos) + self.pawns.probe(pos);
        score += placement(pos);
        score.taper(phase::game_phase(pos))
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluate for Evaluator {
    fn evaluate(&mut self, pos: &Position) -> i32 {
        self.white_score(pos) * pos.side_to_move().sign()
    }
}

fn placement(pos: &Position) -> Score {
    let mut score = Score::ZERO;
    for sq in pos.occupied() {
        if let Some(piece) = pos.piece_on(sq) {
            match piece.color() {
                Color::White => score += pst::pst_value(piece, sq),
                Color::Black => score -= pst::pst_value(piece, sq),
            }
        }
    }
    score
}

/// Plain material count using the search's piece values.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialEvaluator;

impl Evaluate for MaterialEvaluator {
    fn evaluate(&mut self, pos: &Position) -> i32 {
        let us = pos.side_to_move();
        let balance: i32 = PieceKind::ALL[..PieceKind::COUNT - 1]
            .iter()
            .map(|&kind| {
                let diff = pos.pieces(kind, us).count() as i32
                    - pos.pieces(kind, us.flip()).count() as i32;
                diff * kind.value()
            })
            .sum();
        balance
    }
}

#[cfg(test)]
mod tests {
    use kestrel_core::Position;

    use super::{Evaluate, Evaluator, MaterialEvaluator};

    const FENS: [&str; 6] = [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        "4k3/8/8/3P4/8/8/8/4K3 b - - 0 1",
    ];

    #[test]
    fn start_position_is_level() {
        assert_eq!(Evaluator::new().evaluate(&Position::starting_position()), 0);
        assert_eq!(MaterialEvaluator.evaluate(&Position::starting_position()), 0);
    }

    #[test]
    fn mirrored_positions_score_the_same_for_the_mover() {
        let mut eval = Evaluator::new();
        for fen in FENS {
            let pos: Position = fen.parse().unwrap();
            let mirrored = pos.mirrored();
            assert_eq!(eval.evaluate(&pos), eval.evaluate(&mirrored), "{fen}");
            assert_eq!(eval.white_score(&pos), -eval.white_score(&mirrored), "{fen}");
        }
    }

    #[test]
    fn score_flips_with_side_to_move() {
        let mut eval = Evaluator::new();
        let white: Position = "4k3/8/8/3P4/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let black: Position = "4k3/8/8/3P4/8/8/8/4K3 b - - 0 1".parse().unwrap();
        assert!(eval.evaluate(&white) > 0);
        assert_eq!(eval.evaluate(&white), -eval.evaluate(&black));
    }

    #[test]
    fn material_evaluator_counts_pieces() {
        let pos: Position = "4k3/8/8/8/8/8/8/R3K3 b - - 0 1".parse().unwrap();
        assert_eq!(MaterialEvaluator.evaluate(&pos), -500);
    }
}
