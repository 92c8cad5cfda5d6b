//! Material balance with a bishop-pair bonus, from White's side.

use kestrel_core::{Color, PieceKind, Position};

use crate::eval::score::{S, Score};

/// Evaluation weights per piece kind. Search pruning uses the fixed
/// [`PieceKind::value`] scale instead.
pub const MATERIAL: [Score; PieceKind::COUNT] = [
    S(100, 120),
    S(325, 310),
    S(325, 330),
    S(500, 530),
    S(975, 1000),
    S(0, 0),
];

const BISHOP_PAIR: Score = S(40, 55);

fn side_material(pos: &Position, color: Color) -> Score {
    let mut score = Score::ZERO;
    for kind in PieceKind::ALL {
        score += MATERIAL[kind.index()] * pos.pieces(kind, color).count() as i16;
    }
    if pos.pieces(PieceKind::Bishop, color).more_than_one() {
        score += BISHOP_PAIR;
    }
    score
}

pub fn material(pos: &Position) -> Score {
    side_material(pos, Color::White) - side_material(pos, Color::Black)
}
