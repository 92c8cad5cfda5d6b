//! Game phase from remaining officers.

use kestrel_core::{PieceKind, Position};

/// Phase of the starting position. Knight and bishop weigh 1, rook 2, queen 4.
pub const MAX_PHASE: i32 = 24;

const WEIGHTS: [(PieceKind, i32); 4] = [
    (PieceKind::Knight, 1),
    (PieceKind::Bishop, 1),
    (PieceKind::Rook, 2),
    (PieceKind::Queen, 4),
];

/// Phase in `0..=MAX_PHASE`. Extra promoted pieces cannot push it past the maximum.
pub fn game_phase(pos: &Position) -> i32 {
    WEIGHTS
        .iter()
        .map(|&(kind, weight)| pos.kind(kind).count() as i32 * weight)
        .sum::<i32>()
        .min(MAX_PHASE)
}
