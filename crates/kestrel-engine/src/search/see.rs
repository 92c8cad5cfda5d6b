//! Static exchange evaluation.
//!
//! Plays out every capture on the target square of a move, each side using
//! its least valuable attacker and stopping when further captures lose, and
//! returns the material balance for the mover. Also used for quiet moves,
//! where it tells whether the moved piece can be won on its new square.

use kestrel_core::{Bitboard, Color, Move, MoveType, PieceKind, Position, Square};

fn attackers_to(pos: &Position, sq: Square, occupied: Bitboard) -> Bitboard {
    (pos.attackers(sq, Color::White, occupied) | pos.attackers(sq, Color::Black, occupied)) & occupied
}

/// Least valuable piece of `side` in `attackers`.
fn least_valuable(pos: &Position, attackers: Bitboard, side: Color) -> Option<(Square, PieceKind)> {
    PieceKind::ALL.into_iter().find_map(|kind| {
        (attackers & pos.pieces(kind, side))
            .lsb()
            .map(|sq| (sq, kind))
    })
}

/// Material won (positive) or lost by playing `mv` and letting both sides
/// trade off on its target square.
pub fn see(pos: &Position, mv: Move) -> i32 {
    let from = mv.from();
    let to = mv.to();
    let us = mv.moved().color();

    let mut gain = [0i32; 32];
    gain[0] = mv.captured().map_or(0, |piece| piece.kind().value());
    let mut on_square = match mv.promotion() {
        Some(kind) => {
            gain[0] += kind.value() - PieceKind::Pawn.value();
            kind.value()
        }
        None => mv.moved().kind().value(),
    };

    let mut occupied = pos.occupied().without(from);
    if mv.move_type() == MoveType::EnPassant {
        occupied = occupied.without(Square::new(to.file(), from.rank()));
    }
    let mut attackers = attackers_to(pos, to, occupied);
    let mut side = us.flip();
    let mut depth = 0;

    while let Some((sq, kind)) = least_valuable(pos, attackers & pos.side(side), side) {
        // a king may only take when nothing defends the square
        if kind == PieceKind::King
            && (attackers.without(sq) & pos.side(side.flip())).is_nonempty()
        {
            break;
        }
        if depth + 1 == gain.len() {
            break;
        }
        depth += 1;
        gain[depth] = on_square - gain[depth - 1];
        on_square = kind.value();
        occupied = occupied.without(sq);
        attackers = attackers_to(pos, to, occupied);
        side = side.flip();
    }

    while depth > 0 {
        depth -= 1;
        gain[depth] = -((-gain[depth]).max(gain[depth + 1]));
    }
    gain[0]
}
