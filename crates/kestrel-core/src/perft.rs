//! Leaf-node counting for move generator and make/undo verification.

use tracing::debug;

use crate::movegen::legal_moves;
use crate::position::Position;

/// Count leaf nodes `depth` plies below `pos`. Depth 1 is bulk-counted.
pub fn perft(pos: &mut Position, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = legal_moves(pos);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0;
    for &mv in &moves {
        pos.make_move(mv);
        nodes += perft(pos, depth - 1);
        pos.undo_move(mv);
    }
    nodes
}

/// Per-root-move node counts, sorted by move text.
pub fn divide(pos: &mut Position, depth: usize) -> Vec<(String, u64)> {
    let moves = legal_moves(pos);
    let mut results: Vec<(String, u64)> = Vec::with_capacity(moves.len());
    for &mv in &moves {
        pos.make_move(mv);
        let count = perft(pos, depth.saturating_sub(1));
        pos.undo_move(mv);
        debug!(%mv, count, "divide");
        results.push((mv.to_uci(), count));
    }
    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}
