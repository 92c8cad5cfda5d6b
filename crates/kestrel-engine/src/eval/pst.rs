//! Piece-square tables.
//!
//! Tables are generated at compile time from a few shape rules instead of
//! being typed out. Each is written from White's side with index 0 = a1;
//! Black looks up the vertically mirrored square.

use kestrel_core::{Color, Piece, PieceKind, Square};

use crate::eval::score::{S, Score};

/// Distance from the board edge along one axis, 0 (edge) to 3 (center).
const fn edge_distance(coord: usize) -> i16 {
    if coord < 4 { coord as i16 } else { (7 - coord) as i16 }
}

/// 0 on a corner, 6 on the four center squares.
const fn centrality(sq: usize) -> i16 {
    edge_distance(sq % 8) + edge_distance(sq / 8)
}

const fn pawn_table() -> [Score; 64] {
    let mut table = [Score::ZERO; 64];
    let mut sq = 8;
    while sq < 56 {
        let rank = (sq / 8) as i16;
        let file = sq % 8;
        let advance = rank - 1;
        let center = if (file == 3 || file == 4) && (rank == 3 || rank == 4) { 15 } else { 0 };
        // d2/e2 pawns left at home block the bishops
        let blocker = if (file == 3 || file == 4) && rank == 1 { -10 } else { 0 };
        table[sq] = S(advance * 4 + center + blocker, advance * 12);
        sq += 1;
    }
    table
}

const fn knight_table() -> [Score; 64] {
    let mut table = [Score::ZERO; 64];
    let mut sq = 0;
    while sq < 64 {
        let c = centrality(sq);
        table[sq] = S(c * 8 - 24, c * 6 - 18);
        sq += 1;
    }
    table
}

const fn bishop_table() -> [Score; 64] {
    let mut table = [Score::ZERO; 64];
    let mut sq = 0;
    while sq < 64 {
        let c = centrality(sq);
        let long_diagonal = if sq % 9 == 0 || (sq % 7 == 0 && sq > 0 && sq < 63) { 6 } else { 0 };
        table[sq] = S(c * 4 - 12 + long_diagonal, c * 4 - 12);
        sq += 1;
    }
    table
}

const fn rook_table() -> [Score; 64] {
    let mut table = [Score::ZERO; 64];
    let mut sq = 0;
    while sq < 64 {
        let rank = sq / 8;
        let file = sq % 8;
        let seventh = if rank == 6 { 20 } else { 0 };
        let center_file = if file == 3 || file == 4 { 6 } else { 0 };
        table[sq] = S(seventh + center_file, if rank == 6 { 10 } else { 0 });
        sq += 1;
    }
    table
}

const fn queen_table() -> [Score; 64] {
    let mut table = [Score::ZERO; 64];
    let mut sq = 0;
    while sq < 64 {
        let c = centrality(sq);
        table[sq] = S(c * 2 - 6, c * 4 - 12);
        sq += 1;
    }
    table
}

const fn king_table() -> [Score; 64] {
    let mut table = [Score::ZERO; 64];
    let mut sq = 0;
    while sq < 64 {
        let rank = (sq / 8) as i16;
        let file = sq % 8;
        let shelter = if rank == 0 && (file <= 2 || file >= 6) { 20 } else { 0 };
        table[sq] = S(shelter - rank * 15, centrality(sq) * 10 - 30);
        sq += 1;
    }
    table
}

static TABLES: [[Score; 64]; PieceKind::COUNT] = [
    pawn_table(),
    knight_table(),
    bishop_table(),
    rook_table(),
    queen_table(),
    king_table(),
];

/// Square bonus for `piece` standing on `sq`, from that piece's side.
#[inline]
pub fn pst_value(piece: Piece, sq: Square) -> Score {
    let sq = match piece.color() {
        Color::White => sq,
        Color::Black => sq.mirror(),
    };
    TABLES[piece.kind().index()][sq.index()]
}
