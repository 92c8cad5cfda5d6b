//! Zobrist keys for the position hash and the pawn-structure hash.
//!
//! Keys come from a fixed splitmix64 stream so hashes are stable across runs.

use crate::castle_rights::CastleRights;
use crate::color::Color;
use crate::piece::Piece;
use crate::square::Square;

pub(crate) struct Keys {
    pub(crate) piece_square: [[u64; 64]; Piece::COUNT],
    pub(crate) black_to_move: u64,
    pub(crate) castling: [u64; 16],
    pub(crate) en_passant_file: [u64; 8],
}

const SEED: u64 = 0x4B45_5354_5245_4C31;

const fn splitmix64(state: u64) -> (u64, u64) {
    let next = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = next;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (z ^ (z >> 31), next)
}

const fn generate() -> Keys {
    let mut state = SEED;
    let mut piece_square = [[0u64; 64]; Piece::COUNT];
    let mut piece = 0;
    while piece < Piece::COUNT {
        let mut sq = 0;
        while sq < 64 {
            let (key, next) = splitmix64(state);
            piece_square[piece][sq] = key;
            state = next;
            sq += 1;
        }
        piece += 1;
    }

    let (black_to_move, next) = splitmix64(state);
    state = next;

    let mut castling = [0u64; 16];
    let mut i = 1;
    while i < 16 {
        let (key, next) = splitmix64(state);
        castling[i] = key;
        state = next;
        i += 1;
    }

    let mut en_passant_file = [0u64; 8];
    let mut file = 0;
    while file < 8 {
        let (key, next) = splitmix64(state);
        en_passant_file[file] = key;
        state = next;
        file += 1;
    }

    Keys {
        piece_square,
        black_to_move,
        castling,
        en_passant_file,
    }
}

pub(crate) static KEYS: Keys = generate();

#[inline]
pub(crate) fn piece_square(piece: Piece, sq: Square) -> u64 {
    KEYS.piece_square[piece.index()][sq.index()]
}

#[inline]
pub(crate) fn side(color: Color) -> u64 {
    match color {
        Color::White => 0,
        Color::Black => KEYS.black_to_move,
    }
}

#[inline]
pub(crate) fn castling(rights: CastleRights) -> u64 {
    KEYS.castling[rights.bits() as usize]
}

#[inline]
pub(crate) fn en_passant(sq: Option<Square>) -> u64 {
    match sq {
        Some(sq) => KEYS.en_passant_file[sq.file() as usize],
        None => 0,
    }
}
