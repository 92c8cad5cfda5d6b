//! Perft node counts for well-known positions. Any make/undo or generator
//! bug shows up as a count mismatch.

use kestrel_core::{Position, perft};

fn count(fen: &str, depth: usize) -> u64 {
    let mut pos: Position = fen.parse().unwrap();
    let before = pos.clone();
    let nodes = perft(&mut pos, depth);
    assert_eq!(pos, before, "position not restored after perft");
    assert_eq!(pos.hash(), before.hash());
    nodes
}

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const ENDGAME: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
const PROMOTIONS: &str = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1";
const TRICKY: &str = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";

// ── Starting position ──

#[test]
fn startpos() {
    let start = kestrel_core::STARTING_FEN;
    assert_eq!(count(start, 1), 20);
    assert_eq!(count(start, 2), 400);
    assert_eq!(count(start, 3), 8902);
    assert_eq!(count(start, 4), 197_281);
}

// ── Kiwipete ──

#[test]
fn kiwipete_shallow() {
    assert_eq!(count(KIWIPETE, 1), 48);
    assert_eq!(count(KIWIPETE, 2), 2039);
    assert_eq!(count(KIWIPETE, 3), 97_862);
}

#[test]
#[ignore] // slow
fn kiwipete_depth_4() {
    assert_eq!(count(KIWIPETE, 4), 4_085_603);
}

// ── Other positions ──

#[test]
fn rook_endgame() {
    assert_eq!(count(ENDGAME, 1), 14);
    assert_eq!(count(ENDGAME, 2), 191);
    assert_eq!(count(ENDGAME, 3), 2812);
    assert_eq!(count(ENDGAME, 4), 43_238);
}

#[test]
fn promotions_and_castling() {
    assert_eq!(count(PROMOTIONS, 1), 6);
    assert_eq!(count(PROMOTIONS, 2), 264);
    assert_eq!(count(PROMOTIONS, 3), 9467);
}

#[test]
fn tricky_promotion_position() {
    assert_eq!(count(TRICKY, 1), 44);
    assert_eq!(count(TRICKY, 2), 1486);
    assert_eq!(count(TRICKY, 3), 62_379);
}

#[test]
#[ignore] // slow
fn rook_endgame_depth_5() {
    assert_eq!(count(ENDGAME, 5), 674_624);
}
