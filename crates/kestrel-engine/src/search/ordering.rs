//! Staged move generation and ordering.
//!
//! A [`MovePicker`] hands out the legal moves of one node lazily, best
//! guesses first, so a cutoff on an early move skips generating the rest:
//!
//! 1. the hash move,
//! 2. winning or even captures (MVV-LVA order),
//! 3. the two killer moves,
//! 4. quiet moves by history score,
//! 5. losing captures and under-promotions.
//!
//! A side in check gets every legal evasion, rated up front. Quiescence
//! nodes stop after the good captures, optionally followed by quiet checks
//! that do not hang the checking piece.

use kestrel_core::{Move, PieceKind, Position, generate_all, generate_captures, generate_quiet_checks, generate_quiets};

use crate::search::heuristics::{HISTORY_MAX, HistoryTable};
use crate::search::see::see;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    TtMove,
    GenerateCaptures,
    GoodCaptures,
    Killers,
    GenerateQuiets,
    Quiets,
    BadCaptures,
    GenerateChecks,
    QuietChecks,
    Evasions,
    Done,
}

/// Most valuable victim first, least valuable attacker as tie-break.
pub fn mvv_lva(mv: Move) -> i32 {
    let victim = mv.captured().map_or(0, |piece| piece.kind().value());
    PieceKind::King.value() / mv.moved().kind().value() + 10 * victim
}

/// Captures searched before the quiet moves: queen promotions, trades up
/// or even, and anything static exchange does not lose.
pub fn is_good_capture(pos: &Position, mv: Move) -> bool {
    if let Some(kind) = mv.promotion() {
        return kind == PieceKind::Queen;
    }
    let attacker = mv.moved().kind().value();
    let victim = mv.captured().map_or(0, |piece| piece.kind().value());
    attacker <= victim || see(pos, mv) >= 0
}

#[derive(Debug, Clone, Copy)]
struct ScoredMove {
    mv: Move,
    score: i32,
}

/// Moves handed out best-first by selection sort. Equal scores keep
/// generation order.
#[derive(Debug, Default)]
struct ScoredList {
    moves: Vec<ScoredMove>,
    cursor: usize,
}

impl ScoredList {
    fn clear(&mut self) {
        self.moves.clear();
        self.cursor = 0;
    }

    fn push(&mut self, mv: Move, score: i32) {
        self.moves.push(ScoredMove { mv, score });
    }

    fn len(&self) -> usize {
        self.moves.len()
    }

    fn pick_best(&mut self) -> Option<Move> {
        let rest = self.moves.get(self.cursor..)?;
        let mut best = 0;
        for (i, scored) in rest.iter().enumerate().skip(1) {
            if scored.score > rest[best].score {
                best = i;
            }
        }
        let mv = rest.get(best)?.mv;
        self.moves.swap(self.cursor, self.cursor + best);
        self.cursor += 1;
        Some(mv)
    }

    fn next_in_order(&mut self) -> Option<Move> {
        let mv = self.moves.get(self.cursor)?.mv;
        self.cursor += 1;
        Some(mv)
    }
}

/// Per-node move source. Buffers are reused between nodes, so a search
/// keeps one picker per height.
#[derive(Debug)]
pub struct MovePicker {
    stage: Stage,
    quiescence: bool,
    include_checks: bool,
    tt_move: Move,
    killers: [Move; 2],
    killer_index: usize,
    moves: ScoredList,
    bad: ScoredList,
    evasions: usize,
}

impl MovePicker {
    pub fn new() -> MovePicker {
        MovePicker {
            stage: Stage::Done,
            quiescence: false,
            include_checks: false,
            tt_move: Move::NONE,
            killers: [Move::NONE; 2],
            killer_index: 0,
            moves: ScoredList::default(),
            bad: ScoredList::default(),
            evasions: 0,
        }
    }

    fn reset(&mut self, tt_move: Move, killers: [Move; 2]) {
        self.tt_move = tt_move;
        self.killers = killers;
        self.killer_index = 0;
        self.moves.clear();
        self.bad.clear();
        self.evasions = 0;
    }

    /// Prepare for a full-width node.
    pub fn init_main(
        &mut self,
        pos: &Position,
        in_check: bool,
        tt_move: Move,
        killers: [Move; 2],
        history: &HistoryTable,
    ) {
        self.reset(tt_move, killers);
        self.quiescence = false;
        self.include_checks = false;
        if in_check {
            self.generate_evasions(pos, history);
        } else {
            self.stage = Stage::TtMove;
        }
    }

    /// Prepare for a quiescence node.
    pub fn init_quiescence(
        &mut self,
        pos: &Position,
        in_check: bool,
        include_checks: bool,
        killers: [Move; 2],
        history: &HistoryTable,
    ) {
        self.reset(Move::NONE, killers);
        self.quiescence = true;
        self.include_checks = include_checks;
        if in_check {
            self.generate_evasions(pos, history);
        } else {
            self.stage = Stage::GenerateCaptures;
        }
    }

    /// Number of legal moves when the node was initialised in check, zero
    /// otherwise.
    pub fn evasion_count(&self) -> usize {
        self.evasions
    }

    /// Next move to search, `None` once the node is exhausted. `pos` must be
    /// the position the picker was initialised with.
    pub fn next(&mut self, pos: &Position, history: &HistoryTable) -> Option<Move> {
        loop {
            match self.stage {
                Stage::TtMove => {
                    self.stage = Stage::GenerateCaptures;
                    let mv = self.tt_move;
                    if pos.is_pseudo_legal(mv) && pos.is_legal(mv) {
                        return Some(mv);
                    }
                }
                Stage::GenerateCaptures => {
                    self.generate_captures(pos);
                    self.stage = Stage::GoodCaptures;
                }
                Stage::GoodCaptures => {
                    if let Some(mv) = self.moves.pick_best() {
                        return Some(mv);
                    }
                    self.stage = match (self.quiescence, self.include_checks) {
                        (false, _) => Stage::Killers,
                        (true, true) => Stage::GenerateChecks,
                        (true, false) => Stage::Done,
                    };
                }
                Stage::Killers => {
                    while self.killer_index < self.killers.len() {
                        let mv = self.killers[self.killer_index];
                        self.killer_index += 1;
                        if mv != self.tt_move && mv.is_quiet() && pos.is_pseudo_legal(mv) && pos.is_legal(mv) {
                            return Some(mv);
                        }
                    }
                    self.stage = Stage::GenerateQuiets;
                }
                Stage::GenerateQuiets => {
                    self.generate_quiets(pos, history);
                    self.stage = Stage::Quiets;
                }
                Stage::Quiets => {
                    if let Some(mv) = self.moves.pick_best() {
                        return Some(mv);
                    }
                    self.stage = Stage::BadCaptures;
                }
                Stage::BadCaptures => {
                    if let Some(mv) = self.bad.next_in_order() {
                        return Some(mv);
                    }
                    self.stage = Stage::Done;
                }
                Stage::GenerateChecks => {
                    self.generate_checks(pos, history);
                    self.stage = Stage::QuietChecks;
                }
                Stage::QuietChecks | Stage::Evasions => {
                    if let Some(mv) = self.moves.pick_best() {
                        return Some(mv);
                    }
                    self.stage = Stage::Done;
                }
                Stage::Done => return None,
            }
        }
    }

    fn generate_captures(&mut self, pos: &Position) {
        self.moves.clear();
        let tt_move = self.tt_move;
        let quiescence = self.quiescence;
        let (good, bad) = (&mut self.moves, &mut self.bad);
        generate_captures(pos, |mv| {
            if mv == tt_move || !pos.is_legal(mv) {
                return;
            }
            if is_good_capture(pos, mv) {
                good.push(mv, mvv_lva(mv));
            } else if !quiescence {
                bad.push(mv, 0);
            }
        });
    }

    fn generate_quiets(&mut self, pos: &Position, history: &HistoryTable) {
        self.moves.clear();
        let skip = [self.tt_move, self.killers[0], self.killers[1]];
        let list = &mut self.moves;
        generate_quiets(pos, |mv| {
            if !skip.contains(&mv) && pos.is_legal(mv) {
                list.push(mv, history.get(mv));
            }
        });
    }

    fn generate_checks(&mut self, pos: &Position, history: &HistoryTable) {
        self.moves.clear();
        let list = &mut self.moves;
        generate_quiet_checks(pos, |mv| {
            if pos.is_legal(mv) && see(pos, mv) >= 0 {
                list.push(mv, history.get(mv));
            }
        });
    }

    fn generate_evasions(&mut self, pos: &Position, history: &HistoryTable) {
        self.moves.clear();
        let (tt_move, killers) = (self.tt_move, self.killers);
        let list = &mut self.moves;
        generate_all(pos, |mv| {
            if !pos.is_legal(mv) {
                return;
            }
            let score = if mv == tt_move {
                i32::MAX
            } else if mv.is_capture() {
                mvv_lva(mv)
            } else if mv == killers[0] {
                0
            } else if mv == killers[1] {
                -1
            } else {
                history.get(mv) - HISTORY_MAX as i32 - 2
            };
            list.push(mv, score);
        });
        self.evasions = self.moves.len();
        self.stage = Stage::Evasions;
    }
}

impl Default for MovePicker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use kestrel_core::{Move, Position, legal_moves};

    use super::*;

    const FENS: [&str; 5] = [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5Q2/PPPP1PPP/RNB1KBNR b KQkq - 2 3",
    ];

    fn pos(fen: &str) -> Position {
        fen.parse().unwrap()
    }

    fn drain(picker: &mut MovePicker, pos: &Position, history: &HistoryTable) -> Vec<Move> {
        std::iter::from_fn(|| picker.next(pos, history)).collect()
    }

    #[test]
    fn main_picker_yields_every_legal_move_once() {
        let history = HistoryTable::new();
        let mut picker = MovePicker::new();
        for fen in FENS {
            let p = pos(fen);
            let legal = legal_moves(&p);
            let tt_move = legal[legal.len() / 2];
            let killers = [legal[0], legal[legal.len() - 1]];
            picker.init_main(&p, p.in_check(), tt_move, killers, &history);
            let yielded = drain(&mut picker, &p, &history);

            assert_eq!(yielded.len(), legal.len(), "{fen}");
            let unique: HashSet<Move> = yielded.iter().copied().collect();
            assert_eq!(unique.len(), yielded.len(), "{fen}");
            assert!(yielded.iter().all(|&mv| legal.contains(mv)), "{fen}");
            assert_eq!(yielded[0], tt_move, "{fen}");
        }
    }

    #[test]
    fn stale_hash_move_is_ignored() {
        let history = HistoryTable::new();
        let start = Position::starting_position();
        let other = pos(FENS[2]);
        let foreign = legal_moves(&other)[0];
        let mut picker = MovePicker::new();
        picker.init_main(&start, false, foreign, [Move::NONE; 2], &history);
        assert_eq!(drain(&mut picker, &start, &history).len(), 20);
    }

    #[test]
    fn winning_capture_comes_before_quiets() {
        let history = HistoryTable::new();
        let p = pos("4k3/8/8/3q4/4P3/8/8/4K3 w - - 0 1");
        let mut picker = MovePicker::new();
        picker.init_main(&p, false, Move::NONE, [Move::NONE; 2], &history);
        assert_eq!(picker.next(&p, &history), Some(p.parse_move("e4d5").unwrap()));
    }

    #[test]
    fn losing_capture_comes_last() {
        let history = HistoryTable::new();
        let p = pos("7k/8/3p4/2p5/8/4Q3/8/4K3 w - - 0 1");
        let mut picker = MovePicker::new();
        picker.init_main(&p, false, Move::NONE, [Move::NONE; 2], &history);
        let yielded = drain(&mut picker, &p, &history);
        assert_eq!(yielded.last().copied(), Some(p.parse_move("e3c5").unwrap()));
    }

    #[test]
    fn history_orders_quiet_moves() {
        let history = HistoryTable::new();
        let p = Position::starting_position();
        let favourite = p.parse_move("b1c3").unwrap();
        history.add(favourite, 9);
        let mut picker = MovePicker::new();
        picker.init_main(&p, false, Move::NONE, [Move::NONE; 2], &history);
        assert_eq!(picker.next(&p, &history), Some(favourite));
    }

    #[test]
    fn evasions_are_counted() {
        let history = HistoryTable::new();
        // rook on e1 checks the king on e8
        let p = pos("4k3/8/8/8/8/8/8/4RK2 b - - 0 1");
        let mut picker = MovePicker::new();
        picker.init_main(&p, true, Move::NONE, [Move::NONE; 2], &history);
        let expected = legal_moves(&p).len();
        assert_eq!(picker.evasion_count(), expected);
        assert_eq!(drain(&mut picker, &p, &history).len(), expected);
    }

    // ── Quiescence ──

    #[test]
    fn quiescence_without_checks_only_captures() {
        let history = HistoryTable::new();
        let p = pos(FENS[1]);
        let mut picker = MovePicker::new();
        picker.init_quiescence(&p, false, false, [Move::NONE; 2], &history);
        let yielded = drain(&mut picker, &p, &history);
        assert!(!yielded.is_empty());
        assert!(yielded.iter().all(|mv| mv.is_capture() || mv.is_promotion()));
        assert!(yielded.iter().all(|&mv| is_good_capture(&p, mv)));
    }

    #[test]
    fn quiescence_checks_are_safe_quiet_checks() {
        let history = HistoryTable::new();
        let p = pos("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        let mut picker = MovePicker::new();
        picker.init_quiescence(&p, false, true, [Move::NONE; 2], &history);
        let yielded = drain(&mut picker, &p, &history);
        assert!(yielded.contains(&p.parse_move("a1a8").unwrap()));
        assert!(yielded.iter().all(|&mv| p.is_checking_move(mv) && mv.is_quiet()));
    }
}
