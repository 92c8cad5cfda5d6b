//! Principal variation search over the full-width part of the tree.
//!
//! [`SearchContext`] bundles what every node shares: options, tables, the
//! stop control and the listener. Per-thread state lives in a
//! [`Worker`]. The recursion runs on one worker until the scheduler splits
//! a node, at which point each remaining move is searched on a cloned
//! position by a worker taken from the pool.

use std::sync::atomic::{AtomicBool, Ordering};

use kestrel_core::{GamePhase, Move, PieceKind, Position, legal_moves};

use crate::eval::Evaluate;
use crate::search::control::SearchControl;
use crate::search::heuristics::{HistoryTable, KillerTable};
use crate::search::listener::{PvInfo, ScoreReport, SearchListener, SearchStatus};
use crate::search::options::SearchOptions;
use crate::search::scheduler::{ChildResult, Scheduler};
use crate::search::see::see;
use crate::search::tt::TranspositionTable;
use crate::search::worker::{Worker, WorkerPool};
use crate::search::{Bound, CHECKMATE, CHECKMATE_THRESHOLD, DRAW, INFINITY, MAX_HEIGHT};

/// Shared state of one search.
pub(crate) struct SearchContext<'a, E> {
    pub(crate) options: &'a SearchOptions,
    pub(crate) tt: &'a TranspositionTable,
    pub(crate) killers: &'a KillerTable,
    pub(crate) history: &'a HistoryTable,
    pub(crate) control: &'a SearchControl,
    pub(crate) listener: &'a dyn SearchListener,
    pub(crate) scheduler: &'a dyn Scheduler,
    pub(crate) workers: &'a WorkerPool<E>,
    /// Analysis searches keep minor promotions.
    pub(crate) analysis: bool,
}

/// A root move and the value that orders it in the next iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RootMove {
    pub(crate) mv: Move,
    pub(crate) value: i32,
}

impl RootMove {
    pub(crate) fn new(mv: Move) -> RootMove {
        RootMove { mv, value: -INFINITY }
    }
}

/// Result of one root search.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RootOutcome {
    /// `None` when every move failed low.
    pub(crate) best_move: Option<Move>,
    pub(crate) value: i32,
    pub(crate) bound: Bound,
}

/// Search window of an aspiration loop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Window {
    pub(crate) alpha: i32,
    pub(crate) beta: i32,
}

impl Window {
    pub(crate) const FULL: Window = Window {
        alpha: -CHECKMATE,
        beta: CHECKMATE,
    };

    /// `width` on either side of `value`.
    pub(crate) fn around(value: i32, width: i32) -> Window {
        Window {
            alpha: (value - width).max(-CHECKMATE),
            beta: (value + width).min(CHECKMATE),
        }
    }

    pub(crate) fn contains(&self, value: i32) -> bool {
        value > self.alpha && value < self.beta
    }

    pub(crate) fn widen(&mut self, by: i32) {
        self.alpha = (self.alpha - by).max(-CHECKMATE);
        self.beta = (self.beta + by).min(CHECKMATE);
    }
}

/// Facts about a node that every one of its moves needs.
#[derive(Debug, Clone, Copy)]
struct Node {
    depth: i32,
    height: usize,
    pv_node: bool,
    in_check: bool,
    single_reply: bool,
    mate_threat: bool,
}

enum Searched {
    /// Skipped by futility pruning, with the estimate that justified it.
    Pruned(i32),
    Value(i32),
}

/// Pawn pushes to the seventh rank and queen captures are never pruned or
/// reduced.
pub(crate) fn is_dangerous(mv: Move) -> bool {
    let piece = mv.moved();
    let pawn_push = piece.kind() == PieceKind::Pawn && mv.to().relative_rank(piece.color()) >= 6;
    pawn_push || mv.captured().is_some_and(|p| p.kind() == PieceKind::Queen)
}

/// In check with exactly one legal evasion. Independent of any root move
/// restriction.
pub(crate) fn has_single_reply(pos: &Position) -> bool {
    pos.in_check() && legal_moves(pos).len() == 1
}

pub(crate) fn captured_value(mv: Move) -> i32 {
    mv.captured().map_or(0, |p| p.kind().value())
}

impl<E: Evaluate> SearchContext<'_, E> {
    // ── Node bookkeeping ────────────────────────────────────────────────

    /// Count the node, reset its PV and emit a status report when due.
    pub(crate) fn visit(&self, worker: &mut Worker<E>, height: usize) {
        let nodes = self.control.count_node(height);
        worker.pv.clear(height);
        if self.control.status_due(nodes) {
            self.listener.status(&self.status());
        }
    }

    pub(crate) fn status(&self) -> SearchStatus {
        SearchStatus {
            depth: self.control.depth(),
            seldepth: self.control.seldepth(),
            nodes: self.control.nodes(),
            nps: self.control.nps(),
            hashfull: self.tt.permill(),
            time: self.control.elapsed(),
        }
    }

    pub(crate) fn report(&self, depth: i32, value: i32, bound: Bound, pv: Vec<Move>) {
        let info = PvInfo {
            depth,
            seldepth: self.control.seldepth(),
            value,
            score: ScoreReport::from_value(value),
            bound,
            nodes: self.control.nodes(),
            nps: self.control.nps(),
            hashfull: self.tt.permill(),
            time: self.control.elapsed(),
            pv,
        };
        self.listener.pv_updated(&info);
    }

    pub(crate) fn killers_at(&self, height: usize) -> [Move; 2] {
        if self.options.killer_moves {
            [self.killers.primary(height), self.killers.secondary(height)]
        } else {
            [Move::NONE; 2]
        }
    }

    fn skips_promotion(&self, mv: Move) -> bool {
        self.options.minor_promotion_pruning
            && !self.analysis
            && mv.promotion().is_some_and(|kind| kind != PieceKind::Queen)
    }

    /// Quiet best moves feed the killer and history tables.
    fn add_good_move(&self, mv: Move, depth: i32, height: usize) {
        if mv.is_none() || mv.is_null() || !mv.is_quiet() || mv.is_promotion() {
            return;
        }
        if self.options.killer_moves {
            self.killers.add(height, mv);
        }
        if self.options.history {
            self.history.add(mv, depth);
        }
    }

    /// Remaining depth after `mv`, extended by at most one ply.
    fn new_depth(&self, pos: &Position, mv: Move, checking: bool, depth: i32, single_reply: bool, mate_threat: bool) -> i32 {
        let opts = self.options;
        let us = pos.side_to_move();
        let mut new_depth = depth - 1;

        let recapture = opts.recapture_extension
            && pos.capture_square() == Some(mv.to())
            && see(pos, mv) > 0;
        let pawn = opts.pawn_extension
            && mv.moved().kind() == PieceKind::Pawn
            && mv.to().relative_rank(us) == 6;

        if recapture
            || (opts.check_extension && checking)
            || pawn
            || (opts.single_reply_extension && single_reply)
            || (opts.mate_threat_extension && mate_threat)
        {
            new_depth += 1;
        }

        // Trading down into a bare-king ending deserves a closer look.
        if pos.material_count(us) == 0
            && pos.material_count(us.flip()) == 1
            && mv.captured().is_some_and(|p| p.kind().is_officer())
        {
            new_depth += 1;
        }
        new_depth
    }

    // ── Interior nodes ──────────────────────────────────────────────────

    /// Negamax alpha-beta with principal variation search. Returns the value
    /// of `pos` from the side to move's view; the line lands in
    /// `worker.pv` at `height`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn alpha_beta(
        &self,
        worker: &mut Worker<E>,
        pos: &mut Position,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        height: usize,
        pv_node: bool,
        do_null: bool,
    ) -> i32 {
        if depth <= 0 {
            return self.quiescence(worker, pos, 0, 0, alpha, beta, height, pv_node, true);
        }

        self.visit(worker, height);
        if self.control.aborted() || height >= MAX_HEIGHT {
            return worker.evaluator.evaluate(pos);
        }

        // Repetition and fifty-move draws
        if pos.is_repetition() || pos.halfmove_clock() >= 100 {
            return DRAW;
        }

        if self.options.mate_distance_pruning {
            let mated = -CHECKMATE + height as i32;
            if mated > alpha {
                alpha = mated;
                if mated >= beta {
                    return mated;
                }
            }
            let mating = CHECKMATE - height as i32 - 1;
            if mating < beta {
                beta = mating;
                if mating <= alpha {
                    return mating;
                }
            }
        }

        let hash = pos.hash();
        let mut tt_move = Move::NONE;
        let mut mate_threat = false;
        if self.options.transposition_table
            && let Some(entry) = self.tt.get(hash)
        {
            tt_move = entry.mv;
            mate_threat = entry.mate_threat;
            if !pv_node && entry.depth >= depth {
                let value = entry.value(height);
                match entry.bound {
                    Bound::Lower if value >= beta => return value,
                    Bound::Upper if value <= alpha => return value,
                    Bound::Exact => return value,
                    _ => {}
                }
            }
        }

        let in_check = pos.in_check();
        let mut static_eval = None;

        // Null move
        if self.options.null_move_pruning
            && !pv_node
            && do_null
            && depth >= self.options.null_move_depth
            && !in_check
            && !mate_threat
            && pos.game_phase() != GamePhase::Endgame
            && *static_eval.get_or_insert_with(|| worker.evaluator.evaluate(pos)) >= beta
        {
            pos.make_null_move();
            let reduced = depth - 1 - self.options.null_move_cut();
            let mut value = -self.alpha_beta(worker, pos, reduced, -beta, -beta + 1, height + 1, false, false);
            pos.undo_null_move();

            let verify = self.options.null_move_verification_reduction;
            if self.options.verified_null_move && depth > verify && value >= beta {
                value = self.alpha_beta(worker, pos, depth - verify, alpha, beta, height, true, false);
                if value >= beta {
                    return value;
                }
            }

            if value < -CHECKMATE_THRESHOLD {
                mate_threat = true;
            }

            if value >= beta {
                // An unverified null move never proves a mate.
                let value = value.min(CHECKMATE_THRESHOLD);
                if self.options.transposition_table && !self.control.aborted() {
                    self.tt.put(hash, depth, value, Bound::Lower, Move::NONE, mate_threat, height);
                }
                return value;
            }
        }

        // Internal iterative deepening
        if self.options.internal_iterative_deepening
            && pv_node
            && depth >= self.options.iid_depth
            && tt_move.is_none()
        {
            let old_alpha = alpha;
            let mut window = Window::FULL;
            for iid_depth in 1..depth {
                let mut value = self.alpha_beta(worker, pos, iid_depth, window.alpha, window.beta, height, true, false);
                if self.options.aspiration_windows {
                    for &step in &self.options.aspiration_widening {
                        if self.control.aborted() || window.contains(value) {
                            break;
                        }
                        window.widen(step);
                        value = self.alpha_beta(worker, pos, iid_depth, window.alpha, window.beta, height, true, false);
                    }
                    window = Window::around(value, self.options.aspiration_window);
                }
                if self.control.aborted() {
                    return old_alpha;
                }
            }
            tt_move = worker.pv.line(height).first().copied().unwrap_or(Move::NONE);
        }

        let killers = self.killers_at(height);
        worker.pickers[height].init_main(pos, in_check, tt_move, killers, self.history);
        let node = Node {
            depth,
            height,
            pv_node,
            in_check,
            single_reply: in_check && worker.pickers[height].evasion_count() == 1,
            mate_threat,
        };

        let mut best_value = -INFINITY;
        let mut best_move = Move::NONE;
        let mut bound = Bound::Upper;
        let mut searched = 0usize;

        while let Some(mv) = worker.pickers[height].next(pos, self.history) {
            if self.skips_promotion(mv) {
                continue;
            }

            // Young brothers wait: split only after one move was searched.
            if searched > 0 && self.scheduler.splits_at(depth) {
                let mut rest = vec![mv];
                while let Some(next) = worker.pickers[height].next(pos, self.history) {
                    if !self.skips_promotion(next) {
                        rest.push(next);
                    }
                }
                let results = self.split(pos, &node, &rest, alpha, beta, searched);
                for result in results.into_iter().flatten() {
                    if self.control.aborted() {
                        break;
                    }
                    if result.pruned {
                        best_value = best_value.max(result.value);
                        continue;
                    }
                    if result.value > best_value {
                        best_value = result.value;
                        worker.pv.set(height, result.mv, &result.line);
                        if result.value > alpha {
                            best_move = result.mv;
                            bound = Bound::Exact;
                            alpha = result.value;
                            if result.value >= beta {
                                bound = Bound::Lower;
                                break;
                            }
                        }
                    }
                }
                break;
            }

            let first = best_value == -INFINITY;
            let value = match self.search_move(worker, pos, mv, &node, alpha, beta, first, searched, &mut static_eval) {
                Searched::Pruned(value) => {
                    best_value = best_value.max(value);
                    continue;
                }
                Searched::Value(value) => value,
            };
            if self.control.aborted() {
                break;
            }
            searched += 1;

            if value > best_value {
                best_value = value;
                worker.pv.update(height, mv);
                if value > alpha {
                    best_move = mv;
                    bound = Bound::Exact;
                    alpha = value;
                    if value >= beta {
                        bound = Bound::Lower;
                        break;
                    }
                }
            }
        }

        // No legal move: mate or stalemate
        if best_value == -INFINITY {
            bound = Bound::Exact;
            best_value = if in_check { -CHECKMATE + height as i32 } else { DRAW };
        }

        if !self.control.aborted() {
            self.add_good_move(best_move, depth, height);
            if self.options.transposition_table {
                self.tt.put(hash, depth, best_value, bound, best_move, mate_threat, height);
            }
        }

        best_value
    }

    /// Search one move of a node: extensions, futility pruning, late move
    /// reduction and the PVS null-window probe.
    #[allow(clippy::too_many_arguments)]
    fn search_move(
        &self,
        worker: &mut Worker<E>,
        pos: &mut Position,
        mv: Move,
        node: &Node,
        alpha: i32,
        beta: i32,
        first: bool,
        searched: usize,
        static_eval: &mut Option<i32>,
    ) -> Searched {
        let opts = self.options;
        let checking = pos.is_checking_move(mv);
        let mut new_depth = self.new_depth(pos, mv, checking, node.depth, node.single_reply, node.mate_threat);

        let prunable = !node.pv_node
            && !node.in_check
            && (opts.check_extension || !checking)
            && !is_dangerous(mv);

        // Futility pruning one and two plies from the horizon
        if prunable {
            let margin = if opts.extended_futility_pruning && node.depth == 2 && new_depth == 1 {
                Some(opts.extended_futility_margin)
            } else if opts.futility_pruning && node.depth == 1 && new_depth == 0 {
                Some(opts.futility_margin)
            } else {
                None
            };
            if let Some(margin) = margin {
                let eval = *static_eval.get_or_insert_with(|| worker.evaluator.evaluate(pos));
                let estimate = eval + margin + captured_value(mv);
                if estimate <= alpha {
                    return Searched::Pruned(estimate);
                }
            }
        }

        // Late move reduction
        let mut reduced = false;
        if opts.late_move_reduction
            && prunable
            && searched >= opts.lmr_move_number
            && node.depth >= opts.lmr_depth
            && new_depth < node.depth
            && !mv.is_capture()
        {
            new_depth -= 1;
            reduced = true;
        }

        let child = node.height + 1;
        pos.make_move(mv);
        let mut value = if !node.pv_node || first {
            -self.alpha_beta(worker, pos, new_depth, -beta, -alpha, child, node.pv_node, true)
        } else {
            let probe_depth = if new_depth >= node.depth { node.depth - 1 } else { new_depth };
            let probe = -self.alpha_beta(worker, pos, probe_depth, -alpha - 1, -alpha, child, false, true);
            if probe > alpha && probe < beta {
                -self.alpha_beta(worker, pos, new_depth, -beta, -alpha, child, true, true)
            } else {
                probe
            }
        };
        if opts.late_move_reduction_research && reduced && value >= beta {
            value = -self.alpha_beta(worker, pos, new_depth + 1, -beta, -alpha, child, node.pv_node, true);
        }
        pos.undo_move(mv);

        Searched::Value(value)
    }

    /// Search the remaining moves of a node as independent tasks.
    ///
    /// Every task works on its own copy of `pos` and its own worker, with the
    /// window the node had when it split. Once one task fails high the
    /// unstarted ones are skipped.
    fn split(&self, pos: &Position, node: &Node, moves: &[Move], alpha: i32, beta: i32, searched: usize) -> Vec<Option<ChildResult>> {
        let cutoff = AtomicBool::new(false);
        let task = |index: usize| -> Option<ChildResult> {
            if cutoff.load(Ordering::Relaxed) || self.control.aborted() {
                return None;
            }
            let mv = moves[index];
            let mut board = pos.clone();
            let mut worker = self.workers.acquire();
            let mut static_eval = None;
            let outcome = self.search_move(&mut worker, &mut board, mv, node, alpha, beta, false, searched + index, &mut static_eval);
            let result = match outcome {
                Searched::Pruned(value) => ChildResult {
                    mv,
                    value,
                    pruned: true,
                    line: Vec::new(),
                },
                Searched::Value(value) => {
                    if value >= beta {
                        cutoff.store(true, Ordering::Relaxed);
                    }
                    ChildResult {
                        mv,
                        value,
                        pruned: false,
                        line: worker.pv.line(node.height + 1).to_vec(),
                    }
                }
            };
            self.workers.release(worker);
            Some(result)
        };
        self.scheduler.run(moves.len(), &task)
    }

    // ── Root ────────────────────────────────────────────────────────────

    /// Search every root move at `depth` inside `[alpha, beta]`.
    ///
    /// Values are clamped to the window. Afterwards `moves` is reordered for
    /// the next iteration: the hash move first, then by value.
    pub(crate) fn root(
        &self,
        worker: &mut Worker<E>,
        pos: &mut Position,
        moves: &mut [RootMove],
        depth: i32,
        mut alpha: i32,
        beta: i32,
    ) -> RootOutcome {
        self.visit(worker, 0);
        let old_alpha = alpha;
        let single_reply = has_single_reply(pos);

        let mut best_value = -INFINITY;
        let mut best_move = None;
        let mut bound = Bound::Upper;

        for (index, root_move) in moves.iter_mut().enumerate() {
            let mv = root_move.mv;
            self.listener.current_move(mv, index + 1);

            let checking = pos.is_checking_move(mv);
            let new_depth = self.new_depth(pos, mv, checking, depth, single_reply, false);

            pos.make_move(mv);
            let mut value = if best_value == -INFINITY {
                -self.alpha_beta(worker, pos, new_depth, -beta, -alpha, 1, true, true)
            } else {
                let probe = -self.alpha_beta(worker, pos, new_depth, -alpha - 1, -alpha, 1, false, true);
                if probe > alpha && probe < beta {
                    -self.alpha_beta(worker, pos, new_depth, -beta, -alpha, 1, true, true)
                } else {
                    probe
                }
            };
            pos.undo_move(mv);

            if self.control.aborted() {
                break;
            }

            if value <= alpha {
                value = alpha;
                root_move.value = old_alpha;
            } else if value >= beta {
                value = beta;
                root_move.value = beta;
            } else {
                root_move.value = value;
            }

            if value > best_value {
                best_value = value;
                worker.pv.update(0, mv);
                if value > alpha {
                    best_move = Some(mv);
                    bound = Bound::Exact;
                    alpha = value;
                    let reported = if value >= beta { Bound::Lower } else { Bound::Exact };
                    if depth > 1 {
                        self.report(depth, value, reported, worker.pv.line(0).to_vec());
                    }
                    if value >= beta {
                        bound = Bound::Lower;
                        break;
                    }
                }
            }
        }

        if !self.control.aborted() {
            if self.options.transposition_table {
                self.tt.put(pos.hash(), depth, best_value, bound, best_move.unwrap_or(Move::NONE), false, 0);
            }
            if depth == 1 && best_move.is_some() {
                self.report(depth, best_value, bound, worker.pv.line(0).to_vec());
            }
            if best_move.is_none() && best_value > -INFINITY {
                self.report(depth, best_value, Bound::Upper, worker.pv.line(0).to_vec());
            }
        }

        let tt_move = if self.options.transposition_table {
            self.tt.get(pos.hash()).map(|entry| entry.mv)
        } else {
            None
        };
        for root_move in moves.iter_mut() {
            if Some(root_move.mv) == tt_move {
                root_move.value = INFINITY;
            }
        }
        moves.sort_by(|a, b| b.value.cmp(&a.value));

        RootOutcome {
            best_move,
            value: best_value,
            bound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(fen: &str, text: &str) -> Move {
        let pos: Position = fen.parse().unwrap();
        pos.parse_move(text).unwrap()
    }

    #[test]
    fn window_widening_is_clamped() {
        let mut window = Window::around(CHECKMATE - 5, 20);
        assert_eq!(window.beta, CHECKMATE);
        assert!(window.contains(CHECKMATE - 25 + 1));
        assert!(!window.contains(CHECKMATE - 25));
        window.widen(CHECKMATE);
        assert_eq!(window.alpha, -25);
        window.widen(CHECKMATE);
        assert_eq!((window.alpha, window.beta), (-CHECKMATE, CHECKMATE));
    }

    #[test]
    fn seventh_rank_pushes_and_queen_captures_are_dangerous() {
        assert!(is_dangerous(mv("8/4P3/8/8/8/8/k7/4K3 w - - 0 1", "e7e8q")));
        assert!(is_dangerous(mv("8/8/8/8/8/8/k3p3/7K b - - 0 1", "e2e1q")));
        assert!(!is_dangerous(mv("8/8/8/4P3/8/8/k7/4K3 w - - 0 1", "e5e6")));
        assert!(is_dangerous(mv("k7/8/8/3q4/4P3/8/8/4K3 w - - 0 1", "e4d5")));
        assert!(!is_dangerous(mv("k7/8/8/3r4/4P3/8/8/4K3 w - - 0 1", "e4d5")));
    }

    #[test]
    fn single_reply_counts_every_legal_evasion() {
        let only_capture: Position = "k7/pp6/8/8/8/8/1q6/K6Q w - - 0 1".parse().unwrap();
        assert!(has_single_reply(&only_capture));
        let two_squares: Position = "k7/8/8/8/8/8/8/K6r w - - 0 1".parse().unwrap();
        assert!(!has_single_reply(&two_squares));
        let quiet: Position = "k7/8/8/8/8/8/1r6/K7 w - - 0 1".parse().unwrap();
        assert!(!has_single_reply(&quiet), "one legal move without check");
    }
}
