//! Quiescence search: captures, promotions and a few checks past the
//! horizon until the position is quiet.

use kestrel_core::{Move, Position};

use crate::eval::Evaluate;
use crate::search::negamax::{SearchContext, captured_value, is_dangerous};
use crate::search::worker::Worker;
use crate::search::{Bound, CHECKMATE, DRAW, INFINITY, MAX_HEIGHT};

impl<E: Evaluate> SearchContext<'_, E> {
    /// Quiescence search below the horizon.
    ///
    /// `checking_depth` starts at zero; quiet checks are generated while it
    /// is non-negative, and every check evasion raises it so the side in
    /// check can answer with a check of its own. `evasions` counts the check
    /// evasions on the current line; past the configured limit an in-check
    /// node is scored statically. Only the node at the horizon uses the
    /// hash table.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn quiescence(
        &self,
        worker: &mut Worker<E>,
        pos: &mut Position,
        checking_depth: i32,
        evasions: i32,
        mut alpha: i32,
        mut beta: i32,
        height: usize,
        pv_node: bool,
        use_tt: bool,
    ) -> i32 {
        self.visit(worker, height);
        if self.control.aborted() || height >= MAX_HEIGHT {
            return worker.evaluator.evaluate(pos);
        }

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

        let use_tt = use_tt && self.options.transposition_table;
        let hash = pos.hash();
        if use_tt && let Some(entry) = self.tt.get(hash) {
            let value = entry.value(height);
            match entry.bound {
                Bound::Lower if value >= beta => return value,
                Bound::Upper if value <= alpha => return value,
                Bound::Exact => return value,
                _ => {}
            }
        }

        let in_check = pos.in_check();
        let mut best_value = -INFINITY;
        let mut bound = Bound::Upper;
        let mut checking_depth = checking_depth;
        let mut evasions = evasions;
        let mut stand_pat = 0;

        if in_check {
            evasions += 1;
            if evasions > self.options.quiescence_check_limit {
                return worker.evaluator.evaluate(pos);
            }
            checking_depth += 1;
        } else {
            // Stand pat: the side to move need not capture
            stand_pat = worker.evaluator.evaluate(pos);
            best_value = stand_pat;
            if stand_pat > alpha {
                bound = Bound::Exact;
                alpha = stand_pat;
                if stand_pat >= beta {
                    if use_tt {
                        self.tt.put(hash, 0, stand_pat, Bound::Lower, Move::NONE, false, height);
                    }
                    return stand_pat;
                }
            }
        }

        let killers = self.killers_at(height);
        worker.pickers[height].init_quiescence(pos, in_check, checking_depth >= 0, killers, self.history);

        while let Some(mv) = worker.pickers[height].next(pos, self.history) {
            // Delta pruning
            if self.options.delta_pruning
                && !pv_node
                && !in_check
                && !is_dangerous(mv)
                && !pos.is_checking_move(mv)
            {
                let estimate = stand_pat + self.options.delta_margin + captured_value(mv);
                if estimate <= alpha {
                    best_value = best_value.max(estimate);
                    continue;
                }
            }

            pos.make_move(mv);
            let value = -self.quiescence(worker, pos, checking_depth - 1, evasions, -beta, -alpha, height + 1, pv_node, false);
            pos.undo_move(mv);

            if self.control.aborted() {
                break;
            }

            if value > best_value {
                best_value = value;
                worker.pv.update(height, mv);
                if value > alpha {
                    bound = Bound::Exact;
                    alpha = value;
                    if value >= beta {
                        bound = Bound::Lower;
                        break;
                    }
                }
            }
        }

        // In check without an evasion
        if best_value == -INFINITY {
            bound = Bound::Exact;
            best_value = -CHECKMATE + height as i32;
        }

        if use_tt && !self.control.aborted() {
            self.tt.put(hash, 0, best_value, bound, Move::NONE, false, height);
        }

        best_value
    }
}
