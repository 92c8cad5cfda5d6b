//! Iterative deepening and the engine facade.
//!
//! An [`Engine`] owns everything that outlives a single search: the hash
//! table, killer and history tables, idle workers, the scheduler and the
//! measured iteration times. [`Engine::search`] runs on the calling thread;
//! [`Engine::start`] runs on a dedicated thread and hands back a
//! [`SearchHandle`] for stop and ponder-hit requests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use kestrel_core::{Move, Position};
use tracing::{debug, info, trace, warn};

use crate::error::SearchError;
use crate::eval::{Evaluate, Evaluator};
use crate::search::control::{Progress, SearchControl, mate_proven};
use crate::search::heuristics::{HistoryTable, KillerTable};
use crate::search::listener::SearchListener;
use crate::search::negamax::{RootMove, RootOutcome, SearchContext, Window, captured_value};
use crate::search::options::SearchOptions;
use crate::search::scheduler::{SEARCH_STACK_SIZE, Scheduler, Sequential, TaskParallel};
use crate::search::tt::TranspositionTable;
use crate::search::worker::{Worker, WorkerPool};
use crate::search::{
    Bound, CHECKMATE, CHECKMATE_THRESHOLD, DRAW, SearchLimits, SearchResult,
};
use crate::time::IterationTimes;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by the engine and its running search.
struct Shared<E> {
    options: SearchOptions,
    tt: TranspositionTable,
    killers: KillerTable,
    history: HistoryTable,
    workers: WorkerPool<E>,
    scheduler: Box<dyn Scheduler>,
    times: Mutex<IterationTimes>,
    /// Held for the duration of a search; searches on one engine never overlap.
    running: Mutex<()>,
}

/// A completed iteration.
#[derive(Debug, Clone)]
struct Iteration {
    best_move: Move,
    value: i32,
    bound: Bound,
    depth: i32,
    line: Vec<Move>,
}

/// A chess search engine.
///
/// Generic over the static evaluation; the default is the full
/// [`Evaluator`].
pub struct Engine<E: Evaluate = Evaluator> {
    shared: Arc<Shared<E>>,
}

impl Engine<Evaluator> {
    pub fn new(options: SearchOptions) -> Result<Engine<Evaluator>, SearchError> {
        let evaluator = Evaluator::with_pawn_cache(options.pawn_cache_slots);
        Engine::with_evaluator(options, evaluator)
    }
}

impl<E: Evaluate> Engine<E> {
    /// Build an engine around `evaluator`. Each search thread evaluates with
    /// its own clone.
    pub fn with_evaluator(options: SearchOptions, evaluator: E) -> Result<Engine<E>, SearchError> {
        let tt = TranspositionTable::new(options.hash_mib)?;
        let scheduler: Box<dyn Scheduler> = if options.threads > 1 {
            Box::new(TaskParallel::new(options.threads, options.split_depth)?)
        } else {
            Box::new(Sequential)
        };
        debug!(
            hash_mib = options.hash_mib,
            slots = tt.len(),
            threads = options.threads,
            "engine created"
        );
        Ok(Engine {
            shared: Arc::new(Shared {
                options,
                tt,
                killers: KillerTable::new(),
                history: HistoryTable::new(),
                workers: WorkerPool::new(evaluator),
                scheduler,
                times: Mutex::new(IterationTimes::new()),
                running: Mutex::new(()),
            }),
        })
    }

    pub fn options(&self) -> &SearchOptions {
        &self.shared.options
    }

    /// Hash table fill of the last search, in thousandths.
    pub fn hashfull(&self) -> u32 {
        self.shared.tt.permill()
    }

    /// Forget everything learned in the previous game.
    pub fn new_game(&self) {
        let _running = lock(&self.shared.running);
        self.shared.tt.clear();
        self.shared.killers.clear();
        self.shared.history.clear();
        self.shared.workers.clear();
        lock(&self.shared.times).clear();
        debug!("engine reset for a new game");
    }

    /// Search `pos` on the calling thread until `limits` end it.
    ///
    /// Fails only when a move of `limits.search_moves` is not legal in `pos`.
    pub fn search(
        &self,
        pos: &Position,
        limits: SearchLimits,
        listener: &dyn SearchListener,
    ) -> Result<SearchResult, SearchError> {
        validate_search_moves(pos, &limits)?;
        let control = SearchControl::new(&limits, pos.side_to_move(), self.shared.options.time.clone());
        Ok(self.shared.run(pos.clone(), &limits, &control, listener))
    }

    /// Search `pos` on a background thread.
    pub fn start(
        &self,
        pos: Position,
        limits: SearchLimits,
        listener: Arc<dyn SearchListener>,
    ) -> Result<SearchHandle, SearchError> {
        validate_search_moves(&pos, &limits)?;
        let control = SearchControl::new(&limits, pos.side_to_move(), self.shared.options.time.clone());
        let shared = Arc::clone(&self.shared);
        let search_control = Arc::clone(&control);
        let thread = thread::Builder::new()
            .name("kestrel-main".into())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || shared.run(pos, &limits, &search_control, listener.as_ref()))?;
        Ok(SearchHandle { control, thread })
    }
}

impl<E: Evaluate> std::fmt::Debug for Engine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.shared.options)
            .field("tt", &self.shared.tt)
            .finish_non_exhaustive()
    }
}

/// A search running on its own thread.
#[derive(Debug)]
pub struct SearchHandle {
    control: Arc<SearchControl>,
    thread: JoinHandle<SearchResult>,
}

impl SearchHandle {
    /// Ask the search to finish. It still returns its best move so far.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// The opponent played the ponder move: start the clock.
    pub fn ponderhit(&self) {
        self.control.ponderhit();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn control(&self) -> &SearchControl {
        &self.control
    }

    /// Wait for the search to finish.
    pub fn join(self) -> Result<SearchResult, SearchError> {
        self.thread.join().map_err(|_| SearchError::Panicked)
    }
}

/// Every restricting move must be legal at the root.
fn validate_search_moves(pos: &Position, limits: &SearchLimits) -> Result<(), SearchError> {
    match limits
        .search_moves
        .iter()
        .find(|&&mv| !pos.is_pseudo_legal(mv) || !pos.is_legal(mv))
    {
        Some(mv) => {
            warn!(%mv, fen = %pos.to_fen(), "rejected search move");
            Err(SearchError::IllegalSearchMove { mv: mv.to_string() })
        }
        None => Ok(()),
    }
}

impl<E: Evaluate> Shared<E> {
    /// Run one search to completion.
    ///
    /// The hash table ages only for analysis; game searches keep the
    /// previous search's entries so the root entry can seed this one.
    fn run(
        &self,
        mut pos: Position,
        limits: &SearchLimits,
        control: &Arc<SearchControl>,
        listener: &dyn SearchListener,
    ) -> SearchResult {
        let _running = lock(&self.running);
        let analysis = limits.is_analysis();

        // Analysis keeps nothing from earlier searches.
        if analysis {
            self.tt.increase_age();
        }
        self.killers.clear();
        self.history.clear();
        control.begin();

        let ctx = SearchContext {
            options: &self.options,
            tt: &self.tt,
            killers: &self.killers,
            history: &self.history,
            control,
            listener,
            scheduler: self.scheduler.as_ref(),
            workers: &self.workers,
            analysis,
        };
        let mut worker = self.workers.acquire();
        let result = self.deepen(&ctx, &mut worker, &mut pos, limits);
        self.workers.release(worker);

        control.disarm();
        info!(
            best = %result,
            score = result.score,
            depth = result.depth,
            nodes = result.nodes,
            time_ms = result.time.as_millis() as u64,
            "search finished"
        );
        listener.best_move(result.best_move, result.ponder_move);
        result
    }

    fn root_moves(&self, ctx: &SearchContext<'_, E>, worker: &mut Worker<E>, pos: &Position, limits: &SearchLimits, tt_move: Move) -> Vec<RootMove> {
        if !limits.search_moves.is_empty() {
            return limits.search_moves.iter().map(|&mv| RootMove::new(mv)).collect();
        }
        let picker = &mut worker.pickers[0];
        picker.init_main(pos, pos.in_check(), tt_move, ctx.killers_at(0), &self.history);
        let mut moves = Vec::new();
        while let Some(mv) = picker.next(pos, &self.history) {
            moves.push(RootMove::new(mv));
        }
        moves
    }

    /// Iterative deepening from depth one, or from the depth of an exact hash
    /// entry for the root, until a limit or the time control ends it.
    fn deepen(
        &self,
        ctx: &SearchContext<'_, E>,
        worker: &mut Worker<E>,
        pos: &mut Position,
        limits: &SearchLimits,
    ) -> SearchResult {
        let control = ctx.control;
        let options = &self.options;
        let tt_entry = if options.transposition_table {
            self.tt.get(pos.hash())
        } else {
            None
        };
        let tt_move = tt_entry.map_or(Move::NONE, |entry| entry.mv);
        let mut moves = self.root_moves(ctx, worker, pos, limits, tt_move);

        if moves.is_empty() {
            let score = if pos.in_check() { -CHECKMATE } else { DRAW };
            return SearchResult {
                best_move: None,
                ponder_move: None,
                pv: Vec::new(),
                score,
                bound: Bound::Exact,
                depth: 0,
                nodes: control.nodes(),
                time: control.elapsed(),
                move_count: 0,
            };
        }

        let max_depth = limits.max_depth();
        let tt_depth = tt_entry.map_or(-1, |entry| entry.depth);
        let mut initial_depth = 1;
        let mut equal_results = 0;
        let mut seed = None;
        if !ctx.analysis
            && let Some(entry) = tt_entry
            && entry.depth > 1
            && entry.depth <= max_depth
            && entry.bound == Bound::Exact
            && entry.value(0).abs() < CHECKMATE_THRESHOLD
        {
            let line = self.tt.principal_line(pos, entry.depth);
            if let Some(&first) = line.first()
                && moves.iter().any(|root| root.mv == first)
            {
                initial_depth = entry.depth;
                equal_results = entry.depth - 2;
                seed = Some(Iteration {
                    best_move: first,
                    value: entry.value(0),
                    bound: Bound::Exact,
                    depth: entry.depth,
                    line,
                });
            }
        }

        let mut window = Window::FULL;
        let mut best: Option<Iteration> = seed.clone();

        for depth in initial_depth..=max_depth {
            control.set_depth(depth);
            ctx.listener.depth_started(depth);
            let started = Instant::now();

            let (mut outcome, mut line) = match seed.take() {
                Some(seeded) => {
                    debug!(depth, value = seeded.value, "iteration seeded from the hash table");
                    ctx.report(depth, seeded.value, Bound::Exact, seeded.line.clone());
                    let outcome = RootOutcome {
                        best_move: Some(seeded.best_move),
                        value: seeded.value,
                        bound: Bound::Exact,
                    };
                    (outcome, seeded.line)
                }
                None => {
                    let outcome = ctx.root(worker, pos, &mut moves, depth, window.alpha, window.beta);
                    (outcome, worker.pv.line(0).to_vec())
                }
            };

            if !control.aborted() && options.aspiration_windows && depth >= tt_depth {
                for &step in &options.aspiration_widening {
                    if window.contains(outcome.value) {
                        break;
                    }
                    window.widen(step);
                    trace!(depth, value = outcome.value, alpha = window.alpha, beta = window.beta, "aspiration re-search");
                    let retry = ctx.root(worker, pos, &mut moves, depth, window.alpha, window.beta);
                    if control.aborted() {
                        break;
                    }
                    outcome = retry;
                    line = worker.pv.line(0).to_vec();
                }
                window = Window::around(outcome.value, options.aspiration_window);
            }

            // An interrupted iteration is never reported.
            if control.aborted() {
                debug!(depth, "iteration interrupted");
                break;
            }

            let elapsed = started.elapsed();
            if depth > initial_depth {
                lock(&self.times).record(depth, elapsed);
            }

            // Every widening failed low
            let Some(best_move) = outcome.best_move else {
                break;
            };
            if line.first() != Some(&best_move) {
                line = vec![best_move];
            }

            let previous = best.as_ref();
            if previous.map(|it| it.best_move) == Some(best_move) {
                equal_results += 1;
            } else {
                equal_results = 0;
            }

            let stop = self.out_of_time(
                control,
                pos,
                &outcome,
                best_move,
                previous.map(|it| it.value),
                depth,
                initial_depth,
                equal_results,
                elapsed,
                moves.len(),
            );

            debug!(
                depth,
                value = outcome.value,
                best = %best_move,
                nodes = control.nodes(),
                elapsed_ms = elapsed.as_millis() as u64,
                "iteration complete"
            );

            best = Some(Iteration {
                best_move,
                value: outcome.value,
                bound: outcome.bound,
                depth,
                line,
            });
            control.publish(Progress {
                value: outcome.value,
                depth,
                move_count: moves.len(),
            });

            if stop {
                break;
            }
            control.allow_stop();
            if control.is_stopped() {
                break;
            }
        }

        let nodes = control.nodes();
        let time = control.elapsed();
        match best {
            Some(iteration) => SearchResult {
                best_move: Some(iteration.best_move),
                ponder_move: iteration.line.get(1).copied(),
                pv: iteration.line,
                score: iteration.value,
                bound: iteration.bound,
                depth: iteration.depth,
                nodes,
                time,
                move_count: moves.len(),
            },
            // Stopped before any iteration completed
            None => SearchResult {
                best_move: Some(moves[0].mv),
                ponder_move: None,
                pv: vec![moves[0].mv],
                score: DRAW,
                bound: Bound::Upper,
                depth: 0,
                nodes,
                time,
                move_count: moves.len(),
            },
        }
    }

    /// Whether a timed search should end after this iteration.
    ///
    /// A proven mate or a single root move ends any timed search. Under a
    /// clock the search also stops when the next iteration would not fit
    /// the hard limit, or the soft limit while the result is stable, and on
    /// a stable recapture of a minor piece or more.
    #[allow(clippy::too_many_arguments)]
    fn out_of_time(
        &self,
        control: &SearchControl,
        pos: &Position,
        outcome: &RootOutcome,
        best_move: Move,
        previous_value: Option<i32>,
        depth: i32,
        initial_depth: i32,
        equal_results: i32,
        elapsed: Duration,
        move_count: usize,
    ) -> bool {
        let decided = mate_proven(outcome.value, depth) || move_count == 1;
        let Some((start, budget)) = control.managed_budget() else {
            return decided && control.is_timed();
        };
        let config = control.config();
        let extended = previous_value.is_none_or(|prev| (outcome.value - prev).abs() > config.extension_margin)
            || equal_results < 1;

        let mut times = lock(&self.times);
        let next = times.predict(depth + 1, elapsed);
        let now = Instant::now();
        if start + budget.hard < now + next || (!extended && start + budget.soft < now + next) {
            times.stopped_at(depth, initial_depth);
            debug!(depth, next_ms = next.as_millis() as u64, "next iteration would not fit");
            return true;
        }

        let easy_recapture = !extended
            && pos.capture_square() == Some(best_move.to())
            && captured_value(best_move) >= config.easy_recapture_value
            && equal_results > config.easy_recapture_iterations as i32;
        easy_recapture || decided
    }
}
