//! Search control: stop flags, node counting and the time budget.
//!
//! One [`SearchControl`] is shared by every thread of a search and by the
//! handle that can stop it. The search aborts only when it is both stopped
//! and allowed to stop: until the first iteration completes a stop request
//! is held back, so a search always has a move to return.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use kestrel_core::Color;
use tracing::debug;

use crate::search::options::TimeConfig;
use crate::search::timer::DeadlineTimer;
use crate::search::{CHECKMATE, CHECKMATE_THRESHOLD, Clock, SearchLimits, SearchMode};
use crate::time::{TimeBudget, compute_limits};

/// Minimum spacing of status reports.
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// Nodes between checks whether a status report is due.
const STATUS_NODE_MASK: u64 = 1023;

#[derive(Debug, Clone, Copy)]
struct TimeState {
    /// Whether the driver may end the search early on its own.
    managed: bool,
    start: Instant,
    budget: Option<TimeBudget>,
}

/// Summary of the last completed iteration, consulted on a ponder hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Progress {
    pub(crate) value: i32,
    pub(crate) depth: i32,
    pub(crate) move_count: usize,
}

impl Progress {
    fn mate_found(&self) -> bool {
        mate_proven(self.value, self.depth)
    }
}

/// An iteration to `depth` saw far enough to prove its mate score `value`.
pub(crate) fn mate_proven(value: i32, depth: i32) -> bool {
    value.abs() > CHECKMATE_THRESHOLD && depth >= CHECKMATE - value.abs()
}

pub struct SearchControl {
    stopped: AtomicBool,
    can_stop: AtomicBool,
    pondering: AtomicBool,
    nodes: AtomicU64,
    node_limit: Option<u64>,
    seldepth: AtomicUsize,
    depth: AtomicI32,
    started: Instant,
    last_status_ms: AtomicU64,

    side: Color,
    clock: Option<Clock>,
    movetime: Option<Duration>,
    config: TimeConfig,
    time: Mutex<TimeState>,
    timer: Mutex<Option<DeadlineTimer>>,
    progress: Mutex<Option<Progress>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SearchControl {
    pub(crate) fn new(limits: &SearchLimits, side: Color, config: TimeConfig) -> Arc<SearchControl> {
        let (clock, movetime) = match &limits.mode {
            SearchMode::Clock(clock) => (Some(*clock), None),
            SearchMode::MoveTime(time) => (None, Some(*time)),
            _ => (None, None),
        };
        let now = Instant::now();
        Arc::new(SearchControl {
            stopped: AtomicBool::new(false),
            can_stop: AtomicBool::new(false),
            pondering: AtomicBool::new(limits.ponder),
            nodes: AtomicU64::new(0),
            node_limit: limits.node_limit(),
            seldepth: AtomicUsize::new(0),
            depth: AtomicI32::new(0),
            started: now,
            last_status_ms: AtomicU64::new(0),
            side,
            clock,
            movetime,
            config,
            time: Mutex::new(TimeState {
                managed: false,
                start: now,
                budget: None,
            }),
            timer: Mutex::new(None),
            progress: Mutex::new(None),
        })
    }

    /// Start the clock, unless the search is pondering.
    pub(crate) fn begin(self: &Arc<Self>) {
        if !self.pondering.load(Ordering::Acquire) {
            self.start_clock();
        }
    }

    fn start_clock(self: &Arc<Self>) {
        let now = Instant::now();
        let (managed, budget) = match (self.movetime, &self.clock) {
            (Some(time), _) => (false, TimeBudget { soft: time, hard: time }),
            (None, Some(clock)) => (true, compute_limits(Some(clock), self.side, &self.config)),
            (None, None) => return,
        };
        debug!(
            soft_ms = budget.soft.as_millis() as u64,
            hard_ms = budget.hard.as_millis() as u64,
            managed,
            "time budget set"
        );
        *lock(&self.time) = TimeState {
            managed,
            start: now,
            budget: Some(budget),
        };
        self.arm(budget.hard);
    }

    fn arm(self: &Arc<Self>, after: Duration) {
        *lock(&self.timer) = DeadlineTimer::start(after, Arc::downgrade(self));
    }

    /// Cancel a pending deadline.
    pub(crate) fn disarm(&self) {
        lock(&self.timer).take();
    }

    /// Request the search to end as soon as it may.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.can_stop.store(true, Ordering::Release);
    }

    /// The opponent played the expected move: the ponder search becomes a
    /// normal timed search. A search that already proved a mate or has a
    /// single legal move stops right away.
    pub fn ponderhit(self: &Arc<Self>) {
        if !self.pondering.swap(false, Ordering::AcqRel) {
            return;
        }
        if self.movetime.is_some() {
            self.start_clock();
        } else {
            let budget = compute_limits(self.clock.as_ref(), self.side, &self.config);
            *lock(&self.time) = TimeState {
                managed: true,
                start: Instant::now(),
                budget: Some(budget),
            };
            self.arm(budget.hard);
        }
        let progress = *lock(&self.progress);
        if let Some(progress) = progress {
            self.can_stop.store(true, Ordering::Release);
            if progress.mate_found() || progress.move_count == 1 {
                self.stopped.store(true, Ordering::Release);
            }
        }
        debug!(?progress, "ponder hit");
    }

    /// Whether the search must unwind now.
    #[inline]
    pub fn aborted(&self) -> bool {
        self.stopped.load(Ordering::Relaxed) && self.can_stop.load(Ordering::Relaxed)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn is_pondering(&self) -> bool {
        self.pondering.load(Ordering::Acquire)
    }

    /// Let pending and future stop requests take effect.
    pub(crate) fn allow_stop(&self) {
        self.can_stop.store(true, Ordering::Release);
    }

    /// Count a visited node `height` plies below the root. Reaching the node
    /// limit stops the search.
    #[inline]
    pub(crate) fn count_node(&self, height: usize) -> u64 {
        let nodes = self.nodes.fetch_add(1, Ordering::Relaxed) + 1;
        if height > self.seldepth.load(Ordering::Relaxed) {
            self.seldepth.fetch_max(height, Ordering::Relaxed);
        }
        if let Some(limit) = self.node_limit
            && nodes >= limit
        {
            self.stopped.store(true, Ordering::Relaxed);
        }
        nodes
    }

    /// Whether a status report is due. Claims the report slot when it is.
    pub(crate) fn status_due(&self, nodes: u64) -> bool {
        if nodes & STATUS_NODE_MASK != 0 {
            return false;
        }
        let now = self.elapsed().as_millis() as u64;
        let last = self.last_status_ms.load(Ordering::Relaxed);
        now >= last + STATUS_INTERVAL.as_millis() as u64
            && self
                .last_status_ms
                .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
    }

    pub fn nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    pub fn seldepth(&self) -> usize {
        self.seldepth.load(Ordering::Relaxed)
    }

    pub(crate) fn set_depth(&self, depth: i32) {
        self.depth.store(depth, Ordering::Relaxed);
    }

    pub fn depth(&self) -> i32 {
        self.depth.load(Ordering::Relaxed)
    }

    /// Time since the search started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn nps(&self) -> u64 {
        let millis = (self.elapsed().as_millis() as u64).max(1);
        self.nodes() * 1000 / millis
    }

    /// Budget and its start when the driver manages time itself.
    pub(crate) fn managed_budget(&self) -> Option<(Instant, TimeBudget)> {
        let state = *lock(&self.time);
        match state.budget {
            Some(budget) if state.managed => Some((state.start, budget)),
            _ => None,
        }
    }

    /// Whether a time budget is running, managed or fixed. False for
    /// depth, node and infinite searches and while pondering.
    pub(crate) fn is_timed(&self) -> bool {
        lock(&self.time).budget.is_some()
    }

    pub(crate) fn config(&self) -> &TimeConfig {
        &self.config
    }

    pub(crate) fn publish(&self, progress: Progress) {
        *lock(&self.progress) = Some(progress);
    }
}

impl std::fmt::Debug for SearchControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchControl")
            .field("stopped", &self.stopped.load(Ordering::Relaxed))
            .field("can_stop", &self.can_stop.load(Ordering::Relaxed))
            .field("pondering", &self.is_pondering())
            .field("nodes", &self.nodes())
            .finish()
    }
}
