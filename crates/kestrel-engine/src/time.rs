//! Time management: clock budgets and per-depth iteration timing.

use std::time::Duration;

use kestrel_core::Color;

use crate::search::options::TimeConfig;
use crate::search::{Clock, MAX_DEPTH};

/// Soft and hard limits of a time-managed search.
///
/// No new iteration starts once the next one is predicted to end past the
/// soft limit. The hard limit aborts a running search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    pub soft: Duration,
    pub hard: Duration,
}

/// Budget for the side to move.
///
/// With time on the clock, the usable time (`usable_permille` of it, less
/// the reserve) is spread over the moves to go, each move also counting on
/// the increments still to come. The hard limit is `1 / hard_divisor` of
/// the whole pool, never below the soft limit nor above the usable time.
/// Without a clock the configured fallback applies.
pub fn compute_limits(clock: Option<&Clock>, side: Color, config: &TimeConfig) -> TimeBudget {
    let remaining = clock.map_or(Duration::ZERO, |clock| clock.remaining(side));
    let Some(clock) = clock.filter(|_| !remaining.is_zero()) else {
        return TimeBudget {
            soft: config.fallback,
            hard: config.fallback * 3 / 2,
        };
    };

    let cap = config.moves_to_go.max(1);
    let moves_to_go = match clock.moves_to_go {
        Some(moves) if (1..=cap).contains(&moves) => moves,
        _ => cap,
    };
    let increment = clock.increment(side).as_millis() as i64;
    let usable = (remaining.as_millis() as i64 * i64::from(config.usable_permille) / 1000
        - config.reserve.as_millis() as i64)
        .max(0);

    let pool = usable + i64::from(moves_to_go - 1) * increment;
    let soft = (pool / i64::from(moves_to_go)).min(usable);
    let hard = (pool / i64::from(config.hard_divisor.max(1))).max(soft).min(usable);

    TimeBudget {
        soft: Duration::from_millis(soft as u64),
        hard: Duration::from_millis(hard as u64),
    }
}

/// Average duration of each iteration depth, carried from search to search
/// to predict whether the next iteration still fits the budget.
#[derive(Debug, Clone)]
pub struct IterationTimes {
    millis: Vec<u64>,
}

impl IterationTimes {
    pub fn new() -> Self {
        Self {
            millis: vec![0; MAX_DEPTH as usize + 2],
        }
    }

    fn index(depth: i32) -> usize {
        depth.clamp(0, MAX_DEPTH + 1) as usize
    }

    /// Fold a measured iteration into the running average for `depth`.
    pub fn record(&mut self, depth: i32, elapsed: Duration) {
        let slot = &mut self.millis[Self::index(depth)];
        let elapsed = elapsed.as_millis() as u64;
        *slot = if *slot == 0 { elapsed } else { (*slot + elapsed) / 2 };
    }

    /// Expected duration of an iteration at `depth`, falling back to twice
    /// the last iteration when the depth was never measured.
    pub fn predict(&self, depth: i32, last: Duration) -> Duration {
        match self.millis[Self::index(depth)] {
            0 => last * 2,
            millis => Duration::from_millis(millis),
        }
    }

    /// Adjust the table after stopping at `depth` for lack of time.
    ///
    /// Stopping on the very first iteration means deeper entries are out of
    /// date and get dropped. Otherwise each deeper entry moves toward
    /// twice the one before it.
    pub fn stopped_at(&mut self, depth: i32, initial_depth: i32) {
        let start = Self::index(depth + 1);
        if depth == initial_depth {
            self.millis[start..].fill(0);
            return;
        }
        for i in start.max(1)..self.millis.len() {
            self.millis[i] = (self.millis[i] + 2 * self.millis[i - 1]) / 2;
        }
    }

    pub fn clear(&mut self) {
        self.millis.fill(0);
    }
}

impl Default for IterationTimes {
    fn default() -> Self {
        Self::new()
    }
}
