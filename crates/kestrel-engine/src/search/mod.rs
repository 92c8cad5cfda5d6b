//! Game-tree search: iterative deepening over a PVS alpha-beta recursion
//! with quiescence, shared hash/killer/history tables and time control.

pub mod control;
pub mod heuristics;
pub mod listener;
pub mod options;
pub mod ordering;
pub mod scheduler;
pub mod see;
pub mod tt;

mod driver;
mod negamax;
mod quiescence;
mod timer;
mod worker;

use std::fmt;
use std::time::Duration;

use kestrel_core::{Color, Move};

pub use driver::{Engine, SearchHandle};

/// Deepest recursion, in plies from the root.
pub const MAX_HEIGHT: usize = 256;

/// Deepest nominal iteration.
pub const MAX_DEPTH: i32 = 64;

/// Bound outside every reachable score.
pub const INFINITY: i32 = 200_000;

/// Score of a side that is mated on the board; a mate `n` plies away is
/// worth `CHECKMATE - n`.
pub const CHECKMATE: i32 = 100_000;

/// Scores beyond this magnitude are mate scores.
pub const CHECKMATE_THRESHOLD: i32 = CHECKMATE - 1000;

pub const DRAW: i32 = 0;

/// How a stored or reported value relates to the true score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Bound {
    /// The value is the score.
    Exact = 1,
    /// The search failed high; the score is at least the value.
    Lower = 2,
    /// The search failed low; the score is at most the value.
    Upper = 3,
}

impl Bound {
    pub(crate) const fn from_bits(bits: u64) -> Option<Bound> {
        match bits {
            1 => Some(Bound::Exact),
            2 => Some(Bound::Lower),
            3 => Some(Bound::Upper),
            _ => None,
        }
    }
}

/// Plies until mate for a mate score, negative when the side to move is
/// the one being mated.
pub fn mate_plies(value: i32) -> Option<i32> {
    if value.abs() > CHECKMATE_THRESHOLD {
        Some(value.signum() * (CHECKMATE - value.abs()))
    } else {
        None
    }
}

/// Remaining time on both clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Clock {
    /// Time left, indexed by [`Color::index`].
    pub remaining: [Duration; 2],
    /// Increment per move, indexed by [`Color::index`].
    pub increment: [Duration; 2],
    /// Moves until the next time control, if the control has one.
    pub moves_to_go: Option<u32>,
}

impl Clock {
    pub fn new(white: Duration, black: Duration) -> Clock {
        Clock {
            remaining: [white, black],
            ..Clock::default()
        }
    }

    pub fn with_increment(mut self, white: Duration, black: Duration) -> Clock {
        self.increment = [white, black];
        self
    }

    pub fn with_moves_to_go(mut self, moves: u32) -> Clock {
        self.moves_to_go = Some(moves);
        self
    }

    pub fn remaining(&self, color: Color) -> Duration {
        self.remaining[color.index()]
    }

    pub fn increment(&self, color: Color) -> Duration {
        self.increment[color.index()]
    }
}

/// The single time-control mode of one search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    /// Stop after completing this many iterations.
    Depth(i32),
    /// Stop once this many nodes were visited.
    Nodes(u64),
    /// Stop when this much wall time has passed.
    MoveTime(Duration),
    /// Budget time from the game clock.
    Clock(Clock),
    /// Search until told to stop. Enables analysis behavior.
    Infinite,
}

/// What to search and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLimits {
    pub mode: SearchMode,
    /// Search on the opponent's time until a ponder hit or stop.
    pub ponder: bool,
    /// Restrict the root to these moves. Empty means all legal moves.
    pub search_moves: Vec<Move>,
}

impl SearchLimits {
    pub fn new(mode: SearchMode) -> SearchLimits {
        SearchLimits {
            mode,
            ponder: false,
            search_moves: Vec::new(),
        }
    }

    pub fn depth(depth: i32) -> SearchLimits {
        SearchLimits::new(SearchMode::Depth(depth))
    }

    pub fn nodes(nodes: u64) -> SearchLimits {
        SearchLimits::new(SearchMode::Nodes(nodes))
    }

    pub fn movetime(time: Duration) -> SearchLimits {
        SearchLimits::new(SearchMode::MoveTime(time))
    }

    pub fn clock(clock: Clock) -> SearchLimits {
        SearchLimits::new(SearchMode::Clock(clock))
    }

    pub fn infinite() -> SearchLimits {
        SearchLimits::new(SearchMode::Infinite)
    }

    pub fn pondering(mut self) -> SearchLimits {
        self.ponder = true;
        self
    }

    pub fn with_search_moves(mut self, moves: Vec<Move>) -> SearchLimits {
        self.search_moves = moves;
        self
    }

    /// Highest iteration this search may start.
    pub fn max_depth(&self) -> i32 {
        match self.mode {
            SearchMode::Depth(depth) => depth.clamp(1, MAX_DEPTH),
            _ => MAX_DEPTH,
        }
    }

    pub(crate) fn node_limit(&self) -> Option<u64> {
        match self.mode {
            SearchMode::Nodes(nodes) => Some(nodes.max(1)),
            _ => None,
        }
    }

    /// Analysis searches keep every promotion and skip the hash-table
    /// head start.
    pub(crate) fn is_analysis(&self) -> bool {
        self.mode == SearchMode::Infinite
    }
}

/// Outcome of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// `None` only when the root has no legal move.
    pub best_move: Option<Move>,
    /// Expected reply, the second move of the principal variation.
    pub ponder_move: Option<Move>,
    pub pv: Vec<Move>,
    /// Centipawns from the side to move's view, or a mate score.
    pub score: i32,
    pub bound: Bound,
    /// Deepest completed iteration.
    pub depth: i32,
    pub nodes: u64,
    pub time: Duration,
    /// Number of root moves.
    pub move_count: usize,
}

impl SearchResult {
    /// Signed full moves to mate, positive when the side to move mates.
    pub fn mate_in(&self) -> Option<i32> {
        mate_plies(self.score).map(|plies| plies.signum() * (plies.abs() + 1) / 2)
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.best_move {
            Some(mv) => write!(f, "bestmove {mv}")?,
            None => f.write_str("bestmove (none)")?,
        }
        if let Some(ponder) = self.ponder_move {
            write!(f, " ponder {ponder}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_distance_from_scores() {
        assert_eq!(mate_plies(CHECKMATE - 1), Some(1));
        assert_eq!(mate_plies(-CHECKMATE + 4), Some(-4));
        assert_eq!(mate_plies(CHECKMATE_THRESHOLD), None);
        assert_eq!(mate_plies(DRAW), None);
    }

    #[test]
    fn depth_limit_is_clamped() {
        assert_eq!(SearchLimits::depth(0).max_depth(), 1);
        assert_eq!(SearchLimits::depth(500).max_depth(), MAX_DEPTH);
        assert_eq!(SearchLimits::infinite().max_depth(), MAX_DEPTH);
        assert_eq!(SearchLimits::nodes(0).node_limit(), Some(1));
    }

    #[test]
    fn mate_in_moves() {
        let result = SearchResult {
            best_move: None,
            ponder_move: None,
            pv: Vec::new(),
            score: CHECKMATE - 3,
            bound: Bound::Exact,
            depth: 3,
            nodes: 0,
            time: Duration::ZERO,
            move_count: 0,
        };
        assert_eq!(result.mate_in(), Some(2));
        let mated = SearchResult {
            score: -CHECKMATE + 2,
            ..result
        };
        assert_eq!(mated.mate_in(), Some(-1));
    }
}
