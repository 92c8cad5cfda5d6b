//! Progress reporting out of a running search.
//!
//! The search calls a [`SearchListener`] from whichever thread reaches the
//! event. Every method has an empty default, so listeners only implement
//! what they display.

use std::fmt;
use std::time::Duration;

use kestrel_core::Move;

use crate::search::{Bound, mate_plies};

/// A score as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreReport {
    Centipawns(i32),
    /// Full moves to mate, negative when the side to move gets mated.
    Mate(i32),
}

impl ScoreReport {
    pub fn from_value(value: i32) -> ScoreReport {
        match mate_plies(value) {
            Some(plies) => ScoreReport::Mate(plies.signum() * (plies.abs() + 1) / 2),
            None => ScoreReport::Centipawns(value),
        }
    }
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreReport::Centipawns(cp) => write!(f, "cp {cp}"),
            ScoreReport::Mate(moves) => write!(f, "mate {moves}"),
        }
    }
}

/// A new or refined principal variation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvInfo {
    pub depth: i32,
    pub seldepth: usize,
    pub value: i32,
    pub score: ScoreReport,
    pub bound: Bound,
    pub nodes: u64,
    pub nps: u64,
    /// Transposition table fill, in thousandths.
    pub hashfull: u32,
    pub time: Duration,
    pub pv: Vec<Move>,
}

impl fmt::Display for PvInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "depth {} seldepth {} score {}", self.depth, self.seldepth, self.score)?;
        match self.bound {
            Bound::Lower => f.write_str(" lowerbound")?,
            Bound::Upper => f.write_str(" upperbound")?,
            Bound::Exact => {}
        }
        write!(
            f,
            " nodes {} nps {} hashfull {} time {}",
            self.nodes,
            self.nps,
            self.hashfull,
            self.time.as_millis()
        )?;
        if !self.pv.is_empty() {
            f.write_str(" pv")?;
            for mv in &self.pv {
                write!(f, " {mv}")?;
            }
        }
        Ok(())
    }
}

/// Periodic node and speed counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchStatus {
    pub depth: i32,
    pub seldepth: usize,
    pub nodes: u64,
    pub nps: u64,
    pub hashfull: u32,
    pub time: Duration,
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "depth {} seldepth {} nodes {} nps {} hashfull {} time {}",
            self.depth,
            self.seldepth,
            self.nodes,
            self.nps,
            self.hashfull,
            self.time.as_millis()
        )
    }
}

pub trait SearchListener: Send + Sync {
    /// An iteration to `depth` begins.
    fn depth_started(&self, _depth: i32) {}

    /// The root starts searching its `number`th move (1-based).
    fn current_move(&self, _mv: Move, _number: usize) {}

    fn pv_updated(&self, _info: &PvInfo) {}

    /// Emitted at most about once per second.
    fn status(&self, _status: &SearchStatus) {}

    /// The search finished.
    fn best_move(&self, _best: Option<Move>, _ponder: Option<Move>) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl SearchListener for NoopListener {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::CHECKMATE;

    #[test]
    fn mate_scores_report_full_moves() {
        assert_eq!(ScoreReport::from_value(CHECKMATE - 1), ScoreReport::Mate(1));
        assert_eq!(ScoreReport::from_value(CHECKMATE - 4), ScoreReport::Mate(2));
        assert_eq!(ScoreReport::from_value(-CHECKMATE + 2), ScoreReport::Mate(-1));
        assert_eq!(ScoreReport::from_value(-37), ScoreReport::Centipawns(-37));
    }

    #[test]
    fn pv_line_formatting() {
        let info = PvInfo {
            depth: 3,
            seldepth: 7,
            value: 25,
            score: ScoreReport::from_value(25),
            bound: Bound::Lower,
            nodes: 1200,
            nps: 60_000,
            hashfull: 4,
            time: Duration::from_millis(20),
            pv: Vec::new(),
        };
        assert_eq!(
            info.to_string(),
            "depth 3 seldepth 7 score cp 25 lowerbound nodes 1200 nps 60000 hashfull 4 time 20"
        );
    }
}
