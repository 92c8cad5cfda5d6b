//! Search configuration: feature toggles, tunables and time-budget constants.

use std::time::Duration;

use crate::eval::DEFAULT_PAWN_CACHE_SIZE;
use crate::search::CHECKMATE;

/// Constants of the clock-based time budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeConfig {
    /// Moves assumed left when the clock gives none, and the cap on a given count.
    pub moves_to_go: u32,
    /// Thousandths of the remaining time considered usable.
    pub usable_permille: u32,
    /// Kept back from the usable time for transmission overhead.
    pub reserve: Duration,
    /// The hard limit is the usable time per move times the moves left,
    /// divided by this.
    pub hard_divisor: u32,
    /// Soft limit without a clock; the hard limit is half again as long.
    pub fallback: Duration,
    /// Score swing between iterations, in centipawns, that grants extra time.
    pub extension_margin: i32,
    /// Consecutive iterations agreeing on a recapture before it is played
    /// without further thought.
    pub easy_recapture_iterations: u32,
    /// Smallest captured value counting as an easy recapture.
    pub easy_recapture_value: i32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        TimeConfig {
            moves_to_go: 40,
            usable_permille: 950,
            reserve: Duration::from_millis(1000),
            hard_divisor: 8,
            fallback: Duration::from_millis(2000),
            extension_margin: 30,
            easy_recapture_iterations: 4,
            easy_recapture_value: 325,
        }
    }
}

/// Everything a search can be configured with.
///
/// Every pruning, reduction and extension technique can be switched off on
/// its own; the margins and depths behind them are tunable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Transposition table size in MiB. Must not be zero.
    pub hash_mib: usize,
    /// Pawn structure cache slots per search thread.
    pub pawn_cache_slots: usize,
    /// Search threads. More than one splits the move loops of deep nodes.
    pub threads: usize,
    /// Shallowest remaining depth at which a node's moves are searched in
    /// parallel.
    pub split_depth: i32,

    pub transposition_table: bool,
    pub killer_moves: bool,
    pub history: bool,
    pub aspiration_windows: bool,
    pub mate_distance_pruning: bool,
    pub null_move_pruning: bool,
    /// Re-search null-move cutoffs at reduced depth before trusting them.
    pub verified_null_move: bool,
    pub internal_iterative_deepening: bool,
    pub futility_pruning: bool,
    pub extended_futility_pruning: bool,
    pub delta_pruning: bool,
    pub late_move_reduction: bool,
    /// Repeat a reduced search at full depth when it fails high.
    pub late_move_reduction_research: bool,
    /// Skip promotions to anything but a queen. Never applied in analysis.
    pub minor_promotion_pruning: bool,

    pub recapture_extension: bool,
    pub check_extension: bool,
    pub pawn_extension: bool,
    pub single_reply_extension: bool,
    pub mate_threat_extension: bool,

    /// Shallowest depth for a null-move search.
    pub null_move_depth: i32,
    pub null_move_reduction: i32,
    pub null_move_verification_reduction: i32,
    /// Shallowest depth for internal iterative deepening.
    pub iid_depth: i32,
    /// Shallowest depth for late move reductions.
    pub lmr_depth: i32,
    /// Moves searched at full depth before reductions start.
    pub lmr_move_number: usize,
    /// Futility margin one ply from the horizon.
    pub futility_margin: i32,
    /// Futility margin two plies from the horizon.
    pub extended_futility_margin: i32,
    pub delta_margin: i32,
    /// Check evasions allowed along one quiescence line before an in-check
    /// node is scored statically.
    pub quiescence_check_limit: i32,
    pub aspiration_window: i32,
    /// Successive widenings, on both sides, after an aspiration failure.
    pub aspiration_widening: Vec<i32>,

    pub time: TimeConfig,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            hash_mib: 16,
            pawn_cache_slots: DEFAULT_PAWN_CACHE_SIZE,
            threads: 1,
            split_depth: 4,

            transposition_table: true,
            killer_moves: true,
            history: true,
            aspiration_windows: true,
            mate_distance_pruning: true,
            null_move_pruning: true,
            verified_null_move: true,
            internal_iterative_deepening: true,
            futility_pruning: true,
            extended_futility_pruning: true,
            delta_pruning: true,
            late_move_reduction: true,
            late_move_reduction_research: true,
            minor_promotion_pruning: true,

            recapture_extension: true,
            check_extension: true,
            pawn_extension: true,
            single_reply_extension: true,
            mate_threat_extension: true,

            null_move_depth: 2,
            null_move_reduction: 3,
            null_move_verification_reduction: 3,
            iid_depth: 2,
            lmr_depth: 3,
            lmr_move_number: 3,
            futility_margin: 200,
            extended_futility_margin: 500,
            delta_margin: 100,
            quiescence_check_limit: 8,
            aspiration_window: 20,
            aspiration_widening: vec![20, 20, 40, 80, 160, 320, CHECKMATE],

            time: TimeConfig::default(),
        }
    }
}

impl SearchOptions {
    /// Plain alpha-beta: every selective technique and the hash table off.
    /// The result of such a search depends only on the position and depth.
    pub fn exhaustive() -> SearchOptions {
        SearchOptions {
            transposition_table: false,
            aspiration_windows: false,
            null_move_pruning: false,
            verified_null_move: false,
            internal_iterative_deepening: false,
            futility_pruning: false,
            extended_futility_pruning: false,
            delta_pruning: false,
            late_move_reduction: false,
            late_move_reduction_research: false,
            ..SearchOptions::default()
        }
    }

    /// Null-move depth reduction; verification allows a deeper cut.
    pub(crate) fn null_move_cut(&self) -> i32 {
        if self.verified_null_move {
            self.null_move_reduction
        } else {
            self.null_move_reduction - 1
        }
    }

    pub fn with_threads(mut self, threads: usize) -> SearchOptions {
        self.threads = threads.max(1);
        self
    }

    pub fn with_hash(mut self, mib: usize) -> SearchOptions {
        self.hash_mib = mib;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_everything() {
        let options = SearchOptions::default();
        assert!(options.null_move_pruning && options.late_move_reduction);
        assert_eq!(options.null_move_cut(), 3);
        assert_eq!(options.aspiration_widening.last(), Some(&CHECKMATE));
    }

    #[test]
    fn unverified_null_move_reduces_less() {
        let options = SearchOptions {
            verified_null_move: false,
            ..SearchOptions::default()
        };
        assert_eq!(options.null_move_cut(), 2);
    }

    #[test]
    fn exhaustive_disables_selectivity() {
        let options = SearchOptions::exhaustive().with_threads(0);
        assert_eq!(options.threads, 1);
        assert!(!options.transposition_table);
        assert!(!options.futility_pruning && !options.delta_pruning);
        assert!(options.check_extension, "extensions are not selective pruning");
    }
}
