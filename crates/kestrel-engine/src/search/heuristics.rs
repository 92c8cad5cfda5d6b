//! Killer moves and the history heuristic for quiet move ordering.
//!
//! Both tables are shared between search threads, so every slot is an
//! atomic. Lost updates under contention only cost ordering quality.

use std::sync::atomic::{AtomicU32, Ordering};

use kestrel_core::{Move, Piece, Square};

use crate::search::MAX_HEIGHT;

/// Two quiet moves per height that recently caused a beta cutoff.
pub struct KillerTable {
    slots: Box<[[AtomicU32; 2]]>,
}

impl KillerTable {
    pub fn new() -> Self {
        Self {
            slots: (0..=MAX_HEIGHT)
                .map(|_| [AtomicU32::new(0), AtomicU32::new(0)])
                .collect(),
        }
    }

    /// Make `mv` the primary killer at `height`, demoting the old primary.
    /// Re-adding the current primary changes nothing.
    pub fn add(&self, height: usize, mv: Move) {
        let Some([primary, secondary]) = self.slots.get(height) else {
            return;
        };
        let old = primary.load(Ordering::Relaxed);
        if old == mv.raw() {
            return;
        }
        secondary.store(old, Ordering::Relaxed);
        primary.store(mv.raw(), Ordering::Relaxed);
    }

    pub fn primary(&self, height: usize) -> Move {
        self.load(height, 0)
    }

    pub fn secondary(&self, height: usize) -> Move {
        self.load(height, 1)
    }

    fn load(&self, height: usize, index: usize) -> Move {
        self.slots
            .get(height)
            .map_or(Move::NONE, |pair| Move::from_raw(pair[index].load(Ordering::Relaxed)))
    }

    pub fn clear(&self) {
        for pair in self.slots.iter() {
            pair[0].store(0, Ordering::Relaxed);
            pair[1].store(0, Ordering::Relaxed);
        }
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Once an entry reaches this, every entry is halved.
pub const HISTORY_MAX: u32 = 1 << 16;

/// Cutoff counts indexed by `[moved piece][target square]`.
pub struct HistoryTable {
    table: Box<[[AtomicU32; Square::COUNT]; Piece::COUNT]>,
}

impl HistoryTable {
    pub fn new() -> Self {
        Self {
            table: Box::new(std::array::from_fn(|_| std::array::from_fn(|_| AtomicU32::new(0)))),
        }
    }

    /// Credit a quiet move that caused a cutoff `depth` plies from the horizon.
    pub fn add(&self, mv: Move, depth: i32) {
        let bonus = depth.max(0) as u32;
        let entry = &self.table[mv.moved().index()][mv.to().index()];
        let value = entry.fetch_add(bonus, Ordering::Relaxed) + bonus;
        if value >= HISTORY_MAX {
            self.halve();
        }
    }

    pub fn get(&self, mv: Move) -> i32 {
        self.table[mv.moved().index()][mv.to().index()].load(Ordering::Relaxed) as i32
    }

    fn halve(&self) {
        for entry in self.table.iter().flatten() {
            let value = entry.load(Ordering::Relaxed);
            entry.store(value / 2, Ordering::Relaxed);
        }
    }

    pub fn clear(&self) {
        for entry in self.table.iter().flatten() {
            entry.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use kestrel_core::{Move, Position};

    use super::*;

    fn quiet_moves() -> (Move, Move, Move) {
        let pos = Position::starting_position();
        (
            pos.parse_move("e2e4").unwrap(),
            pos.parse_move("d2d4").unwrap(),
            pos.parse_move("g1f3").unwrap(),
        )
    }

    // ── Killers ──

    #[test]
    fn repeated_killer_does_not_shift() {
        let killers = KillerTable::new();
        let (a, _, _) = quiet_moves();
        killers.add(4, a);
        killers.add(4, a);
        assert_eq!(killers.primary(4), a);
        assert_eq!(killers.secondary(4), Move::NONE);
    }

    #[test]
    fn new_killer_demotes_primary() {
        let killers = KillerTable::new();
        let (a, b, c) = quiet_moves();
        killers.add(2, a);
        killers.add(2, b);
        assert_eq!((killers.primary(2), killers.secondary(2)), (b, a));
        killers.add(2, c);
        assert_eq!((killers.primary(2), killers.secondary(2)), (c, b));
        assert_eq!(killers.primary(3), Move::NONE);
    }

    #[test]
    fn clear_empties_killers() {
        let killers = KillerTable::new();
        let (a, _, _) = quiet_moves();
        killers.add(MAX_HEIGHT, a);
        killers.clear();
        assert_eq!(killers.primary(MAX_HEIGHT), Move::NONE);
        assert_eq!(killers.primary(MAX_HEIGHT + 1), Move::NONE);
    }

    // ── History ──

    #[test]
    fn history_accumulates_depth() {
        let history = HistoryTable::new();
        let (a, b, _) = quiet_moves();
        history.add(a, 3);
        history.add(a, 5);
        assert_eq!(history.get(a), 8);
        assert_eq!(history.get(b), 0);
    }

    #[test]
    fn overflow_halves_every_entry() {
        let history = HistoryTable::new();
        let (a, b, _) = quiet_moves();
        history.add(b, 10);
        history.add(a, HISTORY_MAX as i32 - 1);
        assert_eq!(history.get(a), HISTORY_MAX as i32 - 1);
        history.add(a, 1);
        assert_eq!(history.get(a), HISTORY_MAX as i32 / 2);
        assert_eq!(history.get(b), 5);
    }
}
