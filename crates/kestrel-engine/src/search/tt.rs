//! Lockless transposition table shared by every search thread.
//!
//! Each slot is two `AtomicU64` words. The second holds the packed entry, the
//! first holds `hash ^ data`, so a reader recovers the stored hash as
//! `word0 ^ word1`. A slot half-written by another thread decodes to a
//! different hash and reads as a miss.
//!
//! ## Data layout
//!
//! ```text
//! bits  0-25  move (raw)
//! bits 26-45  value + 2^19
//! bits 46-53  depth
//! bits 54-55  bound (0 = empty slot)
//! bit     56  mate threat
//! bits 57-63  age
//! ```

use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};

use kestrel_core::{Move, Position};

use crate::error::SearchError;
use crate::search::{Bound, CHECKMATE_THRESHOLD, MAX_HEIGHT};

const MOVE_BITS: u64 = (1 << 26) - 1;
const VALUE_SHIFT: u32 = 26;
const VALUE_MASK: u64 = (1 << 20) - 1;
const VALUE_OFFSET: i32 = 1 << 19;
const DEPTH_SHIFT: u32 = 46;
const BOUND_SHIFT: u32 = 54;
const THREAT_SHIFT: u32 = 56;
const AGE_SHIFT: u32 = 57;
const AGE_MASK: u8 = 0x7F;

const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn check() {
        assert_send_sync::<TranspositionTable>();
    }
    let _ = check;
};

/// A stored search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtEntry {
    pub depth: i32,
    pub bound: Bound,
    /// Best move found, [`Move::NONE`] when the node failed low or was cut
    /// by the null move.
    pub mv: Move,
    pub mate_threat: bool,
    pub age: u8,
    /// Mate scores are stored relative to the node, not the root.
    value: i32,
}

impl TtEntry {
    /// Stored value seen from a node `height` plies below the root.
    pub fn value(&self, height: usize) -> i32 {
        from_table(self.value, height)
    }

    fn pack(&self) -> u64 {
        (u64::from(self.mv.raw()) & MOVE_BITS)
            | (((self.value + VALUE_OFFSET) as u64 & VALUE_MASK) << VALUE_SHIFT)
            | ((self.depth.clamp(0, 255) as u64) << DEPTH_SHIFT)
            | ((self.bound as u64) << BOUND_SHIFT)
            | (u64::from(self.mate_threat) << THREAT_SHIFT)
            | (u64::from(self.age & AGE_MASK) << AGE_SHIFT)
    }

    fn unpack(data: u64) -> Option<TtEntry> {
        let bound = Bound::from_bits((data >> BOUND_SHIFT) & 0b11)?;
        Some(TtEntry {
            depth: ((data >> DEPTH_SHIFT) & 0xFF) as i32,
            bound,
            mv: Move::from_raw((data & MOVE_BITS) as u32),
            mate_threat: (data >> THREAT_SHIFT) & 1 == 1,
            age: (data >> AGE_SHIFT) as u8 & AGE_MASK,
            value: ((data >> VALUE_SHIFT) & VALUE_MASK) as i32 - VALUE_OFFSET,
        })
    }
}

/// Make a mate score relative to the node that stores it.
fn to_table(value: i32, height: usize) -> i32 {
    let height = height as i32;
    if value > CHECKMATE_THRESHOLD {
        value + height
    } else if value < -CHECKMATE_THRESHOLD {
        value - height
    } else {
        value
    }
}

fn from_table(value: i32, height: usize) -> i32 {
    let height = height as i32;
    if value > CHECKMATE_THRESHOLD {
        value - height
    } else if value < -CHECKMATE_THRESHOLD {
        value + height
    } else {
        value
    }
}

struct Slot {
    key: AtomicU64,
    data: AtomicU64,
}

impl Slot {
    fn new() -> Slot {
        Slot {
            key: AtomicU64::new(0),
            data: AtomicU64::new(0),
        }
    }

    fn load(&self) -> (u64, Option<TtEntry>) {
        let key = self.key.load(Ordering::Relaxed);
        let data = self.data.load(Ordering::Relaxed);
        (key ^ data, TtEntry::unpack(data))
    }

    fn store(&self, hash: u64, entry: &TtEntry) {
        let data = entry.pack();
        self.key.store(hash ^ data, Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
    }
}

/// Fixed-size table of search results indexed by `hash % len`.
///
/// Entries written during an earlier search (a different age) are treated
/// as empty: they neither answer probes nor block new stores.
pub struct TranspositionTable {
    slots: Box<[Slot]>,
    age: AtomicU8,
    used: AtomicUsize,
}

impl TranspositionTable {
    /// Table occupying roughly `mib` mebibytes. Zero is rejected.
    pub fn new(mib: usize) -> Result<TranspositionTable, SearchError> {
        if mib == 0 {
            return Err(SearchError::ZeroHashSize);
        }
        let len = (mib * 1024 * 1024 / std::mem::size_of::<Slot>()).max(1);
        Ok(TranspositionTable::with_slots(len))
    }

    pub(crate) fn with_slots(len: usize) -> TranspositionTable {
        TranspositionTable {
            slots: (0..len.max(1)).map(|_| Slot::new()).collect(),
            age: AtomicU8::new(0),
            used: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.load(Ordering::Relaxed) == 0
    }

    fn slot(&self, hash: u64) -> &Slot {
        &self.slots[(hash % self.slots.len() as u64) as usize]
    }

    fn current_age(&self) -> u8 {
        self.age.load(Ordering::Relaxed)
    }

    /// Store a result for the position with `hash`, searched `height` plies
    /// below the root.
    ///
    /// An empty or stale slot is claimed outright. A slot holding the same
    /// position is only updated by a search at least as deep, which keeps
    /// the stored move if the new result has none. A slot holding another
    /// position of the current age is overwritten.
    #[allow(clippy::too_many_arguments)]
    pub fn put(
        &self,
        hash: u64,
        depth: i32,
        value: i32,
        bound: Bound,
        mv: Move,
        mate_threat: bool,
        height: usize,
    ) {
        let age = self.current_age();
        let slot = self.slot(hash);
        let mut entry = TtEntry {
            depth,
            bound,
            mv,
            mate_threat,
            age,
            value: to_table(value, height),
        };

        match slot.load() {
            (_, None) => {
                self.used.fetch_add(1, Ordering::Relaxed);
            }
            (_, Some(old)) if old.age != age => {
                self.used.fetch_add(1, Ordering::Relaxed);
            }
            (stored, Some(old)) if stored == hash => {
                if depth < old.depth {
                    return;
                }
                if mv.is_none() {
                    entry.mv = old.mv;
                }
            }
            _ => {}
        }
        slot.store(hash, &entry);
    }

    /// Entry for `hash` written during the current search, if any.
    pub fn get(&self, hash: u64) -> Option<TtEntry> {
        let (stored, entry) = self.slot(hash).load();
        entry.filter(|entry| stored == hash && entry.age == self.current_age())
    }

    /// Start a new search: everything stored so far becomes stale.
    pub fn increase_age(&self) {
        let next = self.current_age().wrapping_add(1) & AGE_MASK;
        self.age.store(next, Ordering::Relaxed);
        self.used.store(0, Ordering::Relaxed);
    }

    /// Slots claimed during the current search, in thousandths.
    pub fn permill(&self) -> u32 {
        let used = self.used.load(Ordering::Relaxed) as u64;
        ((used * 1000) / self.slots.len() as u64).min(1000) as u32
    }

    pub fn clear(&self) {
        for slot in self.slots.iter() {
            slot.key.store(0, Ordering::Relaxed);
            slot.data.store(0, Ordering::Relaxed);
        }
        self.used.store(0, Ordering::Relaxed);
    }

    /// Follow stored best moves from `pos`, at most `depth` of them.
    ///
    /// Every move is checked against the position it is played in, and the
    /// walk ends at the first repeated position.
    pub fn principal_line(&self, pos: &Position, depth: i32) -> Vec<Move> {
        let mut board = pos.clone();
        let mut line = Vec::new();
        let limit = depth.clamp(0, MAX_HEIGHT as i32) as usize;
        while line.len() < limit {
            let Some(entry) = self.get(board.hash()) else {
                break;
            };
            let mv = entry.mv;
            if !board.is_pseudo_legal(mv) || !board.is_legal(mv) {
                break;
            }
            line.push(mv);
            board.make_move(mv);
            if board.is_repetition() {
                break;
            }
        }
        line
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("slots", &self.slots.len())
            .field("age", &self.current_age())
            .field("used", &self.used.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use kestrel_core::Position;

    use super::*;
    use crate::search::CHECKMATE;

    fn moves(pos: &Position, list: &[&str]) -> Vec<Move> {
        list.iter().map(|text| pos.parse_move(text).unwrap()).collect()
    }

    #[test]
    fn slot_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<Slot>(), 16);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(TranspositionTable::new(0).is_err());
        assert!(TranspositionTable::new(1).is_ok());
    }

    #[test]
    fn get_on_empty_table_misses() {
        let tt = TranspositionTable::with_slots(64);
        assert_eq!(tt.get(12345), None);
        assert_eq!(tt.permill(), 0);
    }

    #[test]
    fn put_then_get_returns_fields() {
        let pos = Position::starting_position();
        let e4 = pos.parse_move("e2e4").unwrap();
        let tt = TranspositionTable::with_slots(64);
        tt.put(pos.hash(), 5, -37, Bound::Upper, e4, true, 3);

        let entry = tt.get(pos.hash()).unwrap();
        assert_eq!(entry.depth, 5);
        assert_eq!(entry.value(3), -37);
        assert_eq!(entry.bound, Bound::Upper);
        assert_eq!(entry.mv, e4);
        assert!(entry.mate_threat);
        assert_eq!(tt.permill(), 1000 / 64);
    }

    #[test]
    fn shallower_result_does_not_replace_same_position() {
        let tt = TranspositionTable::with_slots(16);
        let pos = Position::starting_position();
        let list = moves(&pos, &["e2e4", "d2d4"]);
        let (e4, d4) = (list[0], list[1]);
        tt.put(7, 6, 10, Bound::Exact, e4, false, 0);
        tt.put(7, 4, 20, Bound::Lower, d4, false, 0);
        assert_eq!(tt.get(7).unwrap().mv, e4);

        tt.put(7, 6, 30, Bound::Lower, Move::NONE, false, 0);
        let entry = tt.get(7).unwrap();
        assert_eq!(entry.value(0), 30);
        assert_eq!(entry.mv, e4, "a move-less update keeps the stored move");
    }

    #[test]
    fn other_position_overwrites_slot() {
        let tt = TranspositionTable::with_slots(16);
        tt.put(3, 9, 10, Bound::Exact, Move::NONE, false, 0);
        tt.put(3 + 16, 1, 20, Bound::Exact, Move::NONE, false, 0);
        assert_eq!(tt.get(3), None);
        assert_eq!(tt.get(3 + 16).unwrap().depth, 1);
    }

    #[test]
    fn new_age_hides_old_entries_and_resets_usage() {
        let tt = TranspositionTable::with_slots(16);
        tt.put(5, 3, 0, Bound::Exact, Move::NONE, false, 0);
        tt.increase_age();
        assert_eq!(tt.get(5), None);
        assert_eq!(tt.permill(), 0);

        tt.put(5, 1, 42, Bound::Lower, Move::NONE, false, 0);
        let entry = tt.get(5).unwrap();
        assert_eq!(entry.depth, 1);
        assert_eq!(entry.value(0), 42);
        assert_eq!(tt.permill(), 1000 / 16);
    }

    #[test]
    fn mate_scores_are_relative_to_the_storing_node() {
        let tt = TranspositionTable::with_slots(16);
        // mated five plies below the root, stored at height 5
        tt.put(1, 0, -CHECKMATE + 5, Bound::Exact, Move::NONE, false, 5);
        let entry = tt.get(1).unwrap();
        assert_eq!(entry.value(5), -CHECKMATE + 5);
        assert_eq!(entry.value(2), -CHECKMATE + 2);

        tt.put(2, 0, CHECKMATE - 7, Bound::Lower, Move::NONE, false, 4);
        assert_eq!(tt.get(2).unwrap().value(6), CHECKMATE - 9);
    }

    #[test]
    fn principal_line_follows_stored_moves() {
        let tt = TranspositionTable::with_slots(1024);
        let mut pos = Position::starting_position();
        let line = moves(&pos, &["e2e4"]);
        tt.put(pos.hash(), 2, 0, Bound::Exact, line[0], false, 0);
        pos.make_move(line[0]);
        let reply = pos.parse_move("e7e5").unwrap();
        tt.put(pos.hash(), 1, 0, Bound::Exact, reply, false, 1);

        let root = Position::starting_position();
        assert_eq!(tt.principal_line(&root, 8), vec![line[0], reply]);
        assert_eq!(tt.principal_line(&root, 1), vec![line[0]]);
    }
}
