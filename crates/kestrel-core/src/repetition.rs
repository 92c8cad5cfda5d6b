//! Hashes of the positions along the current line.

/// Stack of position hashes, one per move made.
///
/// `remove` drops the most recent matching hash so the table mirrors the
/// make/undo stack exactly.
#[derive(Debug, Clone, Default)]
pub struct RepetitionTable {
    hashes: Vec<u64>,
}

impl RepetitionTable {
    pub fn new() -> Self {
        Self { hashes: Vec::with_capacity(256) }
    }

    #[inline]
    pub fn put(&mut self, hash: u64) {
        self.hashes.push(hash);
    }

    /// Remove the most recently added occurrence of `hash`.
    pub fn remove(&mut self, hash: u64) {
        if let Some(i) = self.hashes.iter().rposition(|&h| h == hash) {
            self.hashes.remove(i);
        } else {
            debug_assert!(false, "removing a hash that was never added");
        }
    }

    /// Whether `hash` occurred earlier in the line.
    pub fn exists(&self, hash: u64) -> bool {
        self.hashes.iter().rev().any(|&h| h == hash)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
    }
}
