//! Per-thread search state.

use std::sync::{Mutex, PoisonError};

use kestrel_core::Move;

use crate::eval::Evaluate;
use crate::search::MAX_HEIGHT;
use crate::search::ordering::MovePicker;

/// Principal variation of every node on the current path, indexed by height.
pub(crate) struct PvTable {
    lines: Vec<Vec<Move>>,
}

impl PvTable {
    fn new() -> PvTable {
        PvTable {
            lines: (0..=MAX_HEIGHT + 1).map(|_| Vec::with_capacity(16)).collect(),
        }
    }

    pub(crate) fn clear(&mut self, height: usize) {
        if let Some(line) = self.lines.get_mut(height) {
            line.clear();
        }
    }

    /// `mv` followed by the line of the child below `height`.
    pub(crate) fn update(&mut self, height: usize, mv: Move) {
        if height + 1 >= self.lines.len() {
            return;
        }
        let (head, tail) = self.lines.split_at_mut(height + 1);
        let line = &mut head[height];
        line.clear();
        line.push(mv);
        line.extend_from_slice(&tail[0]);
    }

    /// `mv` followed by a child line computed elsewhere.
    pub(crate) fn set(&mut self, height: usize, mv: Move, child: &[Move]) {
        if let Some(line) = self.lines.get_mut(height) {
            line.clear();
            line.push(mv);
            line.extend_from_slice(child);
        }
    }

    pub(crate) fn line(&self, height: usize) -> &[Move] {
        self.lines.get(height).map(Vec::as_slice).unwrap_or_default()
    }
}

/// What one thread needs to search: its own evaluator (with caches), PV
/// table and one move picker per height.
pub(crate) struct Worker<E> {
    pub(crate) evaluator: E,
    pub(crate) pv: PvTable,
    pub(crate) pickers: Vec<MovePicker>,
}

impl<E: Evaluate> Worker<E> {
    pub(crate) fn new(evaluator: E) -> Worker<E> {
        Worker {
            evaluator,
            pv: PvTable::new(),
            pickers: (0..=MAX_HEIGHT).map(|_| MovePicker::new()).collect(),
        }
    }
}

/// Idle workers kept for reuse across searches and split points.
pub(crate) struct WorkerPool<E> {
    prototype: E,
    idle: Mutex<Vec<Worker<E>>>,
}

impl<E: Evaluate> WorkerPool<E> {
    pub(crate) fn new(prototype: E) -> WorkerPool<E> {
        WorkerPool {
            prototype,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn acquire(&self) -> Worker<E> {
        let idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop();
        idle.unwrap_or_else(|| Worker::new(self.prototype.clone()))
    }

    pub(crate) fn release(&self, worker: Worker<E>) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(worker);
    }

    /// Drop every idle worker, and with it any evaluation cache.
    pub(crate) fn clear(&self) {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
