//! How a node's remaining moves are distributed over threads.
//!
//! The recursion asks the scheduler whether to split at a node; when it
//! does, the first move has already been searched on the calling thread
//! (young brothers wait) and the rest become independent tasks. Results
//! come back in move order, so merging them reproduces the bookkeeping of
//! a sequential move loop.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use kestrel_core::Move;

use crate::error::SearchError;

/// Stack size of search threads; the recursion runs up to the maximum height.
pub const SEARCH_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Outcome of searching one move of a split node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildResult {
    pub mv: Move,
    pub value: i32,
    /// Skipped by futility pruning: `value` is an estimate and nothing was
    /// searched.
    pub pruned: bool,
    /// Principal variation below `mv`.
    pub line: Vec<Move>,
}

/// A task evaluating move `i` of a split node. `None` means the task was
/// skipped because the node already failed high or the search aborted.
pub type ChildTask<'a> = dyn Fn(usize) -> Option<ChildResult> + Sync + 'a;

pub trait Scheduler: Send + Sync {
    /// Whether a node `depth` plies from the horizon should split.
    fn splits_at(&self, depth: i32) -> bool;

    /// Run `count` tasks and return their results indexed like the tasks.
    fn run(&self, count: usize, task: &ChildTask<'_>) -> Vec<Option<ChildResult>>;
}

/// Everything on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Scheduler for Sequential {
    fn splits_at(&self, _depth: i32) -> bool {
        false
    }

    fn run(&self, count: usize, task: &ChildTask<'_>) -> Vec<Option<ChildResult>> {
        (0..count).map(task).collect()
    }
}

/// Splits deep nodes over a rayon thread pool.
pub struct TaskParallel {
    pool: ThreadPool,
    split_depth: i32,
}

impl TaskParallel {
    pub fn new(threads: usize, split_depth: i32) -> Result<TaskParallel, SearchError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .stack_size(SEARCH_STACK_SIZE)
            .thread_name(|index| format!("kestrel-search-{index}"))
            .build()?;
        debug!(threads, split_depth, "search thread pool started");
        Ok(TaskParallel { pool, split_depth })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Scheduler for TaskParallel {
    fn splits_at(&self, depth: i32) -> bool {
        depth >= self.split_depth
    }

    fn run(&self, count: usize, task: &ChildTask<'_>) -> Vec<Option<ChildResult>> {
        self.pool
            .install(|| (0..count).into_par_iter().map(task).collect())
    }
}

impl std::fmt::Debug for TaskParallel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskParallel")
            .field("threads", &self.threads())
            .field("split_depth", &self.split_depth)
            .finish()
    }
}
