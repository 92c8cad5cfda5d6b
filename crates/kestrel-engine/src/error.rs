//! Errors raised when setting up or starting a search.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("transposition table size must be at least 1 MiB")]
    ZeroHashSize,

    /// A move restricting the root search is not legal in the root position.
    #[error("search move {mv} is not legal in this position")]
    IllegalSearchMove { mv: String },

    #[error("could not start search threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("could not spawn search thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("search thread panicked")]
    Panicked,
}
