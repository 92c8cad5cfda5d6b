//! Search and evaluation for kestrel.

pub mod error;
pub mod eval;
pub mod search;
pub mod time;

pub use error::SearchError;
pub use eval::{Evaluate, Evaluator, MaterialEvaluator};
pub use search::listener::{NoopListener, PvInfo, ScoreReport, SearchListener, SearchStatus};
pub use search::options::{SearchOptions, TimeConfig};
pub use search::{
    Bound, Clock, Engine, SearchHandle, SearchLimits, SearchMode, SearchResult,
};
