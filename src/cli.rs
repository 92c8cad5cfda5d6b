use clap::{Args, Parser, Subcommand};
use kestrel_core::STARTING_FEN;

#[derive(Parser)]
#[command(author, version, about = "Chess search engine")]
pub struct Cli {
    /// Most verbose log level written to stderr
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search a position and print the best move
    Search(SearchArgs),
    /// Count leaf nodes of the legal move tree, per root move
    Perft(PerftArgs),
}

#[derive(Args)]
pub struct SearchArgs {
    #[arg(long, default_value = STARTING_FEN)]
    pub fen: String,
    /// Moves to play from the position before searching, in coordinate notation
    #[arg(long, num_args = 1.., value_name = "MOVE")]
    pub moves: Vec<String>,

    /// Stop after this many iterations
    #[arg(long, conflicts_with_all = ["nodes", "movetime", "infinite"])]
    pub depth: Option<i32>,
    /// Stop after visiting this many nodes
    #[arg(long, conflicts_with_all = ["movetime", "infinite"])]
    pub nodes: Option<u64>,
    /// Search for exactly this long
    #[arg(long, value_name = "MS", conflicts_with = "infinite")]
    pub movetime: Option<u64>,
    /// Search until Enter is pressed
    #[arg(long)]
    pub infinite: bool,

    /// White's remaining clock time
    #[arg(long, value_name = "MS")]
    pub wtime: Option<u64>,
    /// Black's remaining clock time
    #[arg(long, value_name = "MS")]
    pub btime: Option<u64>,
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub winc: u64,
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub binc: u64,
    #[arg(long)]
    pub movestogo: Option<u32>,

    /// Only consider these root moves
    #[arg(long, num_args = 1.., value_name = "MOVE")]
    pub searchmoves: Vec<String>,

    #[arg(long, default_value_t = 1)]
    pub threads: usize,
    /// Transposition table size
    #[arg(long, value_name = "MIB", default_value_t = 16)]
    pub hash: usize,
}

#[derive(Args)]
pub struct PerftArgs {
    #[arg(long)]
    pub depth: usize,
    #[arg(long, default_value = STARTING_FEN)]
    pub fen: String,
    #[arg(long, num_args = 1.., value_name = "MOVE")]
    pub moves: Vec<String>,
}
