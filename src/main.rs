mod cli;

use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use kestrel_core::{Position, divide};
use kestrel_engine::{
    Clock, Engine, PvInfo, SearchLimits, SearchListener, SearchMode, SearchOptions, SearchStatus,
};
use tracing::info;

use crate::cli::{Cli, Command, PerftArgs, SearchArgs};

/// Iterations searched when no limit is given.
const DEFAULT_DEPTH: i32 = 8;

/// Prints search progress to stdout.
struct Printer;

impl SearchListener for Printer {
    fn pv_updated(&self, info: &PvInfo) {
        println!("info {info}");
    }

    fn status(&self, status: &SearchStatus) {
        println!("info {status}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Search(args) => run_search(args),
        Command::Perft(args) => run_perft(args),
    }
}

fn setup_position(fen: &str, moves: &[String]) -> Result<Position> {
    let mut pos: Position = fen.parse().with_context(|| format!("invalid FEN '{fen}'"))?;
    for text in moves {
        let mv = pos
            .parse_move(text)
            .with_context(|| format!("cannot play '{text}'"))?;
        pos.make_move(mv);
    }
    Ok(pos)
}

fn search_mode(args: &SearchArgs) -> SearchMode {
    if let Some(depth) = args.depth {
        SearchMode::Depth(depth)
    } else if let Some(nodes) = args.nodes {
        SearchMode::Nodes(nodes)
    } else if let Some(ms) = args.movetime {
        SearchMode::MoveTime(Duration::from_millis(ms))
    } else if args.infinite {
        SearchMode::Infinite
    } else if args.wtime.is_some() || args.btime.is_some() {
        let ms = |value: Option<u64>| Duration::from_millis(value.unwrap_or(0));
        let mut clock = Clock::new(ms(args.wtime), ms(args.btime))
            .with_increment(Duration::from_millis(args.winc), Duration::from_millis(args.binc));
        if let Some(moves) = args.movestogo {
            clock = clock.with_moves_to_go(moves);
        }
        SearchMode::Clock(clock)
    } else {
        SearchMode::Depth(DEFAULT_DEPTH)
    }
}

fn run_search(args: SearchArgs) -> Result<()> {
    if args.threads == 0 {
        bail!("--threads must be at least 1");
    }
    let pos = setup_position(&args.fen, &args.moves)?;
    let search_moves = args
        .searchmoves
        .iter()
        .map(|text| {
            pos.parse_move(text)
                .with_context(|| format!("invalid search move '{text}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    let limits = SearchLimits::new(search_mode(&args)).with_search_moves(search_moves);

    let options = SearchOptions::default()
        .with_threads(args.threads)
        .with_hash(args.hash);
    let engine = Engine::new(options).context("cannot create engine")?;
    info!(fen = %pos.to_fen(), mode = ?limits.mode, "searching");

    let result = if limits.mode == SearchMode::Infinite {
        let handle = engine.start(pos, limits, Arc::new(Printer))?;
        info!("press Enter to stop");
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("cannot read stdin")?;
        handle.stop();
        handle.join()?
    } else {
        engine.search(&pos, limits, &Printer)?
    };

    println!("{result}");
    Ok(())
}

fn run_perft(args: PerftArgs) -> Result<()> {
    let mut pos = setup_position(&args.fen, &args.moves)?;
    let started = Instant::now();
    let counts = divide(&mut pos, args.depth);
    let elapsed = started.elapsed();

    let total: u64 = counts.iter().map(|(_, nodes)| nodes).sum();
    for (mv, nodes) in &counts {
        println!("{mv}: {nodes}");
    }
    let nps = total * 1000 / (elapsed.as_millis() as u64).max(1);
    println!();
    println!("nodes {total} time {} nps {nps}", elapsed.as_millis());
    Ok(())
}
