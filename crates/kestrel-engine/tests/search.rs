//! End-to-end searches through the public engine API.
//!
//! Covers mate and draw detection, root restrictions, limits, background
//! searches with stop and ponder hit, and agreement between configurations
//! that must not change the minimax value.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use kestrel_core::Position;
use kestrel_engine::{
    Clock, Engine, MaterialEvaluator, NoopListener, PvInfo, SearchError, SearchLimits,
    SearchListener, SearchOptions, SearchResult,
};

const SCHOLARS_MATE_FEN: &str =
    "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

const ITALIAN_FEN: &str =
    "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/3P1N2/PPP2PPP/RNBQK2R w KQkq - 1 5";

const TACTICAL_FEN: &str =
    "r2qkb1r/pp2nppp/3p4/2pNN1B1/2BnP3/3P4/PPP2PPP/R2bK2R w KQkq - 1 10";

fn engine(options: SearchOptions) -> Engine<MaterialEvaluator> {
    Engine::with_evaluator(options.with_hash(1), MaterialEvaluator).unwrap()
}

/// Plain alpha-beta without path-dependent extensions: the value of a
/// search depends only on the position and the depth.
fn plain() -> SearchOptions {
    SearchOptions {
        recapture_extension: false,
        check_extension: false,
        pawn_extension: false,
        single_reply_extension: false,
        mate_threat_extension: false,
        ..SearchOptions::exhaustive()
    }
}

fn search(engine: &Engine<MaterialEvaluator>, fen: &str, limits: SearchLimits) -> SearchResult {
    let pos: Position = fen.parse().unwrap();
    engine.search(&pos, limits, &NoopListener).unwrap()
}

fn play(pos: &mut Position, moves: &[&str]) {
    for text in moves {
        let mv = pos.parse_move(text).unwrap();
        pos.make_move(mv);
    }
}

fn assert_legal(pos: &Position, result: &SearchResult) {
    let mv = result.best_move.expect("search should return a move");
    assert!(pos.is_pseudo_legal(mv) && pos.is_legal(mv), "{mv} is not legal");
}

#[derive(Default)]
struct Recorder {
    depths: Mutex<Vec<i32>>,
    lines: Mutex<Vec<PvInfo>>,
}

impl SearchListener for Recorder {
    fn depth_started(&self, depth: i32) {
        self.depths.lock().unwrap().push(depth);
    }

    fn pv_updated(&self, info: &PvInfo) {
        self.lines.lock().unwrap().push(info.clone());
    }
}

// ── Scores ───────────────────────────────────────────────────────────────────

#[test]
fn starting_position_is_level_at_depth_one() {
    let engine = engine(SearchOptions::default());
    let result = search(&engine, kestrel_core::STARTING_FEN, SearchLimits::depth(1));
    assert_eq!(result.score, 0);
    assert_eq!(result.move_count, 20);
    assert_eq!(result.depth, 1);
    assert_legal(&Position::starting_position(), &result);
}

#[test]
fn finds_mate_in_one() {
    let engine = engine(SearchOptions::default());
    let result = search(&engine, SCHOLARS_MATE_FEN, SearchLimits::depth(3));
    assert_eq!(result.best_move.map(|mv| mv.to_uci()).as_deref(), Some("h5f7"));
    assert_eq!(result.mate_in(), Some(1));
    assert_eq!(result.to_string().split_whitespace().nth(1), Some("h5f7"));
}

#[test]
fn finds_mate_in_one_with_full_evaluation() {
    let engine = Engine::new(SearchOptions::default().with_hash(1)).unwrap();
    let pos: Position = SCHOLARS_MATE_FEN.parse().unwrap();
    let result = engine.search(&pos, SearchLimits::depth(4), &NoopListener).unwrap();
    assert_eq!(result.best_move.map(|mv| mv.to_uci()).as_deref(), Some("h5f7"));
    assert!(result.mate_in().is_some_and(|moves| moves > 0));
}

#[test]
fn repetition_saves_the_weaker_side() {
    let engine = engine(plain());
    let mut pos: Position = "k7/8/8/8/8/7Q/8/7K b - - 0 1".parse().unwrap();
    play(&mut pos, &["a8b8", "h3h4", "b8a8", "h4h3"]);
    let result = engine.search(&pos, SearchLimits::depth(1), &NoopListener).unwrap();
    assert_eq!(result.score, 0);
    assert_eq!(result.best_move.map(|mv| mv.to_uci()).as_deref(), Some("a8b8"));
}

#[test]
fn single_reply_is_played_at_once_under_a_clock() {
    let engine = engine(SearchOptions::default());
    let clock = Clock::new(Duration::from_secs(60), Duration::from_secs(60));
    let started = Instant::now();
    let result = search(&engine, "k7/8/8/8/8/8/1r6/K7 w - - 0 1", SearchLimits::clock(clock));
    assert_eq!(result.best_move.map(|mv| mv.to_uci()).as_deref(), Some("a1b2"));
    assert_eq!(result.move_count, 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn single_reply_is_played_at_once_under_a_move_time() {
    let engine = engine(SearchOptions::default());
    let started = Instant::now();
    let result = search(
        &engine,
        "k7/pp6/8/8/8/8/1q6/K6Q w - - 0 1",
        SearchLimits::movetime(Duration::from_secs(3)),
    );
    assert_eq!(result.best_move.map(|mv| mv.to_uci()).as_deref(), Some("a1b2"));
    assert_eq!(result.depth, 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn proven_mate_ends_a_timed_search() {
    let engine = engine(SearchOptions::default());
    let clock = Clock::new(Duration::from_secs(60), Duration::from_secs(60));
    for limits in [
        SearchLimits::clock(clock),
        SearchLimits::movetime(Duration::from_secs(3)),
    ] {
        let started = Instant::now();
        let result = search(&engine, SCHOLARS_MATE_FEN, limits);
        assert_eq!(result.mate_in(), Some(1));
        assert_eq!(result.depth, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}

#[test]
fn easy_recapture_ends_a_clock_search_early() {
    let options = SearchOptions::default();
    let iterations = options.time.easy_recapture_iterations as i32;
    let engine = engine(options);
    let mut pos: Position = "4k3/8/1n6/3N4/4P3/8/8/4K3 b - - 0 1".parse().unwrap();
    play(&mut pos, &["b6d5"]);

    let clock = Clock::new(Duration::from_secs(60), Duration::from_secs(60));
    let result = engine.search(&pos, SearchLimits::clock(clock), &NoopListener).unwrap();
    assert_eq!(result.best_move.map(|mv| mv.to_uci()).as_deref(), Some("e4d5"));
    assert!(
        result.depth <= iterations + 2,
        "stable recapture searched to depth {}",
        result.depth
    );
}

#[test]
fn fifty_move_rule_draws_a_won_position() {
    let fresh = search(&engine(plain()), "k7/8/8/8/8/8/8/KQ6 w - - 0 80", SearchLimits::depth(2));
    assert!(fresh.score > 500, "queen up scores {}", fresh.score);

    let expiring = search(&engine(plain()), "k7/8/8/8/8/8/8/KQ6 w - - 99 80", SearchLimits::depth(2));
    assert_eq!(expiring.score, 0);
}

#[test]
fn threefold_repetition_is_a_draw() {
    let engine = engine(plain());
    let mut pos: Position = "k7/8/8/8/8/7Q/8/7K b - - 0 1".parse().unwrap();
    play(
        &mut pos,
        &["a8b8", "h3h4", "b8a8", "h4h3", "a8b8", "h3h4", "b8a8", "h4h3"],
    );
    let result = engine.search(&pos, SearchLimits::depth(2), &NoopListener).unwrap();
    assert_eq!(result.score, 0);
    assert_eq!(result.best_move.map(|mv| mv.to_uci()).as_deref(), Some("a8b8"));
}

#[test]
fn quiescence_scores_checks_past_the_evasion_limit_statically() {
    // Depth one reaches the mate only through quiescence
    let counted = search(&engine(plain()), SCHOLARS_MATE_FEN, SearchLimits::depth(1));
    assert_eq!(counted.mate_in(), Some(1));

    let capped = search(
        &engine(SearchOptions {
            quiescence_check_limit: 0,
            ..plain()
        }),
        SCHOLARS_MATE_FEN,
        SearchLimits::depth(1),
    );
    assert_eq!(capped.mate_in(), None);
    assert!(capped.score.abs() < 2_000, "static score {}", capped.score);
}

// ── Configurations that keep the value ──────────────────────────────────────

#[test]
fn hash_table_does_not_change_the_value() {
    for fen in [ITALIAN_FEN, TACTICAL_FEN] {
        let without = search(&engine(plain()), fen, SearchLimits::depth(3));
        let with = search(
            &engine(SearchOptions {
                transposition_table: true,
                ..plain()
            }),
            fen,
            SearchLimits::depth(3),
        );
        assert_eq!(without.score, with.score, "{fen}");
        assert_eq!(without.best_move, with.best_move, "{fen}");
    }
}

#[test]
fn aspiration_windows_do_not_change_the_value() {
    let hashed = SearchOptions {
        transposition_table: true,
        ..plain()
    };
    for fen in [ITALIAN_FEN, TACTICAL_FEN] {
        let full = search(&engine(hashed.clone()), fen, SearchLimits::depth(4));
        let aspirated = search(
            &engine(SearchOptions {
                aspiration_windows: true,
                ..hashed.clone()
            }),
            fen,
            SearchLimits::depth(4),
        );
        assert_eq!(full.score, aspirated.score, "{fen}");
    }
}

#[test]
fn parallel_search_agrees_with_sequential() {
    for fen in [ITALIAN_FEN, TACTICAL_FEN] {
        let sequential = search(&engine(plain()), fen, SearchLimits::depth(4));
        let parallel = search(
            &engine(SearchOptions {
                split_depth: 2,
                ..plain().with_threads(4)
            }),
            fen,
            SearchLimits::depth(4),
        );
        assert_eq!(sequential.score, parallel.score, "{fen}");
        let pos: Position = fen.parse().unwrap();
        assert_legal(&pos, &parallel);
    }
}

#[test]
fn parallel_default_search_finds_mate() {
    let engine = engine(SearchOptions::default().with_threads(3));
    let result = search(&engine, SCHOLARS_MATE_FEN, SearchLimits::depth(5));
    assert_eq!(result.best_move.map(|mv| mv.to_uci()).as_deref(), Some("h5f7"));
}

// ── Root restrictions and limits ────────────────────────────────────────────

#[test]
fn search_moves_restrict_the_root() {
    let engine = engine(SearchOptions::default());
    let pos = Position::starting_position();
    let a3 = pos.parse_move("a2a3").unwrap();
    let h3 = pos.parse_move("h2h3").unwrap();
    let result = engine
        .search(&pos, SearchLimits::depth(3).with_search_moves(vec![a3, h3]), &NoopListener)
        .unwrap();
    assert!(result.best_move == Some(a3) || result.best_move == Some(h3));
    assert_eq!(result.move_count, 2);
}

#[test]
fn illegal_search_move_is_rejected() {
    let engine = engine(SearchOptions::default());
    let pos = Position::starting_position();
    let mut after = pos.clone();
    play(&mut after, &["e2e4"]);
    let black = after.parse_move("e7e5").unwrap();
    let error = engine
        .search(&pos, SearchLimits::depth(2).with_search_moves(vec![black]), &NoopListener)
        .unwrap_err();
    assert!(matches!(error, SearchError::IllegalSearchMove { .. }));
}

#[test]
fn zero_hash_size_is_rejected() {
    let error = Engine::new(SearchOptions::default().with_hash(0)).unwrap_err();
    assert!(matches!(error, SearchError::ZeroHashSize));
}

#[test]
fn node_limit_ends_the_search() {
    let engine = engine(SearchOptions::default());
    let result = search(&engine, ITALIAN_FEN, SearchLimits::nodes(5_000));
    assert!(result.best_move.is_some());
    assert!(result.depth >= 1);
    assert!(result.nodes < 100_000, "searched {} nodes", result.nodes);
}

#[test]
fn clock_search_returns_in_time() {
    let engine = engine(SearchOptions::default());
    let clock = Clock::new(Duration::from_secs(10), Duration::from_secs(10));
    let started = Instant::now();
    let result = search(&engine, ITALIAN_FEN, SearchLimits::clock(clock));
    assert!(result.best_move.is_some());
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn listener_sees_every_iteration() {
    let engine = engine(SearchOptions::default());
    let recorder = Recorder::default();
    let pos: Position = ITALIAN_FEN.parse().unwrap();
    let result = engine.search(&pos, SearchLimits::depth(4), &recorder).unwrap();

    assert_eq!(*recorder.depths.lock().unwrap(), vec![1, 2, 3, 4]);
    let lines = recorder.lines.lock().unwrap();
    let last = lines.last().expect("at least one principal variation");
    assert_eq!(last.depth, 4);
    assert_eq!(last.pv.first().copied(), result.best_move);
    assert_eq!(result.pv.first().copied(), result.best_move);
}

// ── Background searches ─────────────────────────────────────────────────────

#[test]
fn stopped_search_returns_a_legal_move() {
    let engine = engine(SearchOptions::default());
    let pos: Position = ITALIAN_FEN.parse().unwrap();
    let handle = engine
        .start(pos.clone(), SearchLimits::infinite(), Arc::new(NoopListener))
        .unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(!handle.is_finished());
    handle.stop();
    let result = handle.join().unwrap();
    assert_legal(&pos, &result);
}

#[test]
fn ponder_hit_starts_the_clock() {
    let engine = engine(SearchOptions::default());
    let pos: Position = ITALIAN_FEN.parse().unwrap();
    let limits = SearchLimits::movetime(Duration::from_millis(100)).pondering();
    let handle = engine.start(pos.clone(), limits, Arc::new(NoopListener)).unwrap();

    thread::sleep(Duration::from_millis(150));
    assert!(!handle.is_finished(), "pondering ignores the move time");
    handle.ponderhit();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(handle.is_finished());
    let result = handle.join().unwrap();
    assert_legal(&pos, &result);
}
