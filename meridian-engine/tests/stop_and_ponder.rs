//! Cancellation and ponder control.
//!
//! An infinite search must stop promptly when told to, and a pondering
//! search must hold its best move until the ponderhit arrives.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use meridian_engine::fen::Fen;
use meridian_engine::search::SearchResult;
use meridian_engine::uci::SearchControls;
use meridian_engine::*;

#[test]
fn stop_ends_infinite_search_promptly() {
    let mut engine = Engine::new();
    engine.set_game(Position::start_position());

    let (sender, receiver) = mpsc::channel::<SearchResult>();
    let controls = SearchControls {
        infinite: true,
        ..Default::default()
    };
    engine.go(controls, sender).unwrap();

    // Let the search run, then cancel it.
    std::thread::sleep(Duration::from_millis(200));
    assert!(receiver.try_recv().is_err(), "infinite search returned early");

    let stop_sent = Instant::now();
    engine.stop();
    let result = receiver
        .recv_timeout(Duration::from_millis(1000))
        .expect("search did not stop");
    assert!(stop_sent.elapsed() < Duration::from_millis(1000));

    // The interrupted search still reports a legal move.
    assert!(Position::start_position()
        .get_legal_moves()
        .contains(&result.best_move));
    engine.wait();
}

#[test]
fn ponder_defers_result_until_ponderhit() {
    let mut engine = Engine::new();
    engine.set_game(Position::start_position());

    let (sender, receiver) = mpsc::channel::<SearchResult>();
    let controls = SearchControls {
        depth: Some(3),
        ponder: true,
        ..Default::default()
    };
    engine.go(controls, sender).unwrap();

    // The shallow search finishes quickly, but pondering must hold the
    // result back.
    std::thread::sleep(Duration::from_millis(300));
    assert!(
        receiver.try_recv().is_err(),
        "bestmove delivered before ponderhit"
    );

    engine.ponderhit();
    let result = receiver
        .recv_timeout(Duration::from_millis(1000))
        .expect("no result after ponderhit");
    assert!(result.best_move.is_some());
    engine.wait();
}

#[test]
fn ponder_releases_on_stop_too() {
    let mut engine = Engine::new();
    let pos = Position::parse_fen("4k3/8/4K3/8/8/8/8/4Q3 w - - 0 1").unwrap();
    engine.set_game(pos);

    let (sender, receiver) = mpsc::channel::<SearchResult>();
    let controls = SearchControls {
        depth: Some(3),
        ponder: true,
        ..Default::default()
    };
    engine.go(controls, sender).unwrap();

    std::thread::sleep(Duration::from_millis(100));
    engine.stop();
    let result = receiver
        .recv_timeout(Duration::from_millis(1000))
        .expect("no result after stop");
    assert!(result.best_move.is_some());
    engine.wait();
}

#[test]
fn movetime_stops_on_its_own() {
    let mut engine = Engine::new();
    engine.set_game(Position::start_position());

    let started = Instant::now();
    let result = engine.search_sync(Mode::movetime(Duration::from_millis(150), None));
    // Generous bound: the poll interval plus overhead, not seconds.
    assert!(started.elapsed() < Duration::from_millis(1500));
    assert!(result.best_move.is_some());
}
