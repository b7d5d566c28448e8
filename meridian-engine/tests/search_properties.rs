//! Search invariants that hold for any legal position.

use std::sync::Arc;

use meridian_engine::coretypes::{Color, Cp, Move, Square::*};
use meridian_engine::fen::Fen;
use meridian_engine::search::{search, search_with_settings, SearchSettings};
use meridian_engine::*;

const POSITIONS: [&str; 5] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "4k3/8/4K3/8/8/8/8/4Q3 w - - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
];

#[test]
fn scores_stay_within_mate_bounds() {
    for fen in POSITIONS {
        let pos = Position::parse_fen(fen).unwrap();
        let tt = Arc::new(TranspositionTable::with_mb(2));
        let result = search(pos, Mode::depth(4, None), tt, None);

        assert!(result.score >= -Cp::CHECKMATE, "fen {fen}");
        assert!(result.score <= Cp::CHECKMATE, "fen {fen}");
        assert!(pos.get_legal_moves().contains(&result.best_move), "fen {fen}");
    }
}

#[test]
fn pv_starts_with_best_move_and_is_playable() {
    for fen in POSITIONS {
        let pos = Position::parse_fen(fen).unwrap();
        let tt = Arc::new(TranspositionTable::with_mb(2));
        let result = search(pos, Mode::depth(4, None), tt, None);

        assert_eq!(result.pv_line[0], result.best_move);
        let mut walk = pos;
        for move_ in &result.pv_line {
            assert!(walk.is_legal_move(*move_), "fen {fen} pv move {move_}");
            walk.do_move(*move_);
        }
    }
}

#[test]
fn parallel_search_agrees_on_forced_lines() {
    // A forced mate leaves no room for thread scheduling to change the
    // answer: both runs must find the same mating move and a mate score.
    let fen = "3n4/5pkp/p4Nb1/1p2q1PQ/8/1P6/1PP2P2/6K1 w - - 1 34";
    let pos = Position::parse_fen(fen).unwrap();
    let expected = Move::new(H5, H6, None);

    let tt_single = Arc::new(TranspositionTable::with_mb(4));
    let single = search(pos, Mode::depth(6, None), tt_single, None);

    let mut settings = SearchSettings::from_mode(Mode::depth(6, None));
    settings.threads = 2;
    settings.emit_info = false;
    let tt_multi = Arc::new(TranspositionTable::with_mb(4));
    let multi = search_with_settings(pos, settings, tt_multi, None);

    assert_eq!(single.best_move, expected);
    assert_eq!(multi.best_move, expected);
    assert!(single.score.is_mate());
    assert!(multi.score.is_mate());
    assert_eq!(single.leading(), Some(Color::White));
    assert_eq!(multi.leading(), Some(Color::White));
}

#[test]
fn parallel_search_returns_legal_move_from_open_position() {
    let pos = Position::start_position();
    let mut settings = SearchSettings::from_mode(Mode::depth(5, None));
    settings.threads = 4;
    settings.emit_info = false;
    let tt = Arc::new(TranspositionTable::with_mb(4));
    let result = search_with_settings(pos, settings, tt, None);

    assert!(pos.get_legal_moves().contains(&result.best_move));
    assert!(!result.score.is_mate());
}

#[test]
fn repeated_search_reuses_table_and_agrees() {
    // Searching the same position twice over one table must not corrupt
    // the result; the second search should only get faster.
    let pos = Position::parse_fen(POSITIONS[1]).unwrap();
    let tt = Arc::new(TranspositionTable::with_mb(4));

    let first = search(pos, Mode::depth(4, None), Arc::clone(&tt), None);
    let second = search(pos, Mode::depth(4, None), Arc::clone(&tt), None);

    assert_eq!(first.best_move, second.best_move);
    assert!(second.nodes <= first.nodes * 2);
}

#[test]
fn forced_mate_score_encodes_distance() {
    // Fool's mate: black mates in one ply.
    let pos = Position::parse_fen(
        "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2",
    )
    .unwrap();
    let tt = Arc::new(TranspositionTable::with_mb(2));
    let result = search(pos, Mode::depth(4, None), tt, None);

    assert_eq!(result.best_move, Move::new(D8, H4, None));
    // Relative to black, the score is mate-in-one-ply exactly.
    assert_eq!(result.score * Color::Black.sign(), Cp::mate_in(1));
}
