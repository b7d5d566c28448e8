//! Fixed-depth search benchmarks over tactical middlegame positions.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use meridian_engine::fen::Fen;
use meridian_engine::search::search;
use meridian_engine::{Mode, Position, TranspositionTable};

fn search_middlegame(c: &mut Criterion) {
    let position =
        Position::parse_fen("r4rk1/1b3ppp/pp2p3/2p5/P1B1NR1Q/3P3P/2q3P1/7K w - - 0 24").unwrap();
    c.bench_function("search middlegame depth 5", |b| {
        b.iter(|| {
            let tt = Arc::new(TranspositionTable::with_mb(4));
            search(position, Mode::depth(5, None), tt, None)
        })
    });
}

fn search_start_position(c: &mut Criterion) {
    let position = Position::start_position();
    c.bench_function("search start depth 5", |b| {
        b.iter(|| {
            let tt = Arc::new(TranspositionTable::with_mb(4));
            search(position, Mode::depth(5, None), tt, None)
        })
    });
}

criterion_group!(benches, search_middlegame, search_start_position);
criterion_main!(benches);
