//! Perft benchmarks over the standard verification positions.

use criterion::{criterion_group, criterion_main, Criterion};

use meridian_engine::fen::Fen;
use meridian_engine::perft::perft;
use meridian_engine::Position;

fn perft_start_position(c: &mut Criterion) {
    let position = Position::start_position();
    c.bench_function("perft start depth 3", |b| {
        b.iter(|| perft(position, 3, 1))
    });
    c.bench_function("perft start depth 4", |b| {
        b.iter(|| perft(position, 4, 1))
    });
}

fn perft_kiwipete(c: &mut Criterion) {
    let position =
        Position::parse_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
            .unwrap();
    c.bench_function("perft kiwipete depth 3", |b| {
        b.iter(|| perft(position, 3, 1))
    });
}

criterion_group!(benches, perft_start_position, perft_kiwipete);
criterion_main!(benches);
