//! Zobrist hashing benchmarks: full generation against incremental update.

use criterion::{criterion_group, criterion_main, Criterion};

use meridian_engine::coretypes::Move;
use meridian_engine::zobrist::{ZobristTable, ZOBRIST};
use meridian_engine::Position;

fn generate_hash(c: &mut Criterion) {
    let position = Position::start_position();
    c.bench_function("zobrist generate", |b| {
        b.iter(|| {
            ZOBRIST.generate_hash((
                position.pieces(),
                position.player(),
                position.castling(),
                position.en_passant(),
            ))
        })
    });
}

fn incremental_update(c: &mut Criterion) {
    let position = Position::start_position();
    let move_: Move = "e2e4".parse().unwrap();
    c.bench_function("zobrist incremental do/undo", |b| {
        b.iter(|| {
            let mut pos = position;
            let move_info = pos.do_move(move_);
            pos.undo_move(move_info);
            pos.key()
        })
    });
}

fn table_construction(c: &mut Criterion) {
    c.bench_function("zobrist table with seed", |b| {
        b.iter(|| ZobristTable::with_seed(42))
    });
}

criterion_group!(benches, generate_hash, incremental_update, table_construction);
criterion_main!(benches);
