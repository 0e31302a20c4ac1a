// Criterion benchmark for `skip::SkipTable::build` (spec.md §4.B). Checks
// that skip-table construction stays proportional to pattern length, not
// text length, across both case-sensitive and case-insensitive builds.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rg_core::skip::SkipTable;

fn bench_build(c: &mut Criterion) {
    let short = b"hello".to_vec();
    let long = b"the quick brown fox jumps over the lazy dog".to_vec();

    c.bench_function("skip_table_build_short", |b| {
        b.iter(|| SkipTable::build(black_box(&short), false))
    });
    c.bench_function("skip_table_build_long", |b| {
        b.iter(|| SkipTable::build(black_box(&long), false))
    });
    c.bench_function("skip_table_build_case_insensitive", |b| {
        b.iter(|| SkipTable::build(black_box(&long), true))
    });
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
