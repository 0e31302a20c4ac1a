// Criterion benchmark for `rg_core::search` on the CPU literal path
// (spec.md §4.B). Compares a common short pattern against a rare one to
// show the skip table's effect, and case-sensitive vs case-insensitive
// overhead.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rg_core::SearchOptions;

fn make_text(repeats: usize) -> Vec<u8> {
    "the quick brown fox jumps over the lazy dog\n".repeat(repeats).into_bytes()
}

fn bench_search(c: &mut Criterion) {
    let text = make_text(10_000);
    let mut opts = SearchOptions::default();
    opts.fixed_string = true;

    c.bench_function("literal_search_common_word", |b| {
        b.iter(|| rg_core::search(black_box(&text), black_box(b"the"), &opts))
    });
    c.bench_function("literal_search_rare_word", |b| {
        b.iter(|| rg_core::search(black_box(&text), black_box(b"quixotic"), &opts))
    });

    let mut ci_opts = opts;
    ci_opts.case_insensitive = true;
    c.bench_function("literal_search_case_insensitive", |b| {
        b.iter(|| rg_core::search(black_box(&text), black_box(b"THE"), &ci_opts))
    });
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
