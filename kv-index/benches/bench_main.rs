use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use kv_index::mvcc::key_index::KeyIndex;
use kv_index::mvcc::revision::Revision;
use kv_index::mvcc::KeepSet;

/// Builds a key index holding `revs` revisions, with a delete every eighth
/// write so the history spans several generations.
fn history(revs: i64) -> KeyIndex {
    let mut ki = KeyIndex::new("bench");
    for main in 1..=revs {
        if main % 8 == 0 {
            ki.tombstone(Revision::new(main, 0)).unwrap();
        } else {
            ki.put(Revision::new(main, 0));
        }
    }
    ki
}

fn bench_put(c: &mut Criterion) {
    c.bench_function("put 1024", |b| {
        b.iter(|| {
            let mut ki = KeyIndex::new("bench");
            for main in 1..=1024 {
                ki.put(Revision::new(black_box(main), 0));
            }
            ki
        })
    });
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    for depth in [16_i64, 256, 4096] {
        let ki = history(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &ki, |b, ki| {
            b.iter(|| ki.get(black_box(depth - 1)))
        });
    }
    group.finish();
}

fn bench_since(c: &mut Criterion) {
    let ki = history(4096);
    c.bench_function("since 4096", |b| b.iter(|| ki.since(black_box(0))));
}

fn bench_compact(c: &mut Criterion) {
    let ki = history(4096);
    c.bench_function("compact 4096", |b| {
        b.iter_batched(
            || (ki.clone(), KeepSet::new()),
            |(mut ki, mut keep)| {
                ki.compact(black_box(2048), &mut keep);
                (ki, keep)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_put, bench_get, bench_since, bench_compact);
criterion_main!(benches);
