use criterion::{black_box, criterion_group, criterion_main, Criterion};
use delayq_core::{MemoryStore, OrderedStore, RocksDbStore};

/// Fill a store with `n` members at 1-unit score spacing.
fn fill(store: &dyn OrderedStore, n: u64) {
    for i in 0..n {
        store
            .insert_if_absent("bench", i as f64, format!("member-{i:08}").as_bytes())
            .unwrap();
    }
}

/// Range query cost for one poll window: the consumer asks for everything up
/// to `now + poll_period`, which here is the first 100 of 10,000 entries.
fn bench_poll_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll_window");

    group.bench_function("memory_100_of_10000", |b| {
        let store = MemoryStore::new();
        fill(&store, 10_000);
        b.iter(|| store.range_by_score("bench", 0.0, black_box(99.0)).unwrap());
    });

    group.bench_function("rocksdb_100_of_10000", |b| {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        fill(&store, 10_000);
        b.iter(|| store.range_by_score("bench", 0.0, black_box(99.0)).unwrap());
    });

    group.finish();
}

/// Conditional insert of an already-present member, the duplicate path.
fn bench_duplicate_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("duplicate_insert");

    group.bench_function("memory", |b| {
        let store = MemoryStore::new();
        store.insert_if_absent("bench", 1.0, b"dup").unwrap();
        b.iter(|| store.insert_if_absent("bench", black_box(2.0), b"dup").unwrap());
    });

    group.bench_function("rocksdb", |b| {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        store.insert_if_absent("bench", 1.0, b"dup").unwrap();
        b.iter(|| store.insert_if_absent("bench", black_box(2.0), b"dup").unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_poll_window, bench_duplicate_insert);
criterion_main!(benches);
