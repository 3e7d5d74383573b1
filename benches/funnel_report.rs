//! Funnel report benchmarks
//!
//! Benchmarks for the report engine and the write paths feeding it:
//! - Funnel generation over growing subject populations
//! - Sticky variant lookup
//! - Idempotent goal recording
//!
//! Toyota Way: Measure before optimizing (Genchi Genbutsu)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use splitdb::model::RequestContext;
use splitdb::SplitStore;

const VARIANTS: [&str; 3] = ["control", "short_form", "long_form"];
const FUNNEL: [&str; 4] = ["viewed", "started", "signed_up", "paid"];

/// Seed a store where each stage loses roughly a third of the subjects
fn seeded_store(subjects: usize) -> SplitStore {
    let store = SplitStore::new();
    store.declare("signup", VARIANTS).unwrap();
    for i in 0..subjects {
        let subject = store.create_subject().id();
        store
            .enroll_as_variant("signup", subject, VARIANTS[i % VARIANTS.len()])
            .unwrap();
        let depth = (i * 7) % (FUNNEL.len() + 1);
        for goal in &FUNNEL[..depth] {
            store
                .record(subject, goal, RequestContext::empty(), None)
                .unwrap();
        }
    }
    store
}

/// Benchmark funnel generation
fn bench_funnel_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("funnel_generation");

    for size in [1_000, 10_000, 50_000].iter() {
        let store = seeded_store(*size);
        let report = store
            .add_report("signup", "Signup", &FUNNEL.join("\n"))
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let funnel = store.generate(&report).unwrap();
                black_box(funnel);
            });
        });
    }

    group.finish();
}

/// Benchmark the sticky lookup path (enrollment already exists)
fn bench_sticky_variant(c: &mut Criterion) {
    let store = seeded_store(10_000);
    let subject = store.create_subject().id();
    store.get_variant_for("signup", subject).unwrap();

    c.bench_function("get_variant_for_existing", |b| {
        b.iter(|| black_box(store.get_variant_for("signup", black_box(subject)).unwrap()));
    });
}

/// Benchmark repeated goal recording (insert-if-absent hit)
fn bench_goal_record_repeat(c: &mut Criterion) {
    let store = seeded_store(10_000);
    let subject = store.create_subject().id();
    store
        .record(subject, "viewed", RequestContext::empty(), None)
        .unwrap();

    c.bench_function("record_existing_goal", |b| {
        b.iter(|| {
            black_box(
                store
                    .record(subject, "viewed", RequestContext::empty(), Some("again".into()))
                    .unwrap(),
            )
        });
    });
}

criterion_group!(
    benches,
    bench_funnel_generation,
    bench_sticky_variant,
    bench_goal_record_repeat
);
criterion_main!(benches);
