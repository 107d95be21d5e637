// Performance benchmarks for the matching hot path: bulk distance
// computation over large comparison tables.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hspace::{names, ComparisonTable, DesignRecord, MatchOptions, Norm, TargetVector};
use rand::prelude::*;

fn generate_table(rows: usize) -> ComparisonTable {
    let mut rng = rand::rng();
    let records = (0..rows)
        .map(|_| {
            DesignRecord::new()
                .with_design(names::TOTAL_LENGTH, rng.random_range(2000.0..8000.0))
                .with_design(names::COUPLING_LENGTH, rng.random_range(100.0..400.0))
                .with_physics(names::CAVITY_FREQUENCY_GHZ, rng.random_range(4.0..8.0))
                .with_physics(names::KAPPA_KHZ, rng.random_range(20.0..500.0))
                .with_physics(names::G_MHZ, rng.random_range(20.0..150.0))
        })
        .collect();
    ComparisonTable::from_records(records).unwrap()
}

fn target() -> TargetVector {
    TargetVector::new()
        .with(names::CAVITY_FREQUENCY_GHZ, 5.5)
        .with(names::KAPPA_KHZ, 100.0)
        .with(names::G_MHZ, 70.0)
}

fn benchmark_find_closest(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_closest");

    for rows in [10_000, 100_000, 1_000_000].iter() {
        let table = generate_table(*rows);
        let target = target();
        group.bench_with_input(BenchmarkId::new("euclidean", rows), rows, |b, _| {
            b.iter(|| {
                let matches = hspace::find_closest(
                    black_box(&table),
                    black_box(&target),
                    10,
                    &MatchOptions::default(),
                )
                .unwrap();
                black_box(matches.len())
            });
        });
    }

    group.finish();
}

fn benchmark_norms(c: &mut Criterion) {
    let mut group = c.benchmark_group("norms");
    let table = generate_table(100_000);
    let target = target();

    for norm in [Norm::Euclidean, Norm::Manhattan, Norm::Chebyshev] {
        let options = MatchOptions {
            norm,
            ..MatchOptions::default()
        };
        group.bench_with_input(
            BenchmarkId::new("100k", format!("{:?}", norm)),
            &options,
            |b, options| {
                b.iter(|| {
                    hspace::find_closest(black_box(&table), black_box(&target), 1, options)
                        .unwrap()
                        .len()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_find_closest, benchmark_norms);
criterion_main!(benches);
