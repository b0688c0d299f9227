//! Verifier Performance Benchmarks
//!
//! This module benchmarks the ownership verifier:
//! - Operation throughput on a single-region unit
//! - Cascading deallocation through nested regions
//! - Parallel verification of independent units

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use regio_benchmarks::{classes, linked_list, many_units, nested_regions};
use regio_ownership::{verify, verify_units, Verifier, VerifierConfig};

// ============================================================================
// Single Unit
// ============================================================================

fn bench_operation_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("operation_throughput");
    let classes = classes();

    for len in [16, 256, 4096] {
        let unit = linked_list(len);
        group.throughput(Throughput::Elements(unit.ops.len() as u64));
        group.bench_with_input(BenchmarkId::new("linked_list", len), &unit, |b, unit| {
            b.iter(|| black_box(verify(&classes, black_box(unit))))
        });
    }

    group.finish();
}

fn bench_cascading_drop(c: &mut Criterion) {
    let mut group = c.benchmark_group("cascading_drop");
    let classes = classes();

    for depth in [8, 64, 256] {
        let unit = nested_regions(depth);
        group.bench_with_input(BenchmarkId::new("nested_regions", depth), &unit, |b, unit| {
            b.iter(|| {
                let mut verifier = Verifier::new(&classes);
                black_box(verifier.verify(black_box(unit)))
            })
        });
    }

    group.finish();
}

// ============================================================================
// Many Units
// ============================================================================

fn bench_parallel_units(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_units");
    let classes = classes();
    let config = VerifierConfig::default();

    for count in [8, 64, 512] {
        let units = many_units(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("sequential", count), &units, |b, units| {
            b.iter(|| {
                let results: Vec<_> = units.iter().map(|unit| verify(&classes, unit)).collect();
                black_box(results)
            })
        });

        group.bench_with_input(BenchmarkId::new("rayon", count), &units, |b, units| {
            b.iter(|| black_box(verify_units(&classes, units, &config)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_operation_throughput,
    bench_cascading_drop,
    bench_parallel_units
);
criterion_main!(benches);
