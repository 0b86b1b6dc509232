//! # Filter Benchmarks
//!
//! - Merge: O(k) index computations per item
//! - Contains: O(k) lookups per item, times the depth for layered filters
//! - Filter union: O(m/64) word operations
//! - Shape derivation: closed-form, no iteration

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use layered_bloom::{
    BloomFilter, CountingBloomFilter, EnhancedDoubleHasher, ExtendCheck, LayerPolicyBuilder,
    LayeredBloomFilter, Shape, SimpleBloomFilter,
};

/// Random 20-byte addresses from a fixed seed
fn generate_addresses(count: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut addr = vec![0u8; 20];
            rng.fill(&mut addr[..]);
            addr
        })
        .collect()
}

fn hashers(addresses: &[Vec<u8>]) -> Vec<EnhancedDoubleHasher> {
    addresses
        .iter()
        .map(|addr| EnhancedDoubleHasher::from_bytes(addr))
        .collect()
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("layered-bloom/merge");
    group.measurement_time(Duration::from_secs(5));

    for k in [7, 13, 20] {
        group.bench_with_input(BenchmarkId::new("single_merge", k), &k, |b, &k| {
            let mut filter = SimpleBloomFilter::new(Shape::from_km(k, 36_000).unwrap());
            let hasher = EnhancedDoubleHasher::from_bytes(b"0xABCD1234");
            b.iter(|| filter.merge(black_box(&hasher)))
        });
    }

    let items = hashers(&generate_addresses(1000, 7));
    let shape = Shape::from_np(1000, 0.01).unwrap();
    group.throughput(Throughput::Elements(1000));

    group.bench_function("bulk_merge_1000_simple", |b| {
        b.iter(|| {
            let mut filter = SimpleBloomFilter::new(shape);
            for item in &items {
                filter.merge(black_box(item)).unwrap();
            }
            black_box(filter.cardinality())
        });
    });

    group.bench_function("bulk_merge_1000_counting", |b| {
        b.iter(|| {
            let mut filter = CountingBloomFilter::new(shape);
            for item in &items {
                filter.merge(black_box(item)).unwrap();
            }
            black_box(filter.cardinality())
        });
    });

    let policy = LayerPolicyBuilder::new()
        .extend_check(ExtendCheck::OnCount(100))
        .max_layers(5)
        .build()
        .unwrap();
    group.bench_function("bulk_merge_1000_layered", |b| {
        b.iter(|| {
            let mut filter = LayeredBloomFilter::new(shape, policy).unwrap();
            for item in &items {
                filter.merge(black_box(item)).unwrap();
            }
            black_box(filter.depth())
        });
    });

    group.finish();
}

fn bench_contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("layered-bloom/contains");
    group.measurement_time(Duration::from_secs(5));

    let shape = Shape::from_np(100, 0.01).unwrap();
    let items = hashers(&generate_addresses(100, 11));
    let probes = hashers(&generate_addresses(10_000, 13));

    let mut simple = SimpleBloomFilter::new(shape);
    let mut layered = LayeredBloomFilter::fixed(shape, 8).unwrap();
    for (i, item) in items.iter().enumerate() {
        simple.merge(item).unwrap();
        layered.merge(item).unwrap();
        if i % 13 == 12 {
            layered.next();
        }
    }

    group.bench_function("contains_existing_element", |b| {
        let target = &items[50];
        b.iter(|| black_box(simple.contains(black_box(target))))
    });

    group.throughput(Throughput::Elements(10_000));
    for (name, filter) in [
        ("bulk_contains_10000_simple", &simple as &dyn BloomFilter),
        ("bulk_contains_10000_layered", &layered as &dyn BloomFilter),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| probes.iter().filter(|probe| filter.contains(*probe)).count())
        });
    }

    group.finish();
}

fn bench_union(c: &mut Criterion) {
    let mut group = c.benchmark_group("layered-bloom/union");
    group.measurement_time(Duration::from_secs(5));

    for size in [1_000, 10_000, 36_000] {
        let shape = Shape::from_km(7, size).unwrap();
        let mut first = SimpleBloomFilter::new(shape);
        let mut second = SimpleBloomFilter::new(shape);
        for item in hashers(&generate_addresses(50, 17)) {
            first.merge(&item).unwrap();
        }
        for item in hashers(&generate_addresses(50, 19)) {
            second.merge(&item).unwrap();
        }

        group.throughput(Throughput::Bytes(size as u64 / 8));
        group.bench_with_input(BenchmarkId::new("merge_filter", size), &second, |b, other| {
            b.iter(|| {
                let mut merged = first.clone();
                merged.merge_filter(black_box(other)).unwrap();
                black_box(merged.cardinality())
            });
        });
    }

    group.finish();
}

fn bench_shape(c: &mut Criterion) {
    let mut group = c.benchmark_group("layered-bloom/shape");

    group.bench_function("from_np", |b| {
        b.iter(|| Shape::from_np(black_box(1000), black_box(0.01)))
    });
    group.bench_function("from_pmk", |b| {
        b.iter(|| Shape::from_pmk(black_box(0.01), black_box(9586), black_box(7)))
    });

    group.finish();
}

criterion_group!(benches, bench_merge, bench_contains, bench_union, bench_shape);
criterion_main!(benches);
