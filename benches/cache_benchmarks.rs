#![allow(deprecated)]

//! Cascade benchmarks

use cascade::*;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn two_tiers(rt: &tokio::runtime::Runtime) -> (CascadeCache, Arc<InMemoryStore>, Arc<InMemoryStore>) {
    let l0 = Arc::new(InMemoryStore::new());
    let l1 = Arc::new(InMemoryStore::new());
    let cache = rt
        .block_on(CascadeCache::new(
            CascadeConfig::new()
                .tier(TierSpec::store(l0.clone()))
                .tier(TierSpec::store(l1.clone()))
                .with_expires_in(Duration::from_secs(600)),
        ))
        .unwrap();
    (cache, l0, l1)
}

fn cascade_write_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (cache, _, _) = two_tiers(&rt);

    let mut group = c.benchmark_group("cascade_write");
    group.throughput(Throughput::Elements(1));

    group.bench_function("write_default_ttl", |b| {
        b.to_async(&rt).iter(|| async {
            cache.write("benchmark_key", "benchmark_value").await.unwrap();
        });
    });

    group.bench_function("write_expires_in", |b| {
        let options = CallOptions::new().with_expires_in(Duration::from_secs(60));
        b.to_async(&rt).iter(|| async {
            cache
                .write_with("benchmark_key", "benchmark_value", &options)
                .await
                .unwrap();
        });
    });

    group.finish();
}

fn cascade_read_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (cache, l0, l1) = two_tiers(&rt);

    let mut group = c.benchmark_group("cascade_read");
    group.throughput(Throughput::Elements(1));

    group.bench_function("tier0_hit", |b| {
        rt.block_on(async {
            cache.write("l0_key", "l0_value").await.unwrap();
        });
        b.to_async(&rt).iter(|| async {
            let result: Option<String> = cache.read("l0_key").await.unwrap();
            black_box(result)
        });
    });

    group.bench_function("tier1_hit_with_backfill", |b| {
        b.to_async(&rt).iter(|| async {
            // Left only in tier 1 so every read walks and backfills
            l0.delete_entry("l1_key").await.unwrap();
            l1.set_entry("l1_key", CacheEntry::new(json!("l1_value"), None))
                .await
                .unwrap();
            let result: Option<String> = cache.read("l1_key").await.unwrap();
            black_box(result)
        });
    });

    group.bench_function("miss", |b| {
        b.to_async(&rt).iter(|| async {
            let result: Option<String> = cache.read("nonexistent_key").await.unwrap();
            black_box(result)
        });
    });

    group.finish();
}

fn cascade_operations_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (cache, _, _) = two_tiers(&rt);

    let mut group = c.benchmark_group("cascade_operations");

    group.bench_function("exist", |b| {
        rt.block_on(async {
            cache.write("check_key", "value").await.unwrap();
        });
        b.to_async(&rt).iter(|| async {
            let result = cache.exist("check_key").await.unwrap();
            black_box(result)
        });
    });

    group.bench_function("delete", |b| {
        b.to_async(&rt).iter(|| async {
            cache.write("delete_key", "value").await.unwrap();
            cache.delete("delete_key").await.unwrap();
        });
    });

    group.bench_function("increment", |b| {
        rt.block_on(async {
            cache.write("counter", &0).await.unwrap();
        });
        b.to_async(&rt).iter(|| async {
            let result = cache.increment("counter", 1).await.unwrap();
            black_box(result)
        });
    });

    group.finish();
}

fn read_many_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (cache, _, l1) = two_tiers(&rt);

    let mut group = c.benchmark_group("read_many");

    for batch_size in [10, 50, 100].iter() {
        group.bench_with_input(
            BenchmarkId::new("tier0_hits", batch_size),
            batch_size,
            |b, &size| {
                let keys: Vec<String> = (0..size).map(|i| format!("key_{}", i)).collect();
                rt.block_on(async {
                    for key in &keys {
                        cache.write(key, "value").await.unwrap();
                    }
                });

                b.to_async(&rt).iter(|| async {
                    let result: std::collections::HashMap<String, String> =
                        cache.read_many(&keys).await.unwrap();
                    black_box(result)
                });
            },
        );
    }

    for batch_size in [10, 50, 100].iter() {
        group.bench_with_input(
            BenchmarkId::new("half_tier1", batch_size),
            batch_size,
            |b, &size| {
                let keys: Vec<String> = (0..size).map(|i| format!("split_key_{}", i)).collect();

                b.to_async(&rt).iter(|| async {
                    cache.clear().await.unwrap();
                    for (i, key) in keys.iter().enumerate() {
                        if i % 2 == 0 {
                            cache.write(key, "value").await.unwrap();
                        } else {
                            l1.set_entry(key, CacheEntry::new(json!("value"), None))
                                .await
                                .unwrap();
                        }
                    }
                    let result: std::collections::HashMap<String, String> =
                        cache.read_many(&keys).await.unwrap();
                    black_box(result)
                });
            },
        );
    }

    group.finish();
}

fn value_size_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (cache, _, _) = two_tiers(&rt);

    let mut group = c.benchmark_group("value_sizes");

    let sizes = [
        ("100B", 100usize),
        ("1KB", 1024),
        ("10KB", 10 * 1024),
        ("100KB", 100 * 1024),
    ];

    for (name, size) in sizes {
        let value: String = "x".repeat(size);

        group.bench_function(format!("write_{}", name), |b| {
            b.to_async(&rt).iter(|| async {
                cache.write("sized_key", &value).await.unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    cascade_write_benchmark,
    cascade_read_benchmark,
    cascade_operations_benchmark,
    read_many_benchmark,
    value_size_benchmark,
);

criterion_main!(benches);
