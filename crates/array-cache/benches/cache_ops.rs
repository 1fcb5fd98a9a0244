// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the allocate/release paths.

use array_cache::{ArrayCacheManager, CacheLimit};
use buffer_core::{DType, HostAllocator, Location};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_hit_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("hit_path");
    for elements in [16usize, 1024, 64 * 1024] {
        let mut cache = ArrayCacheManager::new(HostAllocator::new(), CacheLimit::from_mb(64));
        let warm = cache.allocate(false, DType::F32, elements, Location::Host).unwrap();
        cache.release(warm).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(elements), &elements, |b, &n| {
            b.iter(|| {
                let buf = cache.allocate(false, DType::F32, black_box(n), Location::Host).unwrap();
                cache.release(buf).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_miss_path(c: &mut Criterion) {
    // A zero ceiling closes every release, so each allocate is a miss.
    let mut cache = ArrayCacheManager::new(HostAllocator::new(), CacheLimit::disabled());
    c.bench_function("miss_path_1k_f32", |b| {
        b.iter(|| {
            let buf = cache.allocate(false, DType::F32, black_box(1024), Location::Host).unwrap();
            cache.release(buf).unwrap();
        })
    });
}

fn bench_eviction_under_pressure(c: &mut Criterion) {
    let sizes = [8usize, 64, 256, 1024, 4096];
    let mut group = c.benchmark_group("eviction_under_pressure");
    for pinned_every in [0usize, 4] {
        group.bench_with_input(
            BenchmarkId::new("pinned_every", pinned_every),
            &pinned_every,
            |b, &pinned_every| {
                b.iter(|| {
                    let mut cache =
                        ArrayCacheManager::new(HostAllocator::new(), CacheLimit::from_bytes(16 * 1024));
                    let bufs: Vec<_> = (0..256)
                        .map(|i| {
                            cache
                                .allocate(false, DType::U8, sizes[i % sizes.len()], Location::Host)
                                .unwrap()
                        })
                        .collect();
                    let mut pins = Vec::new();
                    for (i, buf) in bufs.into_iter().enumerate() {
                        if pinned_every > 0 && i % pinned_every == 0 {
                            let handle = buf.handle();
                            handle.retain();
                            pins.push(handle);
                        }
                        cache.release(buf).unwrap();
                    }
                    for handle in &pins {
                        handle.release();
                    }
                    black_box(cache.current_cache_bytes())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_hit_path, bench_miss_path, bench_eviction_under_pressure);
criterion_main!(benches);
