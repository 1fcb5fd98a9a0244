// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `array-cache stress` command: concurrent loans against one shared cache.
//!
//! Each worker is a tokio task that repeatedly loans a buffer, writes to it,
//! yields, and lets the guard return it. At the end the cache's books must
//! balance: every release was either reused, evicted, or is still cached,
//! and nothing was rejected.

use array_cache::{CacheConfig, SharedArrayCache};
use buffer_core::{CacheableBuffer, DType, HostAllocator, Location};
use std::time::Instant;

const ELEMENT_COUNTS: [usize; 5] = [16, 64, 256, 1024, 4096];

pub async fn execute(config: CacheConfig, workers: usize, ops: usize) -> anyhow::Result<()> {
    let limit = config.parse_limit()?;
    let cache = SharedArrayCache::new(config.build(HostAllocator::new())?);

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           array-cache · Stress Test                  ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
    println!("  Ceiling:  {limit}");
    println!("  Workers:  {workers}");
    println!("  Ops:      {ops} per worker");
    println!();

    let start = Instant::now();
    let mut tasks = Vec::with_capacity(workers);

    for worker in 0..workers {
        let cache = cache.clone();
        tasks.push(tokio::spawn(async move {
            for op in 0..ops {
                let elements = ELEMENT_COUNTS[(worker + op) % ELEMENT_COUNTS.len()];
                let mut loan = cache.loan(op % 4 == 0, DType::F32, elements, Location::Host)?;
                anyhow::ensure!(
                    loan.byte_len() == elements * DType::F32.size_bytes(),
                    "worker {worker}: loan of {elements} f32 has {} bytes",
                    loan.byte_len()
                );
                loan.as_mut_slice()[0] = worker as u8;
                tokio::task::yield_now().await;
            }
            Ok::<(), anyhow::Error>(())
        }));
    }

    for task in tasks {
        task.await??;
    }

    let elapsed = start.elapsed();
    let (cached_bytes, entries, max_bytes, stats) = cache.with(|m| {
        (
            m.current_cache_bytes(),
            m.cache_entry_count(),
            m.max_cache_bytes(),
            m.stats(),
        )
    })?;

    // ── Verification ───────────────────────────────────────────
    let expected = (workers * ops) as u64;
    anyhow::ensure!(
        stats.total_allocations == expected && stats.releases == expected,
        "expected {expected} allocations and releases, saw {} and {}",
        stats.total_allocations,
        stats.releases,
    );
    anyhow::ensure!(
        stats.rejected_releases == 0,
        "{} releases were rejected",
        stats.rejected_releases
    );
    anyhow::ensure!(
        stats.releases == stats.cache_hits + stats.evictions + entries as u64,
        "release accounting does not balance: {} releases, {} hits, {} evictions, {entries} cached",
        stats.releases,
        stats.cache_hits,
        stats.evictions,
    );
    anyhow::ensure!(
        cached_bytes <= max_bytes,
        "cache holds {cached_bytes} bytes over its {max_bytes}-byte ceiling with nothing pinned"
    );

    let ops_per_sec = expected as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    println!("  {}", stats.summary());
    println!();
    println!("  Cached:      {cached_bytes} bytes in {entries} buffers");
    println!("  Elapsed:     {:.2}ms", elapsed.as_secs_f64() * 1000.0);
    println!("  Throughput:  {ops_per_sec:.0} loans/s");
    println!();
    println!("  Accounting verified.");

    Ok(())
}
