// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `array-cache simulate` command: a deterministic single-cache workload.
//!
//! Buffers are allocated with byte sizes taken round-robin from `--sizes`.
//! At most `--window` of them are on loan at once; when the window is full
//! the oldest loan is released back into the cache. With `--pinned-every N`
//! every Nth buffer carries an external reference for the whole run, which
//! the eviction pass must skip. The run is fully deterministic, so two runs
//! with the same arguments print identical reports.

use array_cache::{CacheConfig, CacheLimit, CacheStats};
use buffer_core::{BufferHandle, DType, HostAllocator, Location};
use std::collections::VecDeque;
use std::time::Instant;

#[derive(Debug, serde::Serialize)]
struct SimulationReport {
    max_cache_bytes: String,
    buffers: usize,
    sizes: Vec<usize>,
    window: usize,
    pinned_every: Option<usize>,
    final_cached_bytes: usize,
    final_entries: usize,
    size_classes: usize,
    max_overrun_bytes: usize,
    elapsed_ms: f64,
    stats: CacheStats,
}

pub async fn execute(
    config: CacheConfig,
    buffers: usize,
    sizes_str: String,
    window: usize,
    pinned_every: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let sizes = parse_sizes(&sizes_str)?;
    let limit = config.parse_limit()?;
    let window = window.max(1);
    let pinned_every = pinned_every.filter(|&n| n > 0);

    let mut cache = config.build(HostAllocator::new())?;
    let mut on_loan = VecDeque::with_capacity(window + 1);
    let mut pins: Vec<BufferHandle> = Vec::new();
    let mut max_overrun_bytes = 0usize;

    let start = Instant::now();

    for i in 0..buffers {
        let size = sizes[i % sizes.len()];
        let buf = cache.allocate(i % 2 == 0, DType::U8, size, Location::Host)?;

        if pinned_every.is_some_and(|n| i % n == 0) {
            let handle = buf.handle();
            handle.retain();
            pins.push(handle);
        }

        on_loan.push_back(buf);
        if on_loan.len() > window {
            if let Some(oldest) = on_loan.pop_front() {
                cache.release(oldest)?;
            }
        }

        let over = cache
            .current_cache_bytes()
            .saturating_sub(cache.max_cache_bytes());
        max_overrun_bytes = max_overrun_bytes.max(over);
    }

    for buf in on_loan.drain(..) {
        cache.release(buf)?;
    }

    // Drop the external pins, then let one more enforcement pass settle.
    for handle in &pins {
        handle.release();
    }
    cache.set_max_cache_bytes(cache.max_cache_bytes());

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let report = SimulationReport {
        max_cache_bytes: limit.to_string(),
        buffers,
        sizes,
        window,
        pinned_every,
        final_cached_bytes: cache.current_cache_bytes(),
        final_entries: cache.cache_entry_count(),
        size_classes: cache.size_class_count(),
        max_overrun_bytes,
        elapsed_ms,
        stats: cache.stats(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report, limit);
    Ok(())
}

fn print_report(report: &SimulationReport, limit: CacheLimit) {
    let stats = &report.stats;

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           array-cache · Simulation                   ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
    println!("  Ceiling:        {limit}");
    println!("  Buffers:        {}", report.buffers);
    println!("  Sizes (bytes):  {:?}", report.sizes);
    println!("  Loan window:    {}", report.window);
    match report.pinned_every {
        Some(n) => println!("  Pinned:         every {n}th buffer"),
        None => println!("  Pinned:         none"),
    }
    println!();

    // ── Results ────────────────────────────────────────────────
    println!("  {:<24} {:>14}", "Metric", "Value");
    println!("  {}", "-".repeat(40));
    println!("  {:<24} {:>14}", "allocations", stats.total_allocations);
    println!("  {:<24} {:>14}", "cache hits", stats.cache_hits);
    println!("  {:<24} {:>14}", "cache misses", stats.cache_misses);
    println!("  {:<24} {:>13.1}%", "hit rate", stats.hit_ratio() * 100.0);
    println!("  {:<24} {:>14}", "releases", stats.releases);
    println!("  {:<24} {:>14}", "evictions", stats.evictions);
    println!("  {:<24} {:>14}", "evicted bytes", stats.evicted_bytes);
    println!("  {:<24} {:>14}", "pinned skips", stats.pinned_skips);
    println!("  {:<24} {:>14}", "peak cached bytes", stats.peak_cached_bytes);
    println!("  {:<24} {:>14}", "max overrun bytes", report.max_overrun_bytes);
    println!("  {:<24} {:>14}", "final cached bytes", report.final_cached_bytes);
    println!("  {:<24} {:>14}", "final entries", report.final_entries);
    println!("  {:<24} {:>14}", "size classes", report.size_classes);
    println!("  {:<24} {:>12.2}ms", "elapsed", report.elapsed_ms);
    println!();

    if report.max_overrun_bytes > 0 {
        println!("  Note: pinned buffers held the cache above its ceiling at times.");
        println!();
    }
}

/// Parses `"64,256,4K"` into byte sizes. Zero and unbounded sizes are rejected.
fn parse_sizes(s: &str) -> anyhow::Result<Vec<usize>> {
    let sizes = s
        .split(',')
        .map(|part| {
            let part = part.trim();
            let limit = CacheLimit::parse(part)
                .map_err(|e| anyhow::anyhow!("invalid size '{part}': {e}"))?;
            anyhow::ensure!(
                !limit.is_disabled() && !limit.is_unbounded(),
                "buffer size '{part}' must be a positive byte count"
            );
            Ok(limit.as_bytes())
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    anyhow::ensure!(!sizes.is_empty(), "at least one buffer size is required");
    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sizes() {
        assert_eq!(parse_sizes("64, 256,4K").unwrap(), vec![64, 256, 4096]);
    }

    #[test]
    fn test_parse_sizes_rejects_zero_and_garbage() {
        assert!(parse_sizes("64,0").is_err());
        assert!(parse_sizes("unbounded").is_err());
        assert!(parse_sizes("big").is_err());
    }
}
