// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cache statistics for profiling and diagnostics.
//!
//! [`CacheStats`] tracks cumulative metrics about how the cache is being
//! used: hit rates, eviction volume, pinned skips, and allocator failures.
//! These are the numbers to look at when tuning the byte ceiling.

/// Cumulative statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Total number of allocation requests.
    pub total_allocations: u64,
    /// Allocations served from the cache.
    pub cache_hits: u64,
    /// Allocations that went to the raw allocator.
    pub cache_misses: u64,
    /// Buffers accepted into the cache.
    pub releases: u64,
    /// Releases rejected as contract violations.
    pub rejected_releases: u64,
    /// Buffers closed by eviction or purge.
    pub evictions: u64,
    /// Bytes reclaimed by eviction or purge.
    pub evicted_bytes: u64,
    /// Times a pinned buffer was passed over during eviction.
    pub pinned_skips: u64,
    /// Raw allocations that failed on a miss.
    pub allocator_failures: u64,
    /// Highest cached byte count observed after an eviction pass.
    pub peak_cached_bytes: usize,
    /// Total bytes handed out, from either path.
    pub cumulative_allocated_bytes: u64,
}

impl CacheStats {
    /// Returns the cache hit ratio as a fraction in `[0.0, 1.0]`.
    ///
    /// Returns `0.0` if no allocations have been made.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / total as f64
    }

    pub(crate) fn record_hit(&mut self, size: usize) {
        self.total_allocations += 1;
        self.cache_hits += 1;
        self.cumulative_allocated_bytes += size as u64;
    }

    pub(crate) fn record_miss(&mut self, size: usize) {
        self.total_allocations += 1;
        self.cache_misses += 1;
        self.cumulative_allocated_bytes += size as u64;
    }

    pub(crate) fn record_allocator_failure(&mut self) {
        self.allocator_failures += 1;
    }

    pub(crate) fn record_release(&mut self) {
        self.releases += 1;
    }

    pub(crate) fn record_rejected_release(&mut self) {
        self.rejected_releases += 1;
    }

    pub(crate) fn record_eviction(&mut self, closed: usize, closed_bytes: usize, pinned_skipped: usize) {
        self.evictions += closed as u64;
        self.evicted_bytes += closed_bytes as u64;
        self.pinned_skips += pinned_skipped as u64;
    }

    /// Updates the cached-bytes high-water mark if needed.
    pub(crate) fn update_peak(&mut self, cached_bytes: usize) {
        if cached_bytes > self.peak_cached_bytes {
            self.peak_cached_bytes = cached_bytes;
        }
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let peak_mb = self.peak_cached_bytes as f64 / (1024.0 * 1024.0);
        format!(
            "Allocations: {} total ({} hits, {} misses, {:.0}% hit rate), \
             {} releases ({} rejected), {} evictions ({} bytes, {} pinned skips), \
             {} allocator failures, peak cached {:.2} MB",
            self.total_allocations,
            self.cache_hits,
            self.cache_misses,
            self.hit_ratio() * 100.0,
            self.releases,
            self.rejected_releases,
            self.evictions,
            self.evicted_bytes,
            self.pinned_skips,
            self.allocator_failures,
            peak_mb,
        )
    }
}
