// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Eviction controller: enforces the byte ceiling with a reference-count veto.
//!
//! Candidates are visited in global release order (oldest first). A buffer
//! whose external reference count is nonzero is skipped and stays cached;
//! everything else is closed through the raw allocator until the cached
//! bytes fit under the ceiling. When only pinned buffers remain the cache
//! is allowed to stay over budget.

use crate::directory::SizeClassDirectory;
use buffer_core::{CacheableBuffer, HasReferenceCount, RawAllocator};

/// What one eviction pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct EvictionReport {
    /// Buffers closed.
    pub closed: usize,
    /// Bytes reclaimed.
    pub closed_bytes: usize,
    /// Pinned buffers visited and left in place.
    pub pinned_skipped: usize,
}

/// Closes the oldest unreferenced buffers until `cached_bytes <= max_bytes`.
///
/// A ceiling of zero means caching is disabled: every unreferenced entry is
/// closed, zero-byte buffers included.
pub(crate) fn enforce_ceiling<A: RawAllocator>(
    directory: &mut SizeClassDirectory<A::Buffer>,
    allocator: &mut A,
    max_bytes: usize,
) -> EvictionReport {
    if max_bytes == 0 {
        let report = evict_unreferenced(directory, allocator);
        if !directory.is_empty() {
            tracing::debug!(
                "caching disabled but {} pinned buffers ({} bytes) stay cached",
                directory.len(),
                directory.cached_bytes(),
            );
        }
        return report;
    }

    let cached = directory.cached_bytes();
    if cached <= max_bytes {
        return EvictionReport::default();
    }

    let mut excess = cached - max_bytes;
    let mut victims = Vec::new();
    let mut pinned_skipped = 0;

    for (seq, buffer) in directory.iter_oldest_first() {
        if excess == 0 {
            break;
        }
        if buffer.reference_count() > 0 {
            pinned_skipped += 1;
            continue;
        }
        victims.push(seq);
        excess = excess.saturating_sub(buffer.byte_len());
    }

    let mut report = close_all(directory, allocator, &victims);
    report.pinned_skipped = pinned_skipped;

    if directory.cached_bytes() > max_bytes {
        tracing::debug!(
            "cache over ceiling after eviction: {} cached, {} max, {} pinned buffers skipped",
            directory.cached_bytes(),
            max_bytes,
            pinned_skipped,
        );
    }

    report
}

/// Closes every unreferenced buffer regardless of the ceiling.
pub(crate) fn evict_unreferenced<A: RawAllocator>(
    directory: &mut SizeClassDirectory<A::Buffer>,
    allocator: &mut A,
) -> EvictionReport {
    let mut victims = Vec::new();
    let mut pinned_skipped = 0;

    for (seq, buffer) in directory.iter_oldest_first() {
        if buffer.reference_count() > 0 {
            pinned_skipped += 1;
        } else {
            victims.push(seq);
        }
    }

    let mut report = close_all(directory, allocator, &victims);
    report.pinned_skipped = pinned_skipped;
    report
}

fn close_all<A: RawAllocator>(
    directory: &mut SizeClassDirectory<A::Buffer>,
    allocator: &mut A,
    victims: &[u64],
) -> EvictionReport {
    let mut report = EvictionReport::default();
    for &seq in victims {
        if let Some(buffer) = directory.remove(seq) {
            tracing::debug!(
                "evicting {} ({})",
                buffer.id(),
                buffer.size_class(),
            );
            report.closed += 1;
            report.closed_bytes += buffer.byte_len();
            allocator.close(buffer);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use buffer_core::{BufferHandle, DType, HostAllocator, HostBuffer, Location};

    fn fill(
        alloc: &mut HostAllocator,
        dir: &mut SizeClassDirectory<HostBuffer>,
        sizes: &[usize],
    ) -> Vec<BufferHandle> {
        sizes
            .iter()
            .map(|&bytes| {
                let buf = alloc.allocate(bytes, DType::U8, Location::Host, false).unwrap();
                let handle = buf.handle();
                dir.insert(buf).unwrap();
                handle
            })
            .collect()
    }

    #[test]
    fn test_under_ceiling_is_noop() {
        let mut alloc = HostAllocator::new();
        let mut dir = SizeClassDirectory::new();
        fill(&mut alloc, &mut dir, &[100, 100]);

        let report = enforce_ceiling(&mut dir, &mut alloc, 200);
        assert_eq!(report, EvictionReport::default());
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn test_evicts_oldest_first_across_classes() {
        let mut alloc = HostAllocator::new();
        let mut dir = SizeClassDirectory::new();
        let handles = fill(&mut alloc, &mut dir, &[100, 300, 100, 50]);

        // 550 cached, ceiling 300: closing the 100 and the 300 leaves 150.
        let report = enforce_ceiling(&mut dir, &mut alloc, 300);
        assert_eq!(report.closed, 2);
        assert_eq!(report.closed_bytes, 400);
        assert!(handles[0].is_closed());
        assert!(handles[1].is_closed());
        assert!(!handles[2].is_closed());
        assert!(!handles[3].is_closed());
        assert_eq!(dir.cached_bytes(), 150);
    }

    #[test]
    fn test_pinned_buffers_are_skipped() {
        let mut alloc = HostAllocator::new();
        let mut dir = SizeClassDirectory::new();
        let handles = fill(&mut alloc, &mut dir, &[100, 100, 100, 100]);
        handles[0].retain();
        handles[1].retain();

        let report = enforce_ceiling(&mut dir, &mut alloc, 300);
        assert_eq!(report.closed, 1);
        assert_eq!(report.pinned_skipped, 2);
        assert!(!handles[0].is_closed());
        assert!(!handles[1].is_closed());
        assert!(handles[2].is_closed());
        assert!(!handles[3].is_closed());
    }

    #[test]
    fn test_all_pinned_leaves_cache_over_ceiling() {
        let mut alloc = HostAllocator::new();
        let mut dir = SizeClassDirectory::new();
        let handles = fill(&mut alloc, &mut dir, &[100, 100]);
        for h in &handles {
            h.retain();
        }

        let report = enforce_ceiling(&mut dir, &mut alloc, 0);
        assert_eq!(report.closed, 0);
        assert_eq!(report.pinned_skipped, 2);
        assert_eq!(dir.cached_bytes(), 200);
        assert!(handles.iter().all(|h| !h.is_closed()));
    }

    #[test]
    fn test_zero_ceiling_closes_zero_byte_buffers() {
        let mut alloc = HostAllocator::new();
        let mut dir = SizeClassDirectory::new();
        let handles = fill(&mut alloc, &mut dir, &[0, 0, 0]);
        handles[1].retain();

        let report = enforce_ceiling(&mut dir, &mut alloc, 0);
        assert_eq!(report.closed, 2);
        assert_eq!(report.closed_bytes, 0);
        assert_eq!(report.pinned_skipped, 1);
        assert_eq!(dir.len(), 1);
        assert!(handles[0].is_closed());
        assert!(!handles[1].is_closed());
        assert!(handles[2].is_closed());
    }

    #[test]
    fn test_evict_unreferenced_ignores_ceiling() {
        let mut alloc = HostAllocator::new();
        let mut dir = SizeClassDirectory::new();
        let handles = fill(&mut alloc, &mut dir, &[10, 20, 30]);
        handles[1].retain();

        let report = evict_unreferenced(&mut dir, &mut alloc);
        assert_eq!(report.closed, 2);
        assert_eq!(report.closed_bytes, 40);
        assert_eq!(report.pinned_skipped, 1);
        assert_eq!(dir.len(), 1);
        assert!(dir.contains(handles[1].id()));
        assert_eq!(alloc.live_bytes(), 20);
    }
}
