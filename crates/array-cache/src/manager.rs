// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The allocation facade: cache hits and raw allocation behind one entry point.
//!
//! [`ArrayCacheManager`] is the central component. It:
//!
//! 1. Serves `allocate` from the [`SizeClassDirectory`] when a buffer of the
//!    exact byte size and location was released earlier, and falls back to
//!    the raw allocator otherwise.
//! 2. Parks released buffers and enforces the byte ceiling after every
//!    release, closing the oldest unreferenced buffers first.
//! 3. Tracks [`CacheStats`] for tuning.
//!
//! # Buffer lifecycle
//! ```text
//!   Allocated(external) ──release──► Released(cached) ──allocate hit──► Reused(external)
//!                                          │
//!                                          └──eviction──► Closed (terminal)
//! ```
//!
//! # Thread Safety
//! Every mutating operation takes `&mut self`. Wrap the manager in a
//! [`SharedArrayCache`](crate::SharedArrayCache) to share it between threads.
//!
//! # Release and reference counts
//! `release` never looks at the reference count: a pinned buffer is accepted
//! into the cache and only protected from *eviction*. A later `allocate`
//! may still hand it out again.

use crate::directory::SizeClassDirectory;
use crate::eviction::{self, EvictionReport};
use crate::{CacheError, CacheLimit, CacheStats, ReleaseError};
use buffer_core::{BufferId, CacheableBuffer, DType, Location, RawAllocator, SizeClass};

/// Size-classed reuse cache in front of a [`RawAllocator`].
///
/// # Example
/// ```
/// use array_cache::{ArrayCacheManager, CacheLimit};
/// use buffer_core::{CacheableBuffer, DType, HostAllocator, Location};
///
/// let mut cache = ArrayCacheManager::new(HostAllocator::new(), CacheLimit::from_bytes(1000));
///
/// let buf = cache.allocate(true, DType::F32, 25, Location::Host).unwrap();
/// let id = buf.id();
/// cache.release(buf).unwrap();
/// assert_eq!(cache.current_cache_bytes(), 100);
///
/// // Same byte size and location: served from the cache.
/// let again = cache.allocate(false, DType::F32, 25, Location::Host).unwrap();
/// assert_eq!(again.id(), id);
/// assert_eq!(cache.current_cache_bytes(), 0);
/// ```
pub struct ArrayCacheManager<A: RawAllocator> {
    allocator: A,
    directory: SizeClassDirectory<A::Buffer>,
    max_cache_bytes: usize,
    evict_on_exhaustion: bool,
    stats: CacheStats,
}

impl<A: RawAllocator> ArrayCacheManager<A> {
    /// Creates a cache in front of `allocator` with the given ceiling.
    pub fn new(allocator: A, limit: CacheLimit) -> Self {
        tracing::info!("array cache created: max {limit}");
        Self {
            allocator,
            directory: SizeClassDirectory::new(),
            max_cache_bytes: limit.as_bytes(),
            evict_on_exhaustion: false,
            stats: CacheStats::default(),
        }
    }

    /// When enabled, a raw allocation that fails with exhaustion on a miss is
    /// retried once after closing every unreferenced cached buffer.
    pub fn with_evict_on_exhaustion(mut self, enabled: bool) -> Self {
        self.evict_on_exhaustion = enabled;
        self
    }

    /// Returns a buffer for `element_count` elements of `data_type`.
    ///
    /// On a hit the reused buffer is retagged with `data_type`; its contents
    /// are stale unless `zeroed` is set. On a miss the raw allocator is asked
    /// for exactly the computed byte size, and its error is returned
    /// unchanged if it fails.
    pub fn allocate(
        &mut self,
        zeroed: bool,
        data_type: DType,
        element_count: usize,
        location: Location,
    ) -> Result<A::Buffer, CacheError> {
        let byte_size = data_type
            .byte_size_of(element_count)
            .ok_or(CacheError::SizeOverflow {
                data_type,
                element_count,
            })?;
        let size_class = SizeClass::new(byte_size, location);

        if let Some(mut buffer) = self.directory.take(size_class) {
            self.stats.record_hit(byte_size);
            buffer.set_data_type(data_type);
            if zeroed {
                self.allocator.zero(&mut buffer);
            }
            return Ok(buffer);
        }

        self.stats.record_miss(byte_size);
        tracing::debug!("cache miss for {size_class}");

        match self.allocator.allocate(byte_size, data_type, location, zeroed) {
            Ok(buffer) => Ok(buffer),
            Err(e) if e.is_exhaustion() && self.evict_on_exhaustion && !self.directory.is_empty() => {
                let report = eviction::evict_unreferenced(&mut self.directory, &mut self.allocator);
                self.record(report);
                tracing::debug!(
                    "raw allocator exhausted for {size_class}; purged {} cached buffers ({} bytes) and retrying",
                    report.closed,
                    report.closed_bytes,
                );
                self.allocator
                    .allocate(byte_size, data_type, location, zeroed)
                    .map_err(|e| {
                        self.stats.record_allocator_failure();
                        CacheError::from(e)
                    })
            }
            Err(e) => {
                self.stats.record_allocator_failure();
                Err(e.into())
            }
        }
    }

    /// Returns `buffer` to the cache, then enforces the byte ceiling.
    ///
    /// Rejects buffers this cache's allocator did not produce and buffers
    /// that are already cached. A rejected buffer comes back inside the
    /// [`ReleaseError`] untouched; the cache neither closes nor drops it.
    pub fn release(&mut self, buffer: A::Buffer) -> Result<(), ReleaseError<A::Buffer>> {
        if !self.allocator.owns(&buffer) {
            let id = buffer.id();
            self.stats.record_rejected_release();
            tracing::warn!("rejected release of foreign buffer {id}");
            return Err(ReleaseError::new(buffer, CacheError::ForeignBuffer { id }));
        }

        if let Err(rejected) = self.directory.insert(buffer) {
            self.stats.record_rejected_release();
            tracing::warn!("{rejected}");
            return Err(rejected);
        }
        self.stats.record_release();

        self.enforce_ceiling();
        Ok(())
    }

    /// Closes every cached buffer whose reference count is zero, regardless
    /// of the ceiling. Returns the number of buffers closed.
    pub fn purge(&mut self) -> usize {
        let report = eviction::evict_unreferenced(&mut self.directory, &mut self.allocator);
        self.record(report);
        tracing::debug!(
            "purged {} cached buffers ({} bytes); {} pinned remain",
            report.closed,
            report.closed_bytes,
            report.pinned_skipped,
        );
        report.closed
    }

    /// Bytes currently held by the cache.
    pub fn current_cache_bytes(&self) -> usize {
        self.directory.cached_bytes()
    }

    /// Number of buffers currently held by the cache.
    pub fn cache_entry_count(&self) -> usize {
        self.directory.len()
    }

    /// The configured byte ceiling.
    pub fn max_cache_bytes(&self) -> usize {
        self.max_cache_bytes
    }

    /// Changes the byte ceiling and evicts down to it immediately.
    pub fn set_max_cache_bytes(&mut self, max_cache_bytes: usize) {
        self.max_cache_bytes = max_cache_bytes;
        self.enforce_ceiling();
    }

    /// Number of distinct size classes with at least one cached buffer.
    pub fn size_class_count(&self) -> usize {
        self.directory.class_count()
    }

    /// Number of buffers cached under `size_class`.
    pub fn cached_in_class(&self, size_class: SizeClass) -> usize {
        self.directory.class_len(size_class)
    }

    /// Returns `true` if the buffer with identity `id` is currently cached.
    pub fn contains(&self, id: BufferId) -> bool {
        self.directory.contains(id)
    }

    /// Returns `true` if cached bytes exceed the ceiling because every
    /// remaining candidate is pinned.
    pub fn is_over_ceiling(&self) -> bool {
        self.current_cache_bytes() > self.max_cache_bytes
    }

    /// Returns a snapshot of cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    /// The raw allocator behind the cache.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Mutable access to the raw allocator, e.g. to create buffers that
    /// bypass the cache but may later be released into it.
    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    fn enforce_ceiling(&mut self) {
        let report = eviction::enforce_ceiling(
            &mut self.directory,
            &mut self.allocator,
            self.max_cache_bytes,
        );
        self.record(report);
    }

    fn record(&mut self, report: EvictionReport) {
        self.stats
            .record_eviction(report.closed, report.closed_bytes, report.pinned_skipped);
        self.stats.update_peak(self.directory.cached_bytes());
    }
}

impl<A: RawAllocator> Drop for ArrayCacheManager<A> {
    fn drop(&mut self) {
        if self.directory.is_empty() {
            return;
        }
        self.purge();
        if !self.directory.is_empty() {
            tracing::debug!(
                "dropping array cache with {} pinned buffers ({} bytes) left to their owners",
                self.directory.len(),
                self.directory.cached_bytes(),
            );
        }
    }
}

impl<A: RawAllocator> std::fmt::Debug for ArrayCacheManager<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayCacheManager")
            .field("max_cache_bytes", &self.max_cache_bytes)
            .field("cached_bytes", &self.current_cache_bytes())
            .field("entries", &self.cache_entry_count())
            .field("size_classes", &self.size_class_count())
            .finish()
    }
}
