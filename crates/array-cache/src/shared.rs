// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Thread-safe handle to an [`ArrayCacheManager`].
//!
//! Each public operation takes the lock exactly once, so size-class lookup,
//! collection mutation, byte accounting, and eviction happen as one unit.
//! The order in which releases acquire the lock is the release order the
//! eviction controller sees.

use crate::{ArrayCacheManager, CacheError, CachedArray, CacheStats, ReleaseError};
use buffer_core::{DType, Location, RawAllocator};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A cloneable, `Send + Sync` handle to one cache instance.
///
/// # Example
/// ```
/// use array_cache::{ArrayCacheManager, CacheLimit, SharedArrayCache};
/// use buffer_core::{DType, HostAllocator, Location};
///
/// let cache = SharedArrayCache::new(ArrayCacheManager::new(
///     HostAllocator::new(),
///     CacheLimit::from_mb(1),
/// ));
///
/// let loan = cache.loan(true, DType::F32, 256, Location::Host).unwrap();
/// assert_eq!(cache.current_cache_bytes().unwrap(), 0);
///
/// drop(loan); // returned to the cache
/// assert_eq!(cache.current_cache_bytes().unwrap(), 1024);
/// ```
pub struct SharedArrayCache<A: RawAllocator> {
    inner: Arc<Mutex<ArrayCacheManager<A>>>,
}

impl<A: RawAllocator> SharedArrayCache<A> {
    /// Wraps a manager for shared use.
    pub fn new(manager: ArrayCacheManager<A>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    /// See [`ArrayCacheManager::allocate`].
    pub fn allocate(
        &self,
        zeroed: bool,
        data_type: DType,
        element_count: usize,
        location: Location,
    ) -> Result<A::Buffer, CacheError> {
        self.lock()?.allocate(zeroed, data_type, element_count, location)
    }

    /// See [`ArrayCacheManager::release`]. A poisoned lock also hands the
    /// buffer back inside the [`ReleaseError`].
    pub fn release(&self, buffer: A::Buffer) -> Result<(), ReleaseError<A::Buffer>> {
        match self.lock() {
            Ok(mut manager) => manager.release(buffer),
            Err(error) => Err(ReleaseError::new(buffer, error)),
        }
    }

    /// Allocates a buffer wrapped in a guard that releases it on drop.
    pub fn loan(
        &self,
        zeroed: bool,
        data_type: DType,
        element_count: usize,
        location: Location,
    ) -> Result<CachedArray<A>, CacheError> {
        let buffer = self.allocate(zeroed, data_type, element_count, location)?;
        Ok(CachedArray::new(buffer, self.clone()))
    }

    /// Runs `f` with exclusive access to the manager.
    ///
    /// # Deadlocks
    /// The lock is held while `f` runs and is not reentrant. Calling any
    /// other method of this handle (or a clone of it) inside `f` deadlocks,
    /// and so does dropping a [`CachedArray`] there, since its `Drop`
    /// releases through the same lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut ArrayCacheManager<A>) -> R) -> Result<R, CacheError> {
        let mut manager = self.lock()?;
        Ok(f(&mut manager))
    }

    /// See [`ArrayCacheManager::current_cache_bytes`].
    pub fn current_cache_bytes(&self) -> Result<usize, CacheError> {
        self.with(|m| m.current_cache_bytes())
    }

    /// See [`ArrayCacheManager::cache_entry_count`].
    pub fn cache_entry_count(&self) -> Result<usize, CacheError> {
        self.with(|m| m.cache_entry_count())
    }

    /// See [`ArrayCacheManager::set_max_cache_bytes`].
    pub fn set_max_cache_bytes(&self, max_cache_bytes: usize) -> Result<(), CacheError> {
        self.with(|m| m.set_max_cache_bytes(max_cache_bytes))
    }

    /// See [`ArrayCacheManager::stats`].
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        self.with(|m| m.stats())
    }

    /// Closes `buffer` through the allocator, recovering the manager from a
    /// poisoned lock if necessary.
    pub(crate) fn close_rejected(&self, buffer: A::Buffer) {
        let mut manager = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        manager.allocator_mut().close(buffer);
    }

    fn lock(&self) -> Result<MutexGuard<'_, ArrayCacheManager<A>>, CacheError> {
        self.inner.lock().map_err(|_| CacheError::Poisoned)
    }
}

impl<A: RawAllocator> Clone for SharedArrayCache<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: RawAllocator> std::fmt::Debug for SharedArrayCache<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Ok(manager) => f.debug_tuple("SharedArrayCache").field(&*manager).finish(),
            Err(_) => f.write_str("SharedArrayCache(<locked>)"),
        }
    }
}
