// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII loan that returns its buffer to the shared cache on drop.
//!
//! [`CachedArray`] is the ownership-driven way to use a
//! [`SharedArrayCache`]: the buffer cannot be released twice because the
//! guard owns it, and it cannot be forgotten because `Drop` releases it.
//! Call [`CachedArray::into_inner`] to take the buffer out of the cache's
//! custody for good.
//!
//! If the shared lock is poisoned when the guard drops, the buffer cannot be
//! cached and is closed through the allocator instead.

use crate::{CacheError, SharedArrayCache};
use buffer_core::{CacheableBuffer, RawAllocator};
use std::ops::{Deref, DerefMut};

/// A buffer on loan from a [`SharedArrayCache`].
///
/// Dereferences to the underlying buffer.
///
/// # Example
/// ```ignore
/// let loan = cache.loan(true, DType::F32, 1024, Location::Host)?;
/// loan.as_slice();           // use the buffer
/// drop(loan);                // buffer released to the cache
/// ```
pub struct CachedArray<A: RawAllocator> {
    /// Wrapped in `Option` so `drop()` and `into_inner()` can take it.
    buffer: Option<A::Buffer>,
    cache: SharedArrayCache<A>,
}

impl<A: RawAllocator> CachedArray<A> {
    pub(crate) fn new(buffer: A::Buffer, cache: SharedArrayCache<A>) -> Self {
        Self {
            buffer: Some(buffer),
            cache,
        }
    }

    /// Takes the buffer out of the guard; it will not be released on drop.
    pub fn into_inner(mut self) -> A::Buffer {
        self.buffer.take().expect("buffer already consumed")
    }
}

impl<A: RawAllocator> Deref for CachedArray<A> {
    type Target = A::Buffer;

    fn deref(&self) -> &A::Buffer {
        self.buffer.as_ref().expect("buffer already consumed")
    }
}

impl<A: RawAllocator> DerefMut for CachedArray<A> {
    fn deref_mut(&mut self) -> &mut A::Buffer {
        self.buffer.as_mut().expect("buffer already consumed")
    }
}

impl<A: RawAllocator> Drop for CachedArray<A> {
    fn drop(&mut self) {
        let Some(buffer) = self.buffer.take() else {
            return;
        };
        let Err(rejected) = self.cache.release(buffer) else {
            return;
        };
        match rejected.into_parts() {
            (buffer, CacheError::Poisoned) => {
                tracing::warn!("shared cache lock poisoned; closing loaned buffer instead of caching it");
                self.cache.close_rejected(buffer);
            }
            // Only reachable if a foreign or aliased buffer was swapped in
            // through `DerefMut`; closing it here would free memory this
            // cache does not own.
            (_, e) => tracing::warn!("failed to return loaned buffer to cache: {e}"),
        }
    }
}

impl<A: RawAllocator> std::fmt::Debug for CachedArray<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("CachedArray");
        if let Some(buffer) = &self.buffer {
            s.field("id", &buffer.id()).field("byte_len", &buffer.byte_len());
        }
        s.finish()
    }
}
