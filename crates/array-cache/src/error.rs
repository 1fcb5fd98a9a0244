// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the array cache.

use buffer_core::{AllocError, BufferId, DType, Location};

/// Errors that can occur while allocating from or releasing into the cache.
///
/// `DoubleRelease` and `ForeignBuffer` are contract violations: the caller
/// has a bookkeeping bug. A capacity overrun caused by reference-pinned
/// buffers is *not* an error and never appears here.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The buffer is already cached.
    #[error("release rejected: {id} ({byte_size} bytes on {location}) is already in the cache")]
    DoubleRelease {
        id: BufferId,
        byte_size: usize,
        location: Location,
    },

    /// The buffer was not produced by this cache's allocator.
    #[error("release rejected: {id} was not allocated by this cache's allocator")]
    ForeignBuffer { id: BufferId },

    /// The requested element count does not fit in `usize` bytes.
    #[error("allocation of {element_count} x {data_type} overflows the addressable byte size")]
    SizeOverflow {
        data_type: DType,
        element_count: usize,
    },

    /// The raw allocator failed on a cache miss.
    #[error("raw allocation failed: {0}")]
    Allocator(#[from] AllocError),

    /// A cache byte limit string could not be parsed.
    #[error("invalid cache limit: {0}")]
    InvalidLimit(String),

    /// Configuration could not be read, parsed, or serialised.
    #[error("configuration error: {0}")]
    Config(String),

    /// A thread panicked while holding the shared cache lock.
    #[error("shared cache lock poisoned")]
    Poisoned,
}

/// A release the cache refused, carrying the buffer back to the caller.
///
/// The cache never closes or drops a buffer it did not accept, so the
/// caller stays responsible for it: hand it to its real owner, retry once
/// the lock is healthy, or close it.
///
/// # Example
/// ```
/// use array_cache::{ArrayCacheManager, CacheError, CacheLimit};
/// use buffer_core::{DType, HostAllocator, Location, RawAllocator};
///
/// let mut cache = ArrayCacheManager::new(HostAllocator::new(), CacheLimit::from_mb(1));
/// let mut other = HostAllocator::new();
/// let foreign = other.allocate(16, DType::U8, Location::Host, false).unwrap();
///
/// let rejected = cache.release(foreign).unwrap_err();
/// assert!(matches!(rejected.error, CacheError::ForeignBuffer { .. }));
///
/// // The owner can still free it.
/// other.close(rejected.buffer);
/// assert_eq!(other.live_bytes(), 0);
/// ```
pub struct ReleaseError<B> {
    /// The buffer that was not accepted.
    pub buffer: B,
    /// Why it was not accepted.
    pub error: CacheError,
}

impl<B> ReleaseError<B> {
    pub(crate) fn new(buffer: B, error: CacheError) -> Self {
        Self { buffer, error }
    }

    /// Splits the rejection into the returned buffer and the reason.
    pub fn into_parts(self) -> (B, CacheError) {
        (self.buffer, self.error)
    }
}

impl<B> std::fmt::Debug for ReleaseError<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<B> std::fmt::Display for ReleaseError<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.error, f)
    }
}

impl<B> std::error::Error for ReleaseError<B> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

impl<B> From<ReleaseError<B>> for CacheError {
    fn from(rejected: ReleaseError<B>) -> Self {
        rejected.error
    }
}
