// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Capability traits for cacheable buffers and the raw allocator behind them.
//!
//! ```text
//!   RawAllocator::allocate ──► Buffer ──► application
//!                                 │
//!                                 │  release
//!                                 ▼
//!                             array cache ──► RawAllocator::close
//! ```
//!
//! The cache reads [`HasReferenceCount::reference_count`] but never changes
//! it; whoever shares a buffer (control flow, views, loop-carried values)
//! maintains the count.

use crate::{AllocError, DType, Location, SizeClass};
use std::fmt;

/// Stable identity of a buffer, unique within the allocator that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct BufferId(pub u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf#{}", self.0)
    }
}

/// Read-only access to an externally maintained reference count.
///
/// A count of zero means no logical user holds the buffer and the cache
/// may close it.
pub trait HasReferenceCount {
    /// Returns the current number of external users.
    fn reference_count(&self) -> usize;
}

/// A buffer handle the array cache can pool.
pub trait CacheableBuffer: HasReferenceCount {
    /// Stable identity used for double-release detection.
    fn id(&self) -> BufferId;

    /// Length of the underlying region in bytes.
    fn byte_len(&self) -> usize;

    /// The dtype the buffer is currently tagged with.
    fn data_type(&self) -> DType;

    /// Where the buffer's memory lives.
    fn location(&self) -> Location;

    /// Retags the buffer when it is reused for a request of another dtype
    /// with the same byte size.
    fn set_data_type(&mut self, data_type: DType);

    /// The size class this buffer pools under.
    fn size_class(&self) -> SizeClass {
        SizeClass::new(self.byte_len(), self.location())
    }
}

/// The expensive allocator the cache sits in front of.
pub trait RawAllocator {
    /// The buffer type this allocator hands out.
    type Buffer: CacheableBuffer;

    /// Allocates a fresh buffer of exactly `byte_size` bytes.
    fn allocate(
        &mut self,
        byte_size: usize,
        data_type: DType,
        location: Location,
        zeroed: bool,
    ) -> Result<Self::Buffer, AllocError>;

    /// Clears the contents of a reused buffer.
    fn zero(&mut self, buffer: &mut Self::Buffer);

    /// Frees a buffer. The buffer must not be used afterwards.
    fn close(&mut self, buffer: Self::Buffer);

    /// Returns `true` if `buffer` was produced by this allocator.
    fn owns(&self, buffer: &Self::Buffer) -> bool;
}
