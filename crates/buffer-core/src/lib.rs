// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # buffer-core
//!
//! The collaborator contracts the array cache is built against.
//!
//! This crate provides:
//! - [`DType`]: supported element data types and the byte-size computation
//!   `(dtype, element_count) → bytes`.
//! - [`Location`] and [`SizeClass`]: where a buffer lives, and the key under
//!   which interchangeable buffers are pooled.
//! - [`CacheableBuffer`] / [`HasReferenceCount`]: the capabilities a buffer
//!   handle must expose to be cached.
//! - [`RawAllocator`]: the expensive allocator the cache sits in front of.
//! - [`HostAllocator`]: a heap-backed reference allocator whose buffers carry
//!   an observable [`BufferHandle`] (reference count + closed flag).
//!
//! # Design Goals
//! - The cache never owns reference counting: it only *reads* the count.
//! - Buffer identity ([`BufferId`]) is stable for the lifetime of a buffer,
//!   so double releases can be detected without comparing addresses.
//! - Clean error types via `thiserror`.

mod buffer;
mod dtype;
mod error;
mod host;
mod location;

pub use buffer::{BufferId, CacheableBuffer, HasReferenceCount, RawAllocator};
pub use dtype::DType;
pub use error::AllocError;
pub use host::{BufferHandle, HostAllocator, HostBuffer};
pub use location::{Location, SizeClass};
