// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # array-cache
//!
//! A reuse cache for array buffers whose allocations are expensive (device
//! memory, pinned host memory, large heap blocks). Released buffers are kept,
//! indexed by exact byte size and location, and handed back on the next
//! matching request instead of going to the raw allocator again.
//!
//! # Key Components
//!
//! - [`ArrayCacheManager`]: the facade: `allocate` / `release`, byte
//!   ceiling, statistics.
//! - [`SizeClassDirectory`]: per-size-class LIFO stacks plus a global
//!   release-order index over the same entries.
//! - Eviction: closes the oldest cached buffers whose external reference
//!   count is zero until the ceiling holds. Pinned buffers are never closed,
//!   so the ceiling is a soft bound.
//! - [`CacheLimit`] / [`CacheConfig`]: human-readable ceiling and TOML
//!   configuration.
//! - [`SharedArrayCache`] / [`CachedArray`]: a mutex-wrapped handle for
//!   multi-threaded use and an RAII loan that releases on drop.
//! - [`CacheStats`]: cumulative hit/miss/eviction metrics.
//!
//! # Data Flow
//!
//! ```text
//!   allocate(zeroed, dtype, n, loc)
//!         │  byte size = n × dtype size
//!         ▼
//!   SizeClassDirectory::take ──hit──► buffer (retagged, zeroed on request)
//!         │ miss
//!         ▼
//!   RawAllocator::allocate ──► buffer
//!
//!   release(buffer)
//!         │
//!         ▼
//!   SizeClassDirectory::insert ──► eviction (oldest first, skip pinned)
//!                                        │
//!                                        ▼
//!                                 RawAllocator::close
//! ```
//!
//! # Example
//! ```
//! use array_cache::{ArrayCacheManager, CacheLimit};
//! use buffer_core::{DType, HostAllocator, Location};
//!
//! let mut cache = ArrayCacheManager::new(HostAllocator::new(), CacheLimit::from_bytes(1000));
//!
//! let bufs: Vec<_> = (0..11)
//!     .map(|_| cache.allocate(false, DType::F32, 25, Location::Host).unwrap())
//!     .collect();
//! let first = bufs[0].handle();
//!
//! for b in bufs {
//!     cache.release(b).unwrap();
//! }
//!
//! // The eleventh 100-byte release pushed out the oldest one.
//! assert_eq!(cache.current_cache_bytes(), 1000);
//! assert_eq!(cache.cache_entry_count(), 10);
//! assert!(first.is_closed());
//! ```

mod config;
mod directory;
mod error;
mod eviction;
mod guard;
mod limit;
mod manager;
mod shared;
mod stats;

pub use config::CacheConfig;
pub use directory::SizeClassDirectory;
pub use error::{CacheError, ReleaseError};
pub use guard::CachedArray;
pub use limit::CacheLimit;
pub use manager::ArrayCacheManager;
pub use shared::SharedArrayCache;
pub use stats::CacheStats;
