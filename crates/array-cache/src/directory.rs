// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Size-class directory: where released buffers wait to be reused.
//!
//! Every cached buffer is stamped with a monotonically increasing release
//! sequence number. Two indexes refer to the same entries by that number:
//!
//! ```text
//!   age index (BTreeMap)        seq 0 ── seq 1 ── seq 2 ── seq 3 ── seq 4
//!   oldest first, for eviction    │        │        │        │        │
//!                                 ▼        ▼        ▼        ▼        ▼
//!   class 100 B @ host         { 0,               2,                4 }  ─► take pops 4
//!   class 400 B @ host         {          1,               3       }     ─► take pops 3
//! ```
//!
//! `take` pops the newest entry of one class (LIFO reuse affinity), while
//! eviction walks the age index from the oldest entry across all classes.
//! Both paths are O(log n).

use crate::{CacheError, ReleaseError};
use buffer_core::{BufferId, CacheableBuffer, SizeClass};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A buffer parked in the directory.
struct CacheEntry<B> {
    buffer: B,
    size_class: SizeClass,
}

/// Released buffers keyed by size class, with a global release-order index.
pub struct SizeClassDirectory<B: CacheableBuffer> {
    /// Global age index: release sequence → entry.
    entries: BTreeMap<u64, CacheEntry<B>>,
    /// Per-class sets of release sequences; the last one is the newest.
    classes: HashMap<SizeClass, BTreeSet<u64>>,
    /// Buffer identity → release sequence, for double-release detection.
    resident: HashMap<BufferId, u64>,
    next_seq: u64,
    cached_bytes: usize,
}

impl<B: CacheableBuffer> SizeClassDirectory<B> {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            classes: HashMap::new(),
            resident: HashMap::new(),
            next_seq: 0,
            cached_bytes: 0,
        }
    }

    /// Parks a released buffer and returns its release sequence number.
    ///
    /// Fails with [`CacheError::DoubleRelease`] if a buffer with the same
    /// identity is already cached. The rejected value is handed back
    /// untouched; it aliases memory the directory still holds, so it must
    /// not be closed.
    pub fn insert(&mut self, buffer: B) -> Result<u64, ReleaseError<B>> {
        let id = buffer.id();
        let size_class = buffer.size_class();

        if self.resident.contains_key(&id) {
            let error = CacheError::DoubleRelease {
                id,
                byte_size: size_class.byte_size,
                location: size_class.location,
            };
            return Err(ReleaseError::new(buffer, error));
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        self.classes.entry(size_class).or_default().insert(seq);
        self.resident.insert(id, seq);
        self.cached_bytes += size_class.byte_size;
        self.entries.insert(seq, CacheEntry { buffer, size_class });

        Ok(seq)
    }

    /// Removes and returns the most recently released buffer of `size_class`.
    pub fn take(&mut self, size_class: SizeClass) -> Option<B> {
        let class = self.classes.get_mut(&size_class)?;
        let seq = class.pop_last()?;
        if class.is_empty() {
            self.classes.remove(&size_class);
        }
        self.detach(seq)
    }

    /// Removes the entry with release sequence `seq`, wherever it lives.
    pub fn remove(&mut self, seq: u64) -> Option<B> {
        let size_class = self.entries.get(&seq)?.size_class;
        if let Some(class) = self.classes.get_mut(&size_class) {
            class.remove(&seq);
            if class.is_empty() {
                self.classes.remove(&size_class);
            }
        }
        self.detach(seq)
    }

    /// Drops `seq` from the age and identity indexes and fixes the byte count.
    /// The caller has already removed it from its class set.
    fn detach(&mut self, seq: u64) -> Option<B> {
        let entry = self.entries.remove(&seq)?;
        self.resident.remove(&entry.buffer.id());
        self.cached_bytes -= entry.size_class.byte_size;
        Some(entry.buffer)
    }

    /// Iterates cached buffers from the least recently released.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = (u64, &B)> + '_ {
        self.entries.iter().map(|(&seq, entry)| (seq, &entry.buffer))
    }

    /// Returns `true` if a buffer with identity `id` is cached.
    pub fn contains(&self, id: BufferId) -> bool {
        self.resident.contains_key(&id)
    }

    /// Number of cached buffers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the byte sizes of all cached buffers.
    pub fn cached_bytes(&self) -> usize {
        self.cached_bytes
    }

    /// Number of non-empty size classes.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Number of buffers cached under `size_class`.
    pub fn class_len(&self, size_class: SizeClass) -> usize {
        self.classes.get(&size_class).map_or(0, BTreeSet::len)
    }
}

impl<B: CacheableBuffer> Default for SizeClassDirectory<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: CacheableBuffer> std::fmt::Debug for SizeClassDirectory<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizeClassDirectory")
            .field("entries", &self.len())
            .field("classes", &self.class_count())
            .field("cached_bytes", &self.cached_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buffer_core::{DType, HasReferenceCount, Location};

    /// Minimal buffer with a caller-chosen identity, so aliasing can be
    /// expressed directly.
    #[derive(Debug, Clone)]
    struct FakeBuffer {
        id: u64,
        bytes: usize,
        location: Location,
        refs: usize,
    }

    impl FakeBuffer {
        fn host(id: u64, bytes: usize) -> Self {
            Self {
                id,
                bytes,
                location: Location::Host,
                refs: 0,
            }
        }
    }

    impl HasReferenceCount for FakeBuffer {
        fn reference_count(&self) -> usize {
            self.refs
        }
    }

    impl CacheableBuffer for FakeBuffer {
        fn id(&self) -> BufferId {
            BufferId(self.id)
        }
        fn byte_len(&self) -> usize {
            self.bytes
        }
        fn data_type(&self) -> DType {
            DType::U8
        }
        fn location(&self) -> Location {
            self.location
        }
        fn set_data_type(&mut self, _data_type: DType) {}
    }

    fn class(bytes: usize) -> SizeClass {
        SizeClass::new(bytes, Location::Host)
    }

    #[test]
    fn test_insert_updates_accounting() {
        let mut dir = SizeClassDirectory::new();
        dir.insert(FakeBuffer::host(1, 100)).unwrap();
        dir.insert(FakeBuffer::host(2, 400)).unwrap();

        assert_eq!(dir.len(), 2);
        assert_eq!(dir.cached_bytes(), 500);
        assert_eq!(dir.class_count(), 2);
        assert!(dir.contains(BufferId(1)));
    }

    #[test]
    fn test_take_is_lifo_within_class() {
        let mut dir = SizeClassDirectory::new();
        dir.insert(FakeBuffer::host(1, 100)).unwrap();
        dir.insert(FakeBuffer::host(2, 100)).unwrap();
        dir.insert(FakeBuffer::host(3, 100)).unwrap();

        assert_eq!(dir.take(class(100)).unwrap().id, 3);
        assert_eq!(dir.take(class(100)).unwrap().id, 2);
        assert_eq!(dir.take(class(100)).unwrap().id, 1);
        assert!(dir.take(class(100)).is_none());
        assert_eq!(dir.cached_bytes(), 0);
        assert_eq!(dir.class_count(), 0);
    }

    #[test]
    fn test_take_miss() {
        let mut dir = SizeClassDirectory::new();
        dir.insert(FakeBuffer::host(1, 100)).unwrap();

        assert!(dir.take(class(101)).is_none());
        assert!(dir
            .take(SizeClass::new(100, Location::Device(0)))
            .is_none());
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_double_insert_rejected() {
        let mut dir = SizeClassDirectory::new();
        let buf = FakeBuffer::host(7, 64);
        dir.insert(buf.clone()).unwrap();

        let rejected = dir.insert(buf).unwrap_err();
        assert!(matches!(
            rejected.error,
            CacheError::DoubleRelease { id: BufferId(7), byte_size: 64, .. }
        ));
        assert_eq!(rejected.buffer.id(), BufferId(7));
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.cached_bytes(), 64);
    }

    #[test]
    fn test_reinsert_after_take() {
        let mut dir = SizeClassDirectory::new();
        dir.insert(FakeBuffer::host(7, 64)).unwrap();
        let buf = dir.take(class(64)).unwrap();
        assert!(!dir.contains(BufferId(7)));
        dir.insert(buf).unwrap();
        assert!(dir.contains(BufferId(7)));
    }

    #[test]
    fn test_age_order_spans_classes() {
        let mut dir = SizeClassDirectory::new();
        dir.insert(FakeBuffer::host(1, 100)).unwrap();
        dir.insert(FakeBuffer::host(2, 400)).unwrap();
        dir.insert(FakeBuffer::host(3, 100)).unwrap();

        let order: Vec<u64> = dir.iter_oldest_first().map(|(_, b)| b.id).collect();
        assert_eq!(order, vec![1, 2, 3]);

        // Taking from a class removes from the age index too.
        dir.take(class(100)).unwrap();
        let order: Vec<u64> = dir.iter_oldest_first().map(|(_, b)| b.id).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn test_remove_by_sequence() {
        let mut dir = SizeClassDirectory::new();
        let first = dir.insert(FakeBuffer::host(1, 100)).unwrap();
        dir.insert(FakeBuffer::host(2, 100)).unwrap();

        assert_eq!(dir.remove(first).unwrap().id, 1);
        assert!(dir.remove(first).is_none());
        assert_eq!(dir.class_len(class(100)), 1);
        assert_eq!(dir.cached_bytes(), 100);
        assert_eq!(dir.take(class(100)).unwrap().id, 2);
    }

    #[test]
    fn test_byte_count_matches_entries() {
        let mut dir = SizeClassDirectory::new();
        for i in 0..50u64 {
            dir.insert(FakeBuffer::host(i, (i as usize % 5 + 1) * 8)).unwrap();
        }
        for bytes in [8, 24, 40] {
            dir.take(class(bytes));
        }
        let expected: usize = dir.iter_oldest_first().map(|(_, b)| b.bytes).sum();
        assert_eq!(dir.cached_bytes(), expected);
        assert_eq!(dir.len(), 47);
    }
}
